//! Follow-up instantiation: cloning a parent's checklist structure under a
//! new inspection.
//!
//! Rows are written in dependency order (inspection, rooms, runs, tasks).
//! There is no cross-call transaction: a failed phase surfaces as a hard
//! error and earlier phases may leave orphaned rows behind.

use super::lineage::Lineage;
use crate::error::{EngineError, EngineResult};
use crate::store::RecordStore;
use crate::types::{
    Inspection, InspectionType, NewInspection, NewRoom, NewRun, NewTask, ResolvedTask, Room,
    RoomIdentity, Run, RunKey, Task, TaskStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// What to schedule when creating a follow-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpRequest {
    /// Scheduled start, epoch milliseconds.
    pub scheduled_at: i64,
    #[serde(default = "default_follow_up_type")]
    pub inspection_type: InspectionType,
}

fn default_follow_up_type() -> InspectionType {
    InspectionType::FollowUp
}

impl FollowUpRequest {
    pub fn new(scheduled_at: i64) -> Self {
        Self {
            scheduled_at,
            inspection_type: InspectionType::FollowUp,
        }
    }

    pub fn with_type(mut self, inspection_type: InspectionType) -> Self {
        self.inspection_type = inspection_type;
        self
    }
}

/// A fully written follow-up inspection.
#[derive(Debug, Clone, Serialize)]
pub struct FollowUp {
    pub inspection: Inspection,
    pub rooms: Vec<Room>,
    pub runs: Vec<Run>,
    pub tasks: Vec<Task>,
    /// Tasks whose room reference could not be translated and was dropped.
    pub dropped_room_refs: usize,
    /// Tasks left without a run because several candidate runs existed.
    pub unassigned_run_refs: usize,
}

/// Room rows for the new inspection, preserving name, order and origin.
pub fn clone_rooms(parent_rooms: &[Room], new_inspection_id: &str) -> Vec<NewRoom> {
    let mut rooms: Vec<&Room> = parent_rooms.iter().collect();
    rooms.sort_by_key(|r| r.order_index);
    rooms
        .into_iter()
        .map(|room| NewRoom {
            inspection_id: new_inspection_id.to_string(),
            name: room.name.clone(),
            order_index: room.order_index,
            origin_room_id: Some(room.origin_room_id.clone()),
        })
        .collect()
}

/// Run keys for the new inspection: the parent's runs, or its single
/// declared template/unit when it has none.
pub fn clone_run_keys(parent: &Inspection, parent_runs: &[Run]) -> Vec<RunKey> {
    let mut seen = HashSet::new();
    let mut keys: Vec<RunKey> = parent_runs
        .iter()
        .map(Run::key)
        .filter(|key| seen.insert(key.clone()))
        .collect();

    if keys.is_empty() {
        if let Some(ref template_id) = parent.template_id {
            keys.push(RunKey {
                template_id: template_id.clone(),
                unit_id: parent.unit_id.clone(),
            });
        }
    }
    keys
}

/// Translation from any room row in the chain to the new inspection's copy.
#[derive(Debug, Default)]
pub struct RoomMap {
    by_old_id: HashMap<String, String>,
}

impl RoomMap {
    /// Rooms are matched on `origin_room_id`, so references into any
    /// ancestor's copy of a room land on the same new row.
    pub fn build(chain_rooms: &HashMap<&str, &Room>, new_rooms: &[Room]) -> Self {
        let by_origin: HashMap<&str, &str> = new_rooms
            .iter()
            .map(|r| (r.origin_room_id.as_str(), r.id.as_str()))
            .collect();
        let by_old_id = chain_rooms
            .iter()
            .filter_map(|(old_id, room)| {
                by_origin
                    .get(room.origin_room_id.as_str())
                    .map(|new_id| (old_id.to_string(), new_id.to_string()))
            })
            .collect();
        Self { by_old_id }
    }

    pub fn translate(&self, old_room_id: &str) -> Option<&str> {
        self.by_old_id.get(old_room_id).map(String::as_str)
    }
}

/// Translation from any run row in the chain to the new inspection's run,
/// through the run's (template, unit) key.
#[derive(Debug, Default)]
pub struct RunMap {
    key_by_old_id: HashMap<String, RunKey>,
    new_by_key: HashMap<RunKey, String>,
    single: Option<String>,
}

impl RunMap {
    pub fn build(chain_runs: &HashMap<&str, &Run>, new_runs: &[Run]) -> Self {
        let key_by_old_id = chain_runs
            .iter()
            .map(|(id, run)| (id.to_string(), run.key()))
            .collect();
        let new_by_key = new_runs.iter().map(|r| (r.key(), r.id.clone())).collect();
        let single = match new_runs {
            [only] => Some(only.id.clone()),
            _ => None,
        };
        Self {
            key_by_old_id,
            new_by_key,
            single,
        }
    }

    pub fn translate(&self, old_run_id: &str) -> Option<&str> {
        self.key_by_old_id
            .get(old_run_id)
            .and_then(|key| self.new_by_key.get(key))
            .map(String::as_str)
    }

    /// Run for a task whose own reference did not map. Only a lone run is a
    /// safe default; with several the task stays unassigned.
    pub fn default_run(&self) -> Option<&str> {
        self.single.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.new_by_key.is_empty()
    }
}

/// Tasks translated for insertion plus the references that degraded.
#[derive(Debug, Default)]
pub struct RemappedTasks {
    pub tasks: Vec<NewTask>,
    pub dropped_room_refs: usize,
    pub unassigned_run_refs: usize,
}

/// Translate resolved tasks into fresh rows owned by `new_inspection_id`.
///
/// Status resets to pending and completion to false; provenance, assignees,
/// inventory and vendor fields carry forward unchanged.
pub fn remap_tasks(
    resolved: &[ResolvedTask],
    new_inspection_id: &str,
    rooms: &RoomMap,
    runs: &RunMap,
) -> RemappedTasks {
    let mut out = RemappedTasks::default();

    for item in resolved {
        let task = &item.task;

        let room_id = match task.room_id.as_deref() {
            Some(old) => match rooms.translate(old) {
                Some(new_id) => Some(new_id.to_string()),
                None => {
                    let err = EngineError::unresolvable("room", old);
                    warn!(task = %task.id, error = %err, "Dropping room reference on follow-up copy");
                    out.dropped_room_refs += 1;
                    None
                }
            },
            None => None,
        };

        let mapped = task.run_id.as_deref().and_then(|old| runs.translate(old));
        let run_id = match mapped.or_else(|| runs.default_run()) {
            Some(new_id) => Some(new_id.to_string()),
            None => {
                if !runs.is_empty() {
                    if let Some(ref old) = task.run_id {
                        let err = EngineError::unresolvable("run", old);
                        warn!(task = %task.id, error = %err, "Leaving follow-up copy without a run");
                    }
                    out.unassigned_run_refs += 1;
                }
                None
            }
        };

        out.tasks.push(NewTask {
            inspection_id: new_inspection_id.to_string(),
            original_inspection_id: Some(task.original_inspection_id.clone()),
            room_id,
            origin_room_id: match item.identity.room {
                RoomIdentity::Room(ref origin) => Some(origin.clone()),
                _ => None,
            },
            room_name: item.room_name.clone(),
            run_id,
            description: task.description.clone(),
            status: TaskStatus::Pending,
            inventory_type_id: task.inventory_type_id.clone(),
            quantity: task.quantity,
            vendor_type_id: task.vendor_type_id.clone(),
            assigned_user_ids: task.assigned_user_ids.clone(),
        });
    }

    out
}

/// Write a follow-up of the lineage's leaf inspection.
///
/// `resolved` is the leaf's deduplicated checklist. Fails with
/// `ValidationFailed` when there is nothing to copy.
pub async fn create_follow_up<S>(
    store: &S,
    lineage: &Lineage,
    resolved: &[ResolvedTask],
    request: &FollowUpRequest,
    actor: &str,
) -> EngineResult<FollowUp>
where
    S: RecordStore + ?Sized,
{
    let parent = lineage.leaf();
    if parent.rooms.is_empty() && resolved.is_empty() {
        return Err(EngineError::missing(
            "checklist",
            "Inspection has no rooms or tasks to copy into a follow-up",
        )
        .with_details(parent.inspection.id.clone()));
    }

    let inspection = store
        .insert_inspection(NewInspection {
            inspection_type: request.inspection_type,
            scheduled_at: request.scheduled_at,
            property_id: parent.inspection.property_id.clone(),
            unit_id: parent.inspection.unit_id.clone(),
            parent_inspection_id: Some(parent.inspection.id.clone()),
            template_id: parent.inspection.template_id.clone(),
            created_by: Some(actor.to_string()),
        })
        .await?;

    let new_rooms = clone_rooms(&parent.rooms, &inspection.id);
    let rooms = if new_rooms.is_empty() {
        Vec::new()
    } else {
        store.insert_rooms(new_rooms).await?
    };
    debug!(inspection = %inspection.id, count = rooms.len(), "Cloned rooms");

    let new_runs: Vec<NewRun> = clone_run_keys(&parent.inspection, &parent.runs)
        .into_iter()
        .map(|key| NewRun {
            inspection_id: inspection.id.clone(),
            template_id: key.template_id,
            unit_id: key.unit_id,
        })
        .collect();
    let runs = if new_runs.is_empty() {
        Vec::new()
    } else {
        store.insert_runs(new_runs).await?
    };
    debug!(inspection = %inspection.id, count = runs.len(), "Cloned runs");

    let room_map = RoomMap::build(&lineage.room_directory(), &rooms);
    let run_map = RunMap::build(&lineage.run_directory(), &runs);
    let remapped = remap_tasks(resolved, &inspection.id, &room_map, &run_map);

    let tasks = if remapped.tasks.is_empty() {
        Vec::new()
    } else {
        store.insert_tasks(remapped.tasks).await?
    };

    info!(
        parent = %parent.inspection.id,
        inspection = %inspection.id,
        rooms = rooms.len(),
        runs = runs.len(),
        tasks = tasks.len(),
        dropped_room_refs = remapped.dropped_room_refs,
        unassigned_run_refs = remapped.unassigned_run_refs,
        "Created follow-up inspection"
    );

    Ok(FollowUp {
        inspection,
        rooms,
        runs,
        tasks,
        dropped_room_refs: remapped.dropped_room_refs,
        unassigned_run_refs: remapped.unassigned_run_refs,
    })
}
