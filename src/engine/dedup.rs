//! Collapsing chain segments into one row per logical checklist item.
//!
//! Rows are keyed by [`TaskIdentity`]: provenance inspection, room identity and
//! exact description. Output order is the order in which each key first
//! appears while scanning segments leaf first. Which row's *content* is kept
//! for a key held by several segments is decided by [`DedupPolicy`].

use super::lineage::Lineage;
use crate::types::{ResolvedTask, Room, RoomIdentity, Run, RunKey, Task, TaskIdentity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Conflict rule for a logical task present in more than one chain segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// The copy nearest the resolved inspection wins.
    #[default]
    LeafWins,
    /// The copy nearest the root wins: every later segment overwrites the
    /// value while the key keeps its first position.
    RootWins,
}

impl DedupPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DedupPolicy::LeafWins => "leaf_wins",
            DedupPolicy::RootWins => "root_wins",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "leaf_wins" | "leaf" => Some(DedupPolicy::LeafWins),
            "root_wins" | "root" => Some(DedupPolicy::RootWins),
            _ => None,
        }
    }
}

/// Room part of the identity key.
///
/// Room rows are per-inspection, so the key uses the lineage-stable origin:
/// the one stored on the row, else the referenced room's. A room reference
/// outside the chain with no stored origin counts as no reference, the same
/// as a follow-up copy whose reference was dropped.
pub fn room_identity(task: &Task, rooms: &HashMap<&str, &Room>) -> RoomIdentity {
    let origin = task.origin_room_id.clone().or_else(|| {
        task.room_id
            .as_deref()
            .and_then(|id| rooms.get(id))
            .map(|room| room.origin_room_id.clone())
    });
    match (origin, task.room_name.as_deref()) {
        (Some(origin), _) => RoomIdentity::Room(origin),
        (None, Some(name)) => RoomIdentity::Named(name.to_string()),
        (None, None) => RoomIdentity::NoRoom,
    }
}

pub fn task_identity(task: &Task, rooms: &HashMap<&str, &Room>) -> TaskIdentity {
    TaskIdentity {
        original_inspection_id: task.original_inspection_id.clone(),
        room: room_identity(task, rooms),
        description: task.description.clone(),
    }
}

/// Deduplicate raw segments (each `(owning inspection, rows)`, leaf first).
pub fn deduplicate<'a>(
    segments: impl IntoIterator<Item = (&'a str, &'a [Task])>,
    rooms: &HashMap<&str, &Room>,
    runs: &HashMap<&str, &Run>,
    viewing_inspection_id: &str,
    policy: DedupPolicy,
) -> Vec<ResolvedTask> {
    let mut resolved: Vec<ResolvedTask> = Vec::new();
    let mut positions: HashMap<TaskIdentity, usize> = HashMap::new();

    for (segment_id, tasks) in segments {
        for task in tasks {
            let identity = task_identity(task, rooms);
            match positions.entry(identity) {
                Entry::Vacant(slot) => {
                    let entry = resolve_one(slot.key().clone(), task, segment_id, rooms, runs, viewing_inspection_id);
                    slot.insert(resolved.len());
                    resolved.push(entry);
                }
                Entry::Occupied(slot) => {
                    if policy == DedupPolicy::RootWins {
                        let index = *slot.get();
                        resolved[index] = resolve_one(
                            slot.key().clone(),
                            task,
                            segment_id,
                            rooms,
                            runs,
                            viewing_inspection_id,
                        );
                    }
                }
            }
        }
    }

    resolved
}

/// Deduplicate a walked chain as seen from `viewing_inspection_id`.
pub fn deduplicate_lineage(
    lineage: &Lineage,
    viewing_inspection_id: &str,
    policy: DedupPolicy,
) -> Vec<ResolvedTask> {
    deduplicate(
        lineage.segments(),
        &lineage.room_directory(),
        &lineage.run_directory(),
        viewing_inspection_id,
        policy,
    )
}

fn resolve_one(
    identity: TaskIdentity,
    task: &Task,
    segment_id: &str,
    rooms: &HashMap<&str, &Room>,
    runs: &HashMap<&str, &Run>,
    viewing_inspection_id: &str,
) -> ResolvedTask {
    let room_name = task
        .room_id
        .as_deref()
        .and_then(|id| rooms.get(id))
        .map(|room| room.name.clone())
        .or_else(|| task.room_name.clone());
    let run_key: Option<RunKey> = task
        .run_id
        .as_deref()
        .and_then(|id| runs.get(id))
        .map(|run| run.key());

    ResolvedTask {
        inherited: task.original_inspection_id != viewing_inspection_id,
        identity,
        task: task.clone(),
        source_inspection_id: segment_id.to_string(),
        room_name,
        run_key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskStatus;
    use std::collections::BTreeSet;

    fn task(id: &str, inspection: &str, original: &str, room: Option<&str>, desc: &str) -> Task {
        Task {
            id: id.into(),
            inspection_id: inspection.into(),
            original_inspection_id: original.into(),
            room_id: room.map(String::from),
            origin_room_id: None,
            room_name: None,
            run_id: None,
            description: desc.into(),
            status: TaskStatus::Pending,
            completed: false,
            completed_by: None,
            completed_at: None,
            inventory_type_id: None,
            quantity: None,
            vendor_type_id: None,
            assigned_user_ids: BTreeSet::new(),
            status_changed_by: None,
            status_changed_at: None,
            fail_attachment_id: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn room(id: &str, inspection: &str, name: &str, origin: &str) -> Room {
        Room {
            id: id.into(),
            inspection_id: inspection.into(),
            name: name.into(),
            order_index: 0,
            origin_room_id: origin.into(),
        }
    }

    /// Leaf F (room k2 cloned from k1) and root R (room k1), one shared item
    /// plus one item only the root has.
    fn chain() -> (Vec<Task>, Vec<Task>, Vec<Room>) {
        let mut leaf_copy = task("f-1", "F", "R", Some("k2"), "Fix faucet");
        leaf_copy.status = TaskStatus::Pending;
        let mut root_copy = task("r-1", "R", "R", Some("k1"), "Fix faucet");
        root_copy.status = TaskStatus::Fail;
        let root_only = task("r-2", "R", "R", None, "Replace smoke detector");
        let rooms = vec![room("k1", "R", "Kitchen", "k1"), room("k2", "F", "Kitchen", "k1")];
        (vec![leaf_copy], vec![root_copy, root_only], rooms)
    }

    fn run(policy: DedupPolicy) -> Vec<ResolvedTask> {
        let (leaf, root, rooms) = chain();
        let directory: HashMap<&str, &Room> = rooms.iter().map(|r| (r.id.as_str(), r)).collect();
        deduplicate(
            [("F", leaf.as_slice()), ("R", root.as_slice())],
            &directory,
            &HashMap::new(),
            "F",
            policy,
        )
    }

    #[test]
    fn test_cloned_room_collapses_to_one_item() {
        let resolved = run(DedupPolicy::LeafWins);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].task.description, "Fix faucet");
        assert_eq!(resolved[0].identity.room, RoomIdentity::Room("k1".into()));
        assert_eq!(resolved[0].room_name.as_deref(), Some("Kitchen"));
        assert_eq!(resolved[1].task.description, "Replace smoke detector");
    }

    #[test]
    fn test_leaf_wins_keeps_leaf_content() {
        let resolved = run(DedupPolicy::LeafWins);
        assert_eq!(resolved[0].task.id, "f-1");
        assert_eq!(resolved[0].task.status, TaskStatus::Pending);
        assert_eq!(resolved[0].source_inspection_id, "F");
    }

    #[test]
    fn test_root_wins_overwrites_value_keeps_position() {
        let resolved = run(DedupPolicy::RootWins);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].task.id, "r-1");
        assert_eq!(resolved[0].task.status, TaskStatus::Fail);
        assert_eq!(resolved[0].source_inspection_id, "R");
    }

    #[test]
    fn test_inherited_flag_follows_provenance() {
        let resolved = run(DedupPolicy::LeafWins);
        assert!(resolved.iter().all(|r| r.inherited));

        let own = [task("f-9", "F", "F", None, "New scuff")];
        let out = deduplicate(
            [("F", own.as_slice())],
            &HashMap::new(),
            &HashMap::new(),
            "F",
            DedupPolicy::LeafWins,
        );
        assert!(!out[0].inherited);
    }

    #[test]
    fn test_identity_ignores_other_fields() {
        let mut a = task("a", "F", "R", None, "Patch wall");
        a.status = TaskStatus::Fail;
        a.quantity = Some(3);
        let mut b = task("b", "R", "R", None, "Patch wall");
        b.vendor_type_id = Some("painter".into());
        let segments = [vec![a], vec![b]];
        let out = deduplicate(
            [("F", segments[0].as_slice()), ("R", segments[1].as_slice())],
            &HashMap::new(),
            &HashMap::new(),
            "F",
            DedupPolicy::LeafWins,
        );
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_description_and_provenance_distinguish_items() {
        let rows = [
            task("a", "F", "R", None, "Patch wall"),
            task("b", "F", "R", None, "patch wall"),
            task("c", "F", "F", None, "Patch wall"),
        ];
        let out = deduplicate(
            [("F", rows.as_slice())],
            &HashMap::new(),
            &HashMap::new(),
            "F",
            DedupPolicy::LeafWins,
        );
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_room_identity_fallbacks() {
        let rooms = HashMap::new();
        let mut t = task("a", "F", "R", Some("gone"), "x");
        assert_eq!(room_identity(&t, &rooms), RoomIdentity::NoRoom);

        t.room_name = Some("Garage".into());
        assert_eq!(room_identity(&t, &rooms), RoomIdentity::Named("Garage".into()));

        t.origin_room_id = Some("g0".into());
        assert_eq!(room_identity(&t, &rooms), RoomIdentity::Room("g0".into()));
        t.origin_room_id = None;

        t.room_id = None;
        t.room_name = Some("Bath".into());
        assert_eq!(room_identity(&t, &rooms), RoomIdentity::Named("Bath".into()));

        t.room_name = None;
        assert_eq!(room_identity(&t, &rooms), RoomIdentity::NoRoom);
    }

    #[test]
    fn test_dropped_room_copy_matches_ancestor_row() {
        let mut ancestor = task("r-1", "R", "R", Some("elsewhere"), "Sweep floor");
        ancestor.room_name = Some("Garage".into());
        let mut copy = task("f-1", "F", "R", None, "Sweep floor");
        copy.room_name = Some("Garage".into());
        let (leaf, root) = (vec![copy], vec![ancestor]);

        let out = deduplicate(
            [("F", leaf.as_slice()), ("R", root.as_slice())],
            &HashMap::new(),
            &HashMap::new(),
            "F",
            DedupPolicy::LeafWins,
        );

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].task.id, "f-1");
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(DedupPolicy::parse("ROOT-WINS"), Some(DedupPolicy::RootWins));
        assert_eq!(DedupPolicy::parse("leaf"), Some(DedupPolicy::LeafWins));
        assert_eq!(DedupPolicy::parse("newest"), None);
    }
}
