//! Core types for the inspection lineage engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Category an inspection was scheduled under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionType {
    MoveIn,
    MoveOut,
    Annual,
    Routine,
    Turnover,
    FollowUp,
}

impl InspectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InspectionType::MoveIn => "move_in",
            InspectionType::MoveOut => "move_out",
            InspectionType::Annual => "annual",
            InspectionType::Routine => "routine",
            InspectionType::Turnover => "turnover",
            InspectionType::FollowUp => "follow_up",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "move_in" => Some(InspectionType::MoveIn),
            "move_out" => Some(InspectionType::MoveOut),
            "annual" => Some(InspectionType::Annual),
            "routine" => Some(InspectionType::Routine),
            "turnover" => Some(InspectionType::Turnover),
            "follow_up" => Some(InspectionType::FollowUp),
            _ => None,
        }
    }
}

/// Overall outcome of an inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionStatus {
    #[default]
    Pending,
    Passed,
    Failed,
}

impl InspectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InspectionStatus::Pending => "pending",
            InspectionStatus::Passed => "passed",
            InspectionStatus::Failed => "failed",
        }
    }

    /// Unknown values read back as pending.
    pub fn parse(s: &str) -> Self {
        match s {
            "passed" => InspectionStatus::Passed,
            "failed" => InspectionStatus::Failed,
            _ => InspectionStatus::Pending,
        }
    }
}

/// A scheduled inspection. `parent_inspection_id` links a follow-up to the
/// inspection it was spawned from; the root of a chain has none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    pub id: String,
    pub inspection_type: InspectionType,
    /// Scheduled start, epoch milliseconds.
    pub scheduled_at: i64,
    pub property_id: String,
    pub unit_id: Option<String>,
    pub parent_inspection_id: Option<String>,
    pub template_id: Option<String>,
    pub status: InspectionStatus,
    pub archived: bool,
    pub created_by: Option<String>,
    pub created_at: i64,
}

/// Input for scheduling an inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInspection {
    pub inspection_type: InspectionType,
    pub scheduled_at: i64,
    pub property_id: String,
    pub unit_id: Option<String>,
    pub parent_inspection_id: Option<String>,
    pub template_id: Option<String>,
    pub created_by: Option<String>,
}

/// A room owned by exactly one inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub inspection_id: String,
    pub name: String,
    pub order_index: i32,
    /// Id of the room as first authored; identical across every clone.
    pub origin_room_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoom {
    pub inspection_id: String,
    pub name: String,
    pub order_index: i32,
    /// `None` marks a freshly authored room whose origin is itself.
    pub origin_room_id: Option<String>,
}

/// Stable identity of a run: row ids change on every clone, this pair does not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunKey {
    pub template_id: String,
    pub unit_id: Option<String>,
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit_id {
            Some(ref unit) => write!(f, "{}@{}", self.template_id, unit),
            None => write!(f, "{}", self.template_id),
        }
    }
}

/// One (template, unit) adjudication unit within an inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub inspection_id: String,
    pub template_id: String,
    pub unit_id: Option<String>,
}

impl Run {
    pub fn key(&self) -> RunKey {
        RunKey {
            template_id: self.template_id.clone(),
            unit_id: self.unit_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRun {
    pub inspection_id: String,
    pub template_id: String,
    pub unit_id: Option<String>,
}

/// Adjudication state of a single task row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Pass,
    Fail,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Pass => "pass",
            TaskStatus::Fail => "fail",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(TaskStatus::Pending),
            "pass" | "passed" => Some(TaskStatus::Pass),
            "fail" | "failed" => Some(TaskStatus::Fail),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A checklist item row ("subtask") owned by one inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub inspection_id: String,
    /// Inspection the logical item was first authored under.
    pub original_inspection_id: String,
    pub room_id: Option<String>,
    /// `origin_room_id` of the referenced room, stored with the row so the
    /// room identity survives a dropped room reference.
    pub origin_room_id: Option<String>,
    /// Room label carried with the row; survives a dropped room reference.
    pub room_name: Option<String>,
    pub run_id: Option<String>,
    pub description: String,
    pub status: TaskStatus,
    pub completed: bool,
    pub completed_by: Option<String>,
    pub completed_at: Option<i64>,
    pub inventory_type_id: Option<String>,
    pub quantity: Option<i64>,
    pub vendor_type_id: Option<String>,
    pub assigned_user_ids: BTreeSet<String>,
    pub status_changed_by: Option<String>,
    pub status_changed_at: Option<i64>,
    pub fail_attachment_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    /// Quantity if it is a usable positive count.
    pub fn positive_quantity(&self) -> Option<i64> {
        self.quantity.filter(|q| *q > 0)
    }

    /// Apply a patch in memory, the same way the store applies it.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(ref by) = patch.status_changed_by {
            self.status_changed_by = by.clone();
        }
        if let Some(at) = patch.status_changed_at {
            self.status_changed_at = at;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(ref by) = patch.completed_by {
            self.completed_by = by.clone();
        }
        if let Some(at) = patch.completed_at {
            self.completed_at = at;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(ref attachment) = patch.fail_attachment_id {
            self.fail_attachment_id = attachment.clone();
        }
        if let Some(ref description) = patch.description {
            self.description = description.clone();
        }
        if let Some(ref room_id) = patch.room_id {
            self.room_id = room_id.clone();
        }
        if let Some(ref run_id) = patch.run_id {
            self.run_id = run_id.clone();
        }
    }
}

/// Input for inserting a task row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub inspection_id: String,
    /// `None` marks an item authored under `inspection_id` itself.
    pub original_inspection_id: Option<String>,
    pub room_id: Option<String>,
    /// `None` takes the origin of the room `room_id` points at.
    pub origin_room_id: Option<String>,
    pub room_name: Option<String>,
    pub run_id: Option<String>,
    pub description: String,
    pub status: TaskStatus,
    pub inventory_type_id: Option<String>,
    pub quantity: Option<i64>,
    pub vendor_type_id: Option<String>,
    pub assigned_user_ids: BTreeSet<String>,
}

/// Field-level task update. Outer `None` leaves a field untouched; for
/// nullable fields `Some(None)` clears it. Fields are last-write-wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub status_changed_by: Option<Option<String>>,
    pub status_changed_at: Option<Option<i64>>,
    pub completed: Option<bool>,
    pub completed_by: Option<Option<String>>,
    pub completed_at: Option<Option<i64>>,
    pub quantity: Option<Option<i64>>,
    pub fail_attachment_id: Option<Option<String>>,
    pub description: Option<String>,
    pub room_id: Option<Option<String>>,
    pub run_id: Option<Option<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }
}

/// Kind of an activity (task audit) entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityKind {
    NoteAdded,
    StatusChange,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::NoteAdded => "note-added",
            ActivityKind::StatusChange => "status-change",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "note-added" => Some(ActivityKind::NoteAdded),
            "status-change" => Some(ActivityKind::StatusChange),
            _ => None,
        }
    }
}

/// Append-only audit entry attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub task_id: String,
    pub kind: ActivityKind,
    pub note: String,
    pub actor: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActivity {
    pub task_id: String,
    pub kind: ActivityKind,
    pub note: String,
    pub actor: String,
}

/// Everything a committed status transition writes, applied atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionCommit {
    pub task_id: String,
    pub patch: TaskPatch,
    pub activity: Option<NewActivity>,
    pub add_assignee: Option<String>,
}

/// A window of rows for paged reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    pub fn next(self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }
}

/// Room part of a logical task identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RoomIdentity {
    /// Lineage-stable room id (or the raw id when the room row is unknown).
    Room(String),
    /// No room reference; the task's room label.
    Named(String),
    NoRoom,
}

/// The key under which rows collapse to one logical checklist item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskIdentity {
    pub original_inspection_id: String,
    pub room: RoomIdentity,
    pub description: String,
}

/// One logical task after lineage resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTask {
    pub identity: TaskIdentity,
    /// The row whose content won deduplication.
    pub task: Task,
    /// Inspection of the chain segment the winning row came from.
    pub source_inspection_id: String,
    /// Room label: the referenced room's name, else the row's own label.
    pub room_name: Option<String>,
    /// Run the winning row belongs to, when it has one the chain knows.
    pub run_key: Option<RunKey>,
    /// True when the item was first authored under a different inspection
    /// than the one being resolved.
    pub inherited: bool,
}

/// The merged, deduplicated checklist visible at one inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedChecklist {
    pub inspection_id: String,
    /// Inspection ids from the resolved leaf up to the root.
    pub chain: Vec<String>,
    pub tasks: Vec<ResolvedTask>,
}

impl ResolvedChecklist {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
