//! Task status state machine.
//!
//! Planning is pure: [`plan_transition`] and [`plan_completion`] check the
//! guards and return a [`PendingTransition`] holding both the optimistic row
//! a caller may show immediately and the [`TransitionCommit`] to persist.
//! Once the write finishes, [`PendingTransition::reconcile`] settles on the
//! durable row or reverts to the row as it was before.
//!
//! Re-selecting the current terminal status toggles the task back to pending.

use crate::error::{EngineError, EngineResult};
use crate::types::{ActivityKind, NewActivity, Task, TaskPatch, TaskStatus, TransitionCommit};
use serde::{Deserialize, Serialize};

/// A requested status change and the inputs its guards may need.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub target: TaskStatus,
    /// Justification; required when the task ends up failed.
    pub note: Option<String>,
    /// User to assign; required when the task ends up failed.
    pub assignee: Option<String>,
    /// Count of inventory needed; required for inventory items leaving pending.
    pub quantity: Option<i64>,
    /// External attachment (e.g. a photo) backing a failure.
    pub attachment_id: Option<String>,
}

impl TransitionRequest {
    pub fn new(target: TaskStatus) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_assignee(mut self, user_id: impl Into<String>) -> Self {
        self.assignee = Some(user_id.into());
        self
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_attachment(mut self, attachment_id: impl Into<String>) -> Self {
        self.attachment_id = Some(attachment_id.into());
        self
    }
}

/// A planned, not yet durable, change to one task.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTransition {
    pub task_id: String,
    pub from: TaskStatus,
    pub to: TaskStatus,
    /// The row as read before planning.
    pub previous: Task,
    /// The row as it will look once the commit lands.
    pub optimistic: Task,
    pub commit: TransitionCommit,
}

/// Outcome of settling a pending transition against its write.
#[derive(Debug)]
pub enum Reconciled {
    Committed(Task),
    Reverted { task: Task, error: EngineError },
}

impl Reconciled {
    /// The row to display after settling.
    pub fn task(&self) -> &Task {
        match self {
            Reconciled::Committed(task) => task,
            Reconciled::Reverted { task, .. } => task,
        }
    }

    pub fn into_result(self) -> EngineResult<Task> {
        match self {
            Reconciled::Committed(task) => Ok(task),
            Reconciled::Reverted { error, .. } => Err(error),
        }
    }
}

impl PendingTransition {
    fn new(previous: &Task, to: TaskStatus, commit: TransitionCommit) -> Self {
        let mut optimistic = previous.clone();
        optimistic.apply(&commit.patch);
        if let Some(ref user) = commit.add_assignee {
            optimistic.assigned_user_ids.insert(user.clone());
        }
        Self {
            task_id: previous.id.clone(),
            from: previous.status,
            to,
            previous: previous.clone(),
            optimistic,
            commit,
        }
    }

    /// Nothing to write.
    pub fn is_noop(&self) -> bool {
        self.commit.patch.is_empty()
            && self.commit.activity.is_none()
            && self.commit.add_assignee.is_none()
    }

    pub fn reconcile(self, result: EngineResult<Task>) -> Reconciled {
        match result {
            Ok(task) => Reconciled::Committed(task),
            Err(error) => Reconciled::Reverted {
                task: self.previous,
                error,
            },
        }
    }
}

/// Status a request actually leads to, applying toggle-off.
pub fn effective_target(current: TaskStatus, requested: TaskStatus) -> TaskStatus {
    if requested == current && requested != TaskStatus::Pending {
        TaskStatus::Pending
    } else {
        requested
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Quantity for an inventory item: the request's, else the row's own.
fn required_quantity(task: &Task, requested: Option<i64>, to: TaskStatus) -> EngineResult<Option<i64>> {
    if let Some(q) = requested {
        if q <= 0 {
            return Err(EngineError::invalid("quantity", "Quantity must be a positive whole number"));
        }
    }
    if task.inventory_type_id.is_none() {
        return Ok(requested);
    }
    match requested.or(task.positive_quantity()) {
        Some(q) => Ok(Some(q)),
        None => Err(EngineError::missing(
            "quantity",
            &format!("Enter how many are needed before marking this inventory item {}", to),
        )),
    }
}

fn status_change(task: &Task, to: TaskStatus, actor: &str, note: Option<&str>) -> NewActivity {
    let mut text = format!("{} → {}", task.status, to);
    if let Some(note) = note {
        text.push_str(": ");
        text.push_str(note);
    }
    NewActivity {
        task_id: task.id.clone(),
        kind: ActivityKind::StatusChange,
        note: text,
        actor: actor.to_string(),
    }
}

/// Plan a status change for `task` requested by `actor` at `now` (epoch ms).
///
/// Guard failures return `ValidationFailed` naming the missing field and
/// leave nothing to commit.
pub fn plan_transition(
    task: &Task,
    request: &TransitionRequest,
    actor: &str,
    now: i64,
) -> EngineResult<PendingTransition> {
    let to = effective_target(task.status, request.target);
    let note = non_blank(request.note.as_deref());
    let leaving_fail = task.status == TaskStatus::Fail && to != TaskStatus::Fail;

    let mut patch = TaskPatch::default();
    let mut activity = None;
    let mut add_assignee = None;

    match to {
        TaskStatus::Pending if task.status == TaskStatus::Pending => {
            return Ok(PendingTransition::new(
                task,
                to,
                TransitionCommit {
                    task_id: task.id.clone(),
                    patch,
                    activity,
                    add_assignee,
                },
            ));
        }
        TaskStatus::Pending => {
            patch.status = Some(TaskStatus::Pending);
            patch.status_changed_by = Some(None);
            patch.status_changed_at = Some(None);
            activity = Some(status_change(task, to, actor, note));
        }
        TaskStatus::Pass => {
            let quantity = required_quantity(task, request.quantity, to)?;
            patch.status = Some(TaskStatus::Pass);
            patch.status_changed_by = Some(Some(actor.to_string()));
            patch.status_changed_at = Some(Some(now));
            if request.quantity.is_some() {
                patch.quantity = Some(quantity);
            }
            activity = Some(status_change(task, to, actor, note));
        }
        TaskStatus::Fail => {
            let note = note.ok_or_else(|| {
                EngineError::missing("note", "Describe why this item failed")
            })?;
            let assignee = non_blank(request.assignee.as_deref()).ok_or_else(|| {
                EngineError::missing("assignee", "Choose who is responsible for fixing this item")
            })?;
            let quantity = required_quantity(task, request.quantity, to)?;

            patch.status = Some(TaskStatus::Fail);
            patch.status_changed_by = Some(Some(actor.to_string()));
            patch.status_changed_at = Some(Some(now));
            if request.quantity.is_some() {
                patch.quantity = Some(quantity);
            }
            if let Some(attachment) = non_blank(request.attachment_id.as_deref()) {
                patch.fail_attachment_id = Some(Some(attachment.to_string()));
            }
            activity = Some(NewActivity {
                task_id: task.id.clone(),
                kind: ActivityKind::NoteAdded,
                note: note.to_string(),
                actor: actor.to_string(),
            });
            add_assignee = Some(assignee.to_string());
        }
    }

    if leaving_fail {
        patch.fail_attachment_id = Some(None);
    }

    Ok(PendingTransition::new(
        task,
        to,
        TransitionCommit {
            task_id: task.id.clone(),
            patch,
            activity,
            add_assignee,
        },
    ))
}

/// Plan marking `task` done or not done.
///
/// Completing a failed task relabels it pass. Setting the flag it already
/// has plans nothing.
pub fn plan_completion(task: &Task, completed: bool, actor: &str, now: i64) -> PendingTransition {
    let mut patch = TaskPatch::default();
    let mut activity = None;
    let mut to = task.status;

    if task.completed != completed {
        patch.completed = Some(completed);
        if completed {
            patch.completed_by = Some(Some(actor.to_string()));
            patch.completed_at = Some(Some(now));
            if task.status == TaskStatus::Fail {
                to = TaskStatus::Pass;
                patch.status = Some(TaskStatus::Pass);
                patch.status_changed_by = Some(Some(actor.to_string()));
                patch.status_changed_at = Some(Some(now));
                patch.fail_attachment_id = Some(None);
                activity = Some(status_change(task, to, actor, None));
            }
        } else {
            patch.completed_by = Some(None);
            patch.completed_at = Some(None);
        }
    }

    PendingTransition::new(
        task,
        to,
        TransitionCommit {
            task_id: task.id.clone(),
            patch,
            activity,
            add_assignee: None,
        },
    )
}
