//! Lineage resolution and task adjudication over a [`RecordStore`].
//!
//! The submodules hold the pure algorithms and the store-driven steps; the
//! [`Engine`] facade binds them to a store, an identity provider and the
//! engine configuration.

pub mod dedup;
pub mod fetch;
pub mod lineage;
pub mod remap;
pub mod report;
pub mod transitions;

pub use dedup::{DedupPolicy, deduplicate, deduplicate_lineage, room_identity, task_identity};
pub use fetch::fetch_all_tasks;
pub use lineage::{Lineage, LineageLink, walk_lineage};
pub use remap::{FollowUp, FollowUpRequest};
pub use report::{
    AggregateReport, InventoryTotal, RunGroup, VendorCount, aggregate, group_by_run,
    inventory_totals, vendor_counts,
};
pub use transitions::{
    PendingTransition, Reconciled, TransitionRequest, plan_completion, plan_transition,
};

use crate::config::EngineConfig;
use crate::db::now_ms;
use crate::error::{EngineError, EngineResult};
use crate::store::{IdentityProvider, RecordStore};
use crate::subscriptions::ResolutionTracker;
use crate::types::{Activity, ActivityKind, NewActivity, ResolvedChecklist, Task};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Entry point for every engine operation.
pub struct Engine<S: RecordStore> {
    store: Arc<S>,
    identity: Arc<dyn IdentityProvider>,
    config: EngineConfig,
    tracker: Option<Arc<ResolutionTracker>>,
}

impl<S: RecordStore> Engine<S> {
    pub fn new(store: Arc<S>, identity: Arc<dyn IdentityProvider>, config: EngineConfig) -> Self {
        Self {
            store,
            identity,
            config,
            tracker: None,
        }
    }

    /// Record every resolution in `tracker` for change-signal routing.
    pub fn with_tracker(mut self, tracker: Arc<ResolutionTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn actor(&self, operation: &str) -> EngineResult<String> {
        match self.identity.current_user_id() {
            Some(user) => Ok(user),
            None => {
                warn!(operation, "Refusing write without an acting user");
                Err(EngineError::not_authenticated(operation))
            }
        }
    }

    async fn load_task(&self, task_id: &str) -> EngineResult<Task> {
        self.store
            .get_task(task_id)
            .await?
            .ok_or_else(|| EngineError::task_not_found(task_id))
    }

    /// Every task row owned by one inspection.
    pub async fn fetch_tasks(&self, inspection_id: &str) -> EngineResult<Vec<Task>> {
        fetch_all_tasks(self.store.as_ref(), inspection_id, self.config.page_size).await
    }

    /// The chain from `inspection_id` up to its root, fully loaded.
    pub async fn walk_lineage(&self, inspection_id: &str) -> EngineResult<Lineage> {
        walk_lineage(
            self.store.as_ref(),
            inspection_id,
            self.config.page_size,
            self.config.max_chain_depth,
        )
        .await
    }

    fn resolve_lineage(&self, lineage: &Lineage) -> ResolvedChecklist {
        let inspection_id = lineage.leaf().inspection.id.clone();
        let tasks = deduplicate_lineage(lineage, &inspection_id, self.config.dedup_policy);
        if let Some(ref tracker) = self.tracker {
            tracker.record(lineage);
        }
        debug!(
            inspection = %inspection_id,
            rows = lineage.row_count(),
            tasks = tasks.len(),
            policy = self.config.dedup_policy.as_str(),
            "Resolved checklist"
        );
        ResolvedChecklist {
            inspection_id,
            chain: lineage.chain_ids(),
            tasks,
        }
    }

    /// The deduplicated checklist visible at `inspection_id`.
    pub async fn resolve(&self, inspection_id: &str) -> EngineResult<ResolvedChecklist> {
        let lineage = self.walk_lineage(inspection_id).await?;
        Ok(self.resolve_lineage(&lineage))
    }

    /// Create a follow-up of `parent_id` carrying its resolved checklist.
    pub async fn create_follow_up(
        &self,
        parent_id: &str,
        request: FollowUpRequest,
    ) -> EngineResult<FollowUp> {
        let actor = self.actor("create_follow_up")?;
        let lineage = self.walk_lineage(parent_id).await?;
        let checklist = self.resolve_lineage(&lineage);
        remap::create_follow_up(
            self.store.as_ref(),
            &lineage,
            &checklist.tasks,
            &request,
            &actor,
        )
        .await
    }

    /// Plan a status change without writing anything.
    pub async fn plan_transition(
        &self,
        task_id: &str,
        request: &TransitionRequest,
    ) -> EngineResult<PendingTransition> {
        let actor = self.actor("transition")?;
        let task = self.load_task(task_id).await?;
        plan_transition(&task, request, &actor, now_ms())
    }

    /// Persist a planned transition and settle it.
    pub async fn commit(&self, pending: PendingTransition) -> Reconciled {
        if pending.is_noop() {
            let task = pending.previous.clone();
            return pending.reconcile(Ok(task));
        }
        let result = self.store.commit_transition(pending.commit.clone()).await;
        match result {
            Ok(ref task) => info!(
                task = %task.id,
                from = %pending.from,
                to = %pending.to,
                "Committed task transition"
            ),
            Err(ref err) => warn!(
                task = %pending.task_id,
                error = %err,
                "Task transition reverted"
            ),
        }
        pending.reconcile(result)
    }

    /// Plan and commit a status change, returning the durable row.
    pub async fn transition(&self, task_id: &str, request: TransitionRequest) -> EngineResult<Task> {
        let pending = self.plan_transition(task_id, &request).await?;
        self.commit(pending).await.into_result()
    }

    /// Mark a task done or not done.
    pub async fn set_completed(&self, task_id: &str, completed: bool) -> EngineResult<Task> {
        let actor = self.actor("set_completed")?;
        let task = self.load_task(task_id).await?;
        let pending = plan_completion(&task, completed, &actor, now_ms());
        self.commit(pending).await.into_result()
    }

    /// Append a free-text note to a task's history.
    pub async fn add_note(&self, task_id: &str, note: &str) -> EngineResult<Activity> {
        let actor = self.actor("add_note")?;
        let note = note.trim();
        if note.is_empty() {
            return Err(EngineError::missing("note", "Note text cannot be empty"));
        }
        let task = self.load_task(task_id).await?;
        self.store
            .insert_activity(NewActivity {
                task_id: task.id,
                kind: ActivityKind::NoteAdded,
                note: note.to_string(),
                actor,
            })
            .await
    }

    /// A task's activity, oldest first.
    pub async fn history(&self, task_id: &str) -> EngineResult<Vec<Activity>> {
        self.store.list_activities(task_id).await
    }

    /// Inventory and vendor aggregates over the resolved checklist.
    pub async fn report(&self, inspection_id: &str) -> EngineResult<AggregateReport> {
        let checklist = self.resolve(inspection_id).await?;
        Ok(aggregate(&checklist))
    }
}
