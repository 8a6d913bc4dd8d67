//! Typed repository interface the engine runs against.
//!
//! One trait per entity, exposing only the reads and writes the engine
//! needs. Every call may suspend on I/O. Implementations report failures as
//! `StoreReadFailed` / `StoreWriteFailed` so the engine can abort the
//! surrounding operation.

mod identity;
mod sqlite;

pub use identity::{EnvIdentity, IdentityProvider, StaticIdentity, USER_ENV_VAR};
pub use sqlite::SqliteStore;

use crate::error::EngineResult;
use crate::types::{
    Activity, Inspection, NewActivity, NewInspection, NewRoom, NewRun, NewTask, Page, Room, Run,
    Task, TaskPatch, TransitionCommit,
};
use async_trait::async_trait;

#[async_trait]
pub trait InspectionRepo: Send + Sync {
    /// `Ok(None)` when no inspection has this id.
    async fn get_inspection(&self, id: &str) -> EngineResult<Option<Inspection>>;

    async fn insert_inspection(&self, new: NewInspection) -> EngineResult<Inspection>;
}

#[async_trait]
pub trait RoomRepo: Send + Sync {
    /// Rooms of one inspection ordered by order index.
    async fn list_rooms(&self, inspection_id: &str) -> EngineResult<Vec<Room>>;

    async fn insert_rooms(&self, rooms: Vec<NewRoom>) -> EngineResult<Vec<Room>>;
}

#[async_trait]
pub trait RunRepo: Send + Sync {
    async fn list_runs(&self, inspection_id: &str) -> EngineResult<Vec<Run>>;

    async fn insert_runs(&self, runs: Vec<NewRun>) -> EngineResult<Vec<Run>>;
}

#[async_trait]
pub trait TaskRepo: Send + Sync {
    /// One window of the tasks owned by an inspection, in a stable order.
    /// A page shorter than `page.limit` is the last one.
    async fn list_tasks(&self, inspection_id: &str, page: Page) -> EngineResult<Vec<Task>>;

    async fn get_task(&self, id: &str) -> EngineResult<Option<Task>>;

    async fn insert_tasks(&self, tasks: Vec<NewTask>) -> EngineResult<Vec<Task>>;

    async fn update_task(&self, id: &str, patch: TaskPatch) -> EngineResult<Task>;

    async fn delete_task(&self, id: &str) -> EngineResult<()>;

    /// Apply a status transition's patch, activity and assignee together:
    /// either all three land or none does.
    async fn commit_transition(&self, commit: TransitionCommit) -> EngineResult<Task>;
}

#[async_trait]
pub trait ActivityRepo: Send + Sync {
    async fn insert_activity(&self, activity: NewActivity) -> EngineResult<Activity>;

    /// Activities of one task, oldest first.
    async fn list_activities(&self, task_id: &str) -> EngineResult<Vec<Activity>>;
}

/// Everything the engine needs from a record store.
pub trait RecordStore: InspectionRepo + RoomRepo + RunRepo + TaskRepo + ActivityRepo {}

impl<T> RecordStore for T where T: InspectionRepo + RoomRepo + RunRepo + TaskRepo + ActivityRepo {}
