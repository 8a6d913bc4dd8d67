//! Repository traits backed by the SQLite [`Database`].

use super::{ActivityRepo, InspectionRepo, RoomRepo, RunRepo, TaskRepo};
use crate::db::Database;
use crate::error::{EngineError, EngineResult};
use crate::types::{
    Activity, Inspection, NewActivity, NewInspection, NewRoom, NewRun, NewTask, Page, Room, Run,
    Task, TaskPatch, TransitionCommit,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Record store over a shared SQLite database handle.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Database>,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }
}

fn read_failed(op: &'static str) -> impl FnOnce(anyhow::Error) -> EngineError {
    move |err| {
        warn!(op, error = %err, "Store read failed");
        EngineError::store_read(err).with_details(op)
    }
}

fn write_failed(op: &'static str) -> impl FnOnce(anyhow::Error) -> EngineError {
    move |err| {
        warn!(op, error = %err, "Store write failed");
        EngineError::store_write(err).with_details(op)
    }
}

#[async_trait]
impl InspectionRepo for SqliteStore {
    async fn get_inspection(&self, id: &str) -> EngineResult<Option<Inspection>> {
        self.db.get_inspection(id).map_err(read_failed("get_inspection"))
    }

    async fn insert_inspection(&self, new: NewInspection) -> EngineResult<Inspection> {
        self.db
            .insert_inspection(&new)
            .map_err(write_failed("insert_inspection"))
    }
}

#[async_trait]
impl RoomRepo for SqliteStore {
    async fn list_rooms(&self, inspection_id: &str) -> EngineResult<Vec<Room>> {
        self.db
            .list_rooms(inspection_id)
            .map_err(read_failed("list_rooms"))
    }

    async fn insert_rooms(&self, rooms: Vec<NewRoom>) -> EngineResult<Vec<Room>> {
        self.db
            .insert_rooms(&rooms)
            .map_err(write_failed("insert_rooms"))
    }
}

#[async_trait]
impl RunRepo for SqliteStore {
    async fn list_runs(&self, inspection_id: &str) -> EngineResult<Vec<Run>> {
        self.db
            .list_runs(inspection_id)
            .map_err(read_failed("list_runs"))
    }

    async fn insert_runs(&self, runs: Vec<NewRun>) -> EngineResult<Vec<Run>> {
        self.db.insert_runs(&runs).map_err(write_failed("insert_runs"))
    }
}

#[async_trait]
impl TaskRepo for SqliteStore {
    async fn list_tasks(&self, inspection_id: &str, page: Page) -> EngineResult<Vec<Task>> {
        self.db
            .list_tasks_page(inspection_id, page.offset, page.limit)
            .map_err(read_failed("list_tasks"))
    }

    async fn get_task(&self, id: &str) -> EngineResult<Option<Task>> {
        self.db.get_task(id).map_err(read_failed("get_task"))
    }

    async fn insert_tasks(&self, tasks: Vec<NewTask>) -> EngineResult<Vec<Task>> {
        self.db
            .insert_tasks(&tasks)
            .map_err(write_failed("insert_tasks"))
    }

    async fn update_task(&self, id: &str, patch: TaskPatch) -> EngineResult<Task> {
        self.db
            .update_task(id, &patch)
            .map_err(write_failed("update_task"))
    }

    async fn delete_task(&self, id: &str) -> EngineResult<()> {
        self.db.delete_task(id).map_err(write_failed("delete_task"))
    }

    async fn commit_transition(&self, commit: TransitionCommit) -> EngineResult<Task> {
        self.db
            .commit_transition(&commit)
            .map_err(write_failed("commit_transition"))
    }
}

#[async_trait]
impl ActivityRepo for SqliteStore {
    async fn insert_activity(&self, activity: NewActivity) -> EngineResult<Activity> {
        self.db
            .insert_activity(&activity)
            .map_err(write_failed("insert_activity"))
    }

    async fn list_activities(&self, task_id: &str) -> EngineResult<Vec<Activity>> {
        self.db
            .list_activities(task_id)
            .map_err(read_failed("list_activities"))
    }
}
