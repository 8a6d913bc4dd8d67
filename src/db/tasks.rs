//! Task rows, their assignee sets and atomic status transitions.

use super::activities::insert_activity_internal;
use super::{Database, new_id, now_ms};
use crate::types::{NewTask, Task, TaskPatch, TaskStatus, TransitionCommit};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, Row, params};
use std::collections::BTreeSet;
use tracing::warn;

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let id: String = row.get("id")?;
    let status_str: String = row.get("status")?;
    let status = TaskStatus::parse(&status_str).unwrap_or_else(|| {
        warn!(task = %id, status = %status_str, "Unknown stored task status, reading as pending");
        TaskStatus::Pending
    });
    let completed: i64 = row.get("completed")?;

    Ok(Task {
        id,
        inspection_id: row.get("inspection_id")?,
        original_inspection_id: row.get("original_inspection_id")?,
        room_id: row.get("room_id")?,
        origin_room_id: row.get("origin_room_id")?,
        room_name: row.get("room_name")?,
        run_id: row.get("run_id")?,
        description: row.get("description")?,
        status,
        completed: completed != 0,
        completed_by: row.get("completed_by")?,
        completed_at: row.get("completed_at")?,
        inventory_type_id: row.get("inventory_type_id")?,
        quantity: row.get("quantity")?,
        vendor_type_id: row.get("vendor_type_id")?,
        assigned_user_ids: BTreeSet::new(),
        status_changed_by: row.get("status_changed_by")?,
        status_changed_at: row.get("status_changed_at")?,
        fail_attachment_id: row.get("fail_attachment_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Load the assignee set of a task.
fn load_assignees(conn: &Connection, task_id: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn.prepare("SELECT user_id FROM task_assignees WHERE task_id = ?1")?;
    let users = stmt
        .query_map(params![task_id], |row| row.get::<_, String>(0))?
        .collect::<Result<BTreeSet<_>, _>>()?;
    Ok(users)
}

/// Origin of the room a new row points at, unless the caller supplied one.
fn resolve_origin_room(conn: &Connection, new: &NewTask) -> Result<Option<String>> {
    if new.origin_room_id.is_some() {
        return Ok(new.origin_room_id.clone());
    }
    let Some(ref room_id) = new.room_id else {
        return Ok(None);
    };
    match conn.query_row(
        "SELECT origin_room_id FROM rooms WHERE id = ?1",
        params![room_id],
        |row| row.get::<_, String>(0),
    ) {
        Ok(origin) => Ok(Some(origin)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
fn get_task_internal(conn: &Connection, task_id: &str) -> Result<Option<Task>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1")?;

    let mut task = match stmt.query_row(params![task_id], parse_task_row) {
        Ok(task) => task,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    task.assigned_user_ids = load_assignees(conn, task_id)?;
    Ok(Some(task))
}

/// Apply a field-level patch. Only the fields present in the patch are written.
fn apply_patch_internal(conn: &Connection, task_id: &str, patch: &TaskPatch) -> Result<()> {
    let mut sets: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    let mut push = |column: &str, value: Box<dyn rusqlite::ToSql>| {
        param_values.push(value);
        sets.push(format!("{} = ?{}", column, param_values.len()));
    };

    if let Some(status) = patch.status {
        push("status", Box::new(status.as_str()));
    }
    if let Some(ref by) = patch.status_changed_by {
        push("status_changed_by", Box::new(by.clone()));
    }
    if let Some(at) = patch.status_changed_at {
        push("status_changed_at", Box::new(at));
    }
    if let Some(completed) = patch.completed {
        push("completed", Box::new(completed as i64));
    }
    if let Some(ref by) = patch.completed_by {
        push("completed_by", Box::new(by.clone()));
    }
    if let Some(at) = patch.completed_at {
        push("completed_at", Box::new(at));
    }
    if let Some(quantity) = patch.quantity {
        push("quantity", Box::new(quantity));
    }
    if let Some(ref attachment) = patch.fail_attachment_id {
        push("fail_attachment_id", Box::new(attachment.clone()));
    }
    if let Some(ref description) = patch.description {
        push("description", Box::new(description.clone()));
    }
    if let Some(ref room_id) = patch.room_id {
        push("room_id", Box::new(room_id.clone()));
    }
    if let Some(ref run_id) = patch.run_id {
        push("run_id", Box::new(run_id.clone()));
    }

    push("updated_at", Box::new(now_ms()));
    param_values.push(Box::new(task_id.to_string()));

    let sql = format!(
        "UPDATE tasks SET {} WHERE id = ?{}",
        sets.join(", "),
        param_values.len()
    );
    let param_refs: Vec<&dyn rusqlite::ToSql> = param_values.iter().map(|b| b.as_ref()).collect();

    let updated = conn.execute(&sql, param_refs.as_slice())?;
    if updated == 0 {
        return Err(anyhow!("Task not found: {}", task_id));
    }
    Ok(())
}

impl Database {
    /// Insert task rows in one transaction; returns them in input order.
    pub fn insert_tasks(&self, tasks: &[NewTask]) -> Result<Vec<Task>> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut ids = Vec::with_capacity(tasks.len());

            for new in tasks {
                let id = new_id();
                let original = new
                    .original_inspection_id
                    .as_deref()
                    .unwrap_or(&new.inspection_id);
                let origin_room = resolve_origin_room(&tx, new)?;

                tx.execute(
                    "INSERT INTO tasks (
                        id, inspection_id, original_inspection_id, room_id, origin_room_id,
                        room_name, run_id, description, status, completed, inventory_type_id,
                        quantity, vendor_type_id, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?11, ?12, ?13, ?14)",
                    params![
                        &id,
                        &new.inspection_id,
                        original,
                        &new.room_id,
                        &origin_room,
                        &new.room_name,
                        &new.run_id,
                        &new.description,
                        new.status.as_str(),
                        &new.inventory_type_id,
                        new.quantity,
                        &new.vendor_type_id,
                        now,
                        now,
                    ],
                )?;

                for user in &new.assigned_user_ids {
                    tx.execute(
                        "INSERT OR IGNORE INTO task_assignees (task_id, user_id) VALUES (?1, ?2)",
                        params![&id, user],
                    )?;
                }
                ids.push(id);
            }

            let mut inserted = Vec::with_capacity(ids.len());
            for id in &ids {
                let task = get_task_internal(&tx, id)?
                    .ok_or_else(|| anyhow!("Task {} vanished after insert", id))?;
                inserted.push(task);
            }

            tx.commit()?;
            Ok(inserted)
        })
    }

    /// Read one window of an inspection's tasks in insertion order.
    pub fn list_tasks_page(&self, inspection_id: &str, offset: usize, limit: usize) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM tasks WHERE inspection_id = ?1
                 ORDER BY rowid ASC LIMIT ?2 OFFSET ?3",
            )?;
            let mut tasks = stmt
                .query_map(params![inspection_id, limit as i64, offset as i64], parse_task_row)?
                .collect::<Result<Vec<_>, _>>()?;

            for task in &mut tasks {
                task.assigned_user_ids = load_assignees(conn, &task.id)?;
            }
            Ok(tasks)
        })
    }

    /// Get a task by id.
    pub fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// Apply a field-level patch and return the updated row.
    pub fn update_task(&self, task_id: &str, patch: &TaskPatch) -> Result<Task> {
        self.with_conn(|conn| {
            apply_patch_internal(conn, task_id, patch)?;
            get_task_internal(conn, task_id)?.ok_or_else(|| anyhow!("Task not found: {}", task_id))
        })
    }

    /// Delete a task row. Its activity history is kept.
    pub fn delete_task(&self, task_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            if deleted == 0 {
                return Err(anyhow!("Task not found: {}", task_id));
            }
            Ok(())
        })
    }

    /// Commit a status transition: patch, activity and assignee in one transaction.
    pub fn commit_transition(&self, commit: &TransitionCommit) -> Result<Task> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            apply_patch_internal(&tx, &commit.task_id, &commit.patch)?;

            if let Some(ref activity) = commit.activity {
                insert_activity_internal(&tx, activity)?;
            }

            if let Some(ref user) = commit.add_assignee {
                tx.execute(
                    "INSERT OR IGNORE INTO task_assignees (task_id, user_id) VALUES (?1, ?2)",
                    params![&commit.task_id, user],
                )?;
            }

            let task = get_task_internal(&tx, &commit.task_id)?
                .ok_or_else(|| anyhow!("Task not found: {}", commit.task_id))?;

            tx.commit()?;
            Ok(task)
        })
    }
}
