//! Append-only task activity (audit) rows.

use super::{Database, new_id, now_ms};
use crate::types::{Activity, ActivityKind, NewActivity};
use anyhow::Result;
use rusqlite::{Connection, params};

/// Insert an activity using an existing connection, so it can join a transaction.
pub(crate) fn insert_activity_internal(conn: &Connection, new: &NewActivity) -> Result<Activity> {
    let id = new_id();
    let now = now_ms();

    conn.execute(
        "INSERT INTO activities (id, task_id, kind, note, actor, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![&id, &new.task_id, new.kind.as_str(), &new.note, &new.actor, now],
    )?;

    Ok(Activity {
        id,
        task_id: new.task_id.clone(),
        kind: new.kind,
        note: new.note.clone(),
        actor: new.actor.clone(),
        created_at: now,
    })
}

impl Database {
    /// Append an activity entry.
    pub fn insert_activity(&self, new: &NewActivity) -> Result<Activity> {
        self.with_conn(|conn| insert_activity_internal(conn, new))
    }

    /// Activity history of a task, oldest first.
    pub fn list_activities(&self, task_id: &str) -> Result<Vec<Activity>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_id, kind, note, actor, created_at
                 FROM activities WHERE task_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;

            let rows = stmt
                .query_map(params![task_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, i64>(5)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let activities = rows
                .into_iter()
                .filter_map(|(id, task_id, kind, note, actor, created_at)| {
                    let kind = match ActivityKind::parse(&kind) {
                        Some(kind) => kind,
                        None => {
                            tracing::warn!(activity = %id, kind = %kind, "Skipping activity of unknown kind");
                            return None;
                        }
                    };
                    Some(Activity {
                        id,
                        task_id,
                        kind,
                        note,
                        actor,
                        created_at,
                    })
                })
                .collect();

            Ok(activities)
        })
    }
}
