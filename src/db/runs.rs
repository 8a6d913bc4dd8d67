//! Per-inspection run rows.

use super::{Database, new_id, now_ms};
use crate::types::{NewRun, Run};
use anyhow::Result;
use rusqlite::params;

impl Database {
    /// Insert runs in one transaction; returns them in input order.
    pub fn insert_runs(&self, runs: &[NewRun]) -> Result<Vec<Run>> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut inserted = Vec::with_capacity(runs.len());

            for new in runs {
                let id = new_id();
                tx.execute(
                    "INSERT INTO runs (id, inspection_id, template_id, unit_id, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![&id, &new.inspection_id, &new.template_id, &new.unit_id, now],
                )?;
                inserted.push(Run {
                    id,
                    inspection_id: new.inspection_id.clone(),
                    template_id: new.template_id.clone(),
                    unit_id: new.unit_id.clone(),
                });
            }

            tx.commit()?;
            Ok(inserted)
        })
    }

    /// List an inspection's runs in creation order.
    pub fn list_runs(&self, inspection_id: &str) -> Result<Vec<Run>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, inspection_id, template_id, unit_id
                 FROM runs WHERE inspection_id = ?1 ORDER BY rowid ASC",
            )?;
            let runs = stmt
                .query_map(params![inspection_id], |row| {
                    Ok(Run {
                        id: row.get(0)?,
                        inspection_id: row.get(1)?,
                        template_id: row.get(2)?,
                        unit_id: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(runs)
        })
    }
}
