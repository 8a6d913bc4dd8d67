//! Inspection rows.

use super::{Database, new_id, now_ms};
use crate::types::{Inspection, InspectionStatus, InspectionType, NewInspection};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, Row, params};

pub fn parse_inspection_row(row: &Row) -> rusqlite::Result<Inspection> {
    let type_str: String = row.get("inspection_type")?;
    let inspection_type = InspectionType::parse(&type_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown inspection type '{}'", type_str).into(),
        )
    })?;
    let status: String = row.get("status")?;
    let archived: i64 = row.get("archived")?;

    Ok(Inspection {
        id: row.get("id")?,
        inspection_type,
        scheduled_at: row.get("scheduled_at")?,
        property_id: row.get("property_id")?,
        unit_id: row.get("unit_id")?,
        parent_inspection_id: row.get("parent_inspection_id")?,
        template_id: row.get("template_id")?,
        status: InspectionStatus::parse(&status),
        archived: archived != 0,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
    })
}

/// Internal helper to get an inspection using an existing connection.
pub(crate) fn get_inspection_internal(
    conn: &Connection,
    inspection_id: &str,
) -> Result<Option<Inspection>> {
    let mut stmt = conn.prepare("SELECT * FROM inspections WHERE id = ?1")?;

    match stmt.query_row(params![inspection_id], parse_inspection_row) {
        Ok(inspection) => Ok(Some(inspection)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Database {
    /// Schedule a new inspection.
    pub fn insert_inspection(&self, new: &NewInspection) -> Result<Inspection> {
        let id = new_id();
        let now = now_ms();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO inspections (
                    id, inspection_type, scheduled_at, property_id, unit_id,
                    parent_inspection_id, template_id, status, archived, created_by, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?10)",
                params![
                    &id,
                    new.inspection_type.as_str(),
                    new.scheduled_at,
                    &new.property_id,
                    &new.unit_id,
                    &new.parent_inspection_id,
                    &new.template_id,
                    InspectionStatus::Pending.as_str(),
                    &new.created_by,
                    now,
                ],
            )?;

            get_inspection_internal(conn, &id)?
                .ok_or_else(|| anyhow!("Inspection {} vanished after insert", id))
        })
    }

    /// Get an inspection by id, archived or not.
    pub fn get_inspection(&self, inspection_id: &str) -> Result<Option<Inspection>> {
        self.with_conn(|conn| get_inspection_internal(conn, inspection_id))
    }

    /// List inspections, newest scheduled first.
    pub fn list_inspections(&self, include_archived: bool) -> Result<Vec<Inspection>> {
        self.with_conn(|conn| {
            let sql = if include_archived {
                "SELECT * FROM inspections ORDER BY scheduled_at DESC, id DESC"
            } else {
                "SELECT * FROM inspections WHERE archived = 0 ORDER BY scheduled_at DESC, id DESC"
            };
            let mut stmt = conn.prepare(sql)?;
            let inspections = stmt
                .query_map([], parse_inspection_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(inspections)
        })
    }

    /// Record the overall outcome of an inspection.
    pub fn set_inspection_status(&self, inspection_id: &str, status: InspectionStatus) -> Result<()> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE inspections SET status = ?1 WHERE id = ?2",
                params![status.as_str(), inspection_id],
            )?;
            if updated == 0 {
                return Err(anyhow!("Inspection not found: {}", inspection_id));
            }
            Ok(())
        })
    }

    /// Soft-delete an inspection. Inspections are never hard-deleted.
    pub fn archive_inspection(&self, inspection_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE inspections SET archived = 1 WHERE id = ?1",
                params![inspection_id],
            )?;
            if updated == 0 {
                return Err(anyhow!("Inspection not found: {}", inspection_id));
            }
            Ok(())
        })
    }
}
