//! Per-inspection room rows.

use super::{Database, new_id, now_ms};
use crate::types::{NewRoom, Room};
use anyhow::Result;
use rusqlite::{Row, params};

fn parse_room_row(row: &Row) -> rusqlite::Result<Room> {
    Ok(Room {
        id: row.get("id")?,
        inspection_id: row.get("inspection_id")?,
        name: row.get("name")?,
        order_index: row.get("order_index")?,
        origin_room_id: row.get("origin_room_id")?,
    })
}

impl Database {
    /// Insert rooms in one transaction; returns them in input order.
    pub fn insert_rooms(&self, rooms: &[NewRoom]) -> Result<Vec<Room>> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut inserted = Vec::with_capacity(rooms.len());

            for new in rooms {
                let id = new_id();
                let origin = new.origin_room_id.clone().unwrap_or_else(|| id.clone());
                tx.execute(
                    "INSERT INTO rooms (id, inspection_id, name, order_index, origin_room_id, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![&id, &new.inspection_id, &new.name, new.order_index, &origin, now],
                )?;
                inserted.push(Room {
                    id,
                    inspection_id: new.inspection_id.clone(),
                    name: new.name.clone(),
                    order_index: new.order_index,
                    origin_room_id: origin,
                });
            }

            tx.commit()?;
            Ok(inserted)
        })
    }

    /// List an inspection's rooms ordered by their order index.
    pub fn list_rooms(&self, inspection_id: &str) -> Result<Vec<Room>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM rooms WHERE inspection_id = ?1 ORDER BY order_index ASC, rowid ASC",
            )?;
            let rooms = stmt
                .query_map(params![inspection_id], parse_room_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rooms)
        })
    }
}
