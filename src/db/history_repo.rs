use rusqlite::{params, Connection};

use crate::error::TaskrankError;
use crate::models::{HistoryEvent, HistoryKind};

pub fn insert_event(conn: &Connection, e: &HistoryEvent) -> Result<(), TaskrankError> {
    conn.execute(
        "INSERT INTO task_history (owner_id, task_id, kind, old_value, new_value, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            e.owner_id,
            e.task_id,
            e.kind.as_str(),
            e.old_value,
            e.new_value,
            e.created_at
        ],
    )?;
    Ok(())
}

/// Events for one task, oldest first.
pub fn list_for_task(conn: &Connection, task_id: &str) -> Result<Vec<HistoryEvent>, TaskrankError> {
    let mut stmt = conn.prepare(
        "SELECT owner_id, task_id, kind, old_value, new_value, created_at
         FROM task_history WHERE task_id = ?1 ORDER BY id ASC",
    )?;
    let events = stmt
        .query_map(params![task_id], |row| {
            Ok(HistoryEvent {
                owner_id: row.get(0)?,
                task_id: row.get(1)?,
                kind: HistoryKind::from_str(&row.get::<_, String>(2)?)
                    .unwrap_or(HistoryKind::Updated),
                old_value: row.get(3)?,
                new_value: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}
