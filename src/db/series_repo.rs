use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{ResultExt, TaskrankError};
use crate::models::{DueDateCalculation, RecurrencePattern, TaskSeries};

const SERIES_COLUMNS: &str = "id, owner_id, original_task_id, pattern, interval_value, end_date,
    due_date_calculation, is_active, created_at, updated_at";

pub fn create_series(conn: &Connection, s: &TaskSeries) -> Result<(), TaskrankError> {
    conn.execute(
        "INSERT INTO task_series (id, owner_id, original_task_id, pattern, interval_value, end_date,
            due_date_calculation, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            s.id,
            s.owner_id,
            s.original_task_id,
            s.pattern.as_str(),
            s.interval_value,
            s.end_date,
            s.due_date_calculation.as_str(),
            s.is_active,
            s.created_at,
            s.updated_at,
        ],
    )
    .context("inserting series")?;
    Ok(())
}

pub fn find_series(conn: &Connection, id: &str) -> Result<Option<TaskSeries>, TaskrankError> {
    let sql = format!("SELECT {SERIES_COLUMNS} FROM task_series WHERE id = ?1");
    conn.query_row(&sql, params![id], row_to_series)
        .optional()
        .context("loading series")
}

pub fn update_series(conn: &Connection, s: &TaskSeries) -> Result<(), TaskrankError> {
    let changed = conn
        .execute(
            "UPDATE task_series SET pattern = ?1, interval_value = ?2, end_date = ?3,
                due_date_calculation = ?4, is_active = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                s.pattern.as_str(),
                s.interval_value,
                s.end_date,
                s.due_date_calculation.as_str(),
                s.is_active,
                s.updated_at,
                s.id,
            ],
        )
        .context("updating series")?;
    if changed == 0 {
        return Err(TaskrankError::series_not_found(&s.id));
    }
    Ok(())
}

pub fn deactivate_series(conn: &Connection, id: &str, at: DateTime<Utc>) -> Result<(), TaskrankError> {
    let changed = conn
        .execute(
            "UPDATE task_series SET is_active = 0, updated_at = ?1 WHERE id = ?2",
            params![at, id],
        )
        .context("deactivating series")?;
    if changed == 0 {
        return Err(TaskrankError::series_not_found(id));
    }
    Ok(())
}

pub fn list_series(conn: &Connection, owner_id: &str, active_only: bool) -> Result<Vec<TaskSeries>, TaskrankError> {
    let clause = if active_only { "AND is_active = 1" } else { "" };
    let sql = format!(
        "SELECT {SERIES_COLUMNS} FROM task_series WHERE owner_id = ?1 {clause}
         ORDER BY created_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let series = stmt
        .query_map(params![owner_id], row_to_series)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(series)
}

fn row_to_series(row: &rusqlite::Row) -> rusqlite::Result<TaskSeries> {
    Ok(TaskSeries {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        original_task_id: row.get(2)?,
        pattern: RecurrencePattern::from_str(&row.get::<_, String>(3)?)
            .unwrap_or(RecurrencePattern::None),
        interval_value: row.get(4)?,
        end_date: row.get(5)?,
        due_date_calculation: DueDateCalculation::from_str(&row.get::<_, String>(6)?)
            .unwrap_or(DueDateCalculation::FromOriginal),
        is_active: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
