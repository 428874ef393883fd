use rusqlite::{params, Connection, OptionalExtension};

use crate::error::TaskrankError;
use crate::models::DueDateCalculation;

pub fn get_default(conn: &Connection, owner_id: &str) -> Result<Option<DueDateCalculation>, TaskrankError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT due_date_calculation FROM recurrence_preferences WHERE owner_id = ?1",
            params![owner_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(raw.and_then(|s| DueDateCalculation::from_str(&s)))
}

pub fn set_default(conn: &Connection, owner_id: &str, calc: DueDateCalculation) -> Result<(), TaskrankError> {
    conn.execute(
        "INSERT INTO recurrence_preferences (owner_id, due_date_calculation) VALUES (?1, ?2)
         ON CONFLICT(owner_id) DO UPDATE SET due_date_calculation = excluded.due_date_calculation",
        params![owner_id, calc.as_str()],
    )?;
    Ok(())
}

pub fn get_category(
    conn: &Connection,
    owner_id: &str,
    category: &str,
) -> Result<Option<DueDateCalculation>, TaskrankError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT due_date_calculation FROM category_preferences WHERE owner_id = ?1 AND category = ?2",
            params![owner_id, category],
            |row| row.get(0),
        )
        .optional()?;
    Ok(raw.and_then(|s| DueDateCalculation::from_str(&s)))
}

pub fn set_category(
    conn: &Connection,
    owner_id: &str,
    category: &str,
    calc: DueDateCalculation,
) -> Result<(), TaskrankError> {
    conn.execute(
        "INSERT INTO category_preferences (owner_id, category, due_date_calculation) VALUES (?1, ?2, ?3)
         ON CONFLICT(owner_id, category) DO UPDATE SET due_date_calculation = excluded.due_date_calculation",
        params![owner_id, category, calc.as_str()],
    )?;
    Ok(())
}

pub fn delete_category(conn: &Connection, owner_id: &str, category: &str) -> Result<bool, TaskrankError> {
    let changed = conn.execute(
        "DELETE FROM category_preferences WHERE owner_id = ?1 AND category = ?2",
        params![owner_id, category],
    )?;
    Ok(changed > 0)
}

pub fn list_categories(
    conn: &Connection,
    owner_id: &str,
) -> Result<Vec<(String, DueDateCalculation)>, TaskrankError> {
    let mut stmt = conn.prepare(
        "SELECT category, due_date_calculation FROM category_preferences
         WHERE owner_id = ?1 ORDER BY category",
    )?;
    let rows = stmt
        .query_map(params![owner_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows
        .into_iter()
        .filter_map(|(cat, raw)| DueDateCalculation::from_str(&raw).map(|c| (cat, c)))
        .collect())
}
