use std::collections::HashMap;

use rusqlite::{params, params_from_iter, Connection};

use crate::error::TaskrankError;
use crate::models::TaskDependency;

pub fn add_dependency(conn: &Connection, task_id: &str, blocked_by_id: &str) -> Result<(), TaskrankError> {
    conn.execute(
        "INSERT INTO task_dependencies (task_id, blocked_by_id) VALUES (?1, ?2)",
        params![task_id, blocked_by_id],
    )?;
    Ok(())
}

pub fn remove_dependency(conn: &Connection, task_id: &str, blocked_by_id: &str) -> Result<bool, TaskrankError> {
    let changed = conn.execute(
        "DELETE FROM task_dependencies WHERE task_id = ?1 AND blocked_by_id = ?2",
        params![task_id, blocked_by_id],
    )?;
    Ok(changed > 0)
}

pub fn dependency_exists(conn: &Connection, task_id: &str, blocked_by_id: &str) -> Result<bool, TaskrankError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM task_dependencies WHERE task_id = ?1 AND blocked_by_id = ?2",
        params![task_id, blocked_by_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Get the tasks blocking `task_id`.
pub fn get_blockers(conn: &Connection, task_id: &str) -> Result<Vec<String>, TaskrankError> {
    let mut stmt = conn.prepare(
        "SELECT blocked_by_id FROM task_dependencies WHERE task_id = ?1 ORDER BY blocked_by_id",
    )?;
    let ids = stmt
        .query_map(params![task_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

/// Get the tasks that `blocked_by_id` is blocking.
pub fn get_dependents(conn: &Connection, blocked_by_id: &str) -> Result<Vec<String>, TaskrankError> {
    let mut stmt = conn.prepare(
        "SELECT task_id FROM task_dependencies WHERE blocked_by_id = ?1 ORDER BY task_id",
    )?;
    let ids = stmt
        .query_map(params![blocked_by_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

/// Get all dependency edges for an owner (used for cycle detection).
pub fn get_all_dependencies_for_owner(conn: &Connection, owner_id: &str) -> Result<Vec<TaskDependency>, TaskrankError> {
    let mut stmt = conn.prepare(
        "SELECT td.task_id, td.blocked_by_id
         FROM task_dependencies td
         JOIN tasks t ON td.task_id = t.id
         WHERE t.owner_id = ?1",
    )?;
    let deps = stmt
        .query_map(params![owner_id], |row| {
            Ok(TaskDependency {
                task_id: row.get(0)?,
                blocked_by_id: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(deps)
}

pub fn count_incomplete_blockers(conn: &Connection, task_id: &str) -> Result<i64, TaskrankError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM task_dependencies td
         JOIN tasks t ON td.blocked_by_id = t.id
         WHERE td.task_id = ?1 AND t.status != 'done'",
        params![task_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// One query for many tasks. Every requested id is present in the result.
pub fn count_incomplete_blockers_batch(
    conn: &Connection,
    task_ids: &[String],
) -> Result<HashMap<String, i64>, TaskrankError> {
    let mut counts: HashMap<String, i64> = task_ids.iter().map(|id| (id.clone(), 0)).collect();
    if task_ids.is_empty() {
        return Ok(counts);
    }

    let placeholders = vec!["?"; task_ids.len()].join(", ");
    let sql = format!(
        "SELECT td.task_id, COUNT(*) FROM task_dependencies td
         JOIN tasks t ON td.blocked_by_id = t.id
         WHERE td.task_id IN ({placeholders}) AND t.status != 'done'
         GROUP BY td.task_id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(task_ids.iter()), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (id, count) = row?;
        counts.insert(id, count);
    }
    Ok(counts)
}
