use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{ResultExt, TaskrankError};
use crate::models::{Effort, Task, TaskStatus, TaskType};
use crate::store::TaskFilter;

const TASK_COLUMNS: &str = "id, owner_id, title, description, category, context, related_people,
    task_type, status, user_priority, due_date, estimated_effort, bump_count, priority_score,
    parent_task_id, series_id, created_at, updated_at, completed_at, version";

pub fn insert_task(conn: &Connection, t: &Task) -> Result<(), TaskrankError> {
    conn.execute(
        "INSERT INTO tasks (id, owner_id, title, description, category, context, related_people,
            task_type, status, user_priority, due_date, estimated_effort, bump_count, priority_score,
            parent_task_id, series_id, created_at, updated_at, completed_at, version)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
        params![
            t.id,
            t.owner_id,
            t.title,
            t.description,
            t.category,
            t.context,
            people_json(&t.related_people),
            t.task_type.as_str(),
            t.status.as_str(),
            t.user_priority,
            t.due_date,
            t.estimated_effort.map(|e| e.as_str()),
            t.bump_count,
            t.priority_score,
            t.parent_task_id,
            t.series_id,
            t.created_at,
            t.updated_at,
            t.completed_at,
            t.version,
        ],
    )
    .context("inserting task")?;
    Ok(())
}

pub fn find_task(conn: &Connection, id: &str) -> Result<Option<Task>, TaskrankError> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
    conn.query_row(&sql, params![id], row_to_task)
        .optional()
        .context("loading task")
}

pub fn get_task_by_id(conn: &Connection, id: &str) -> Result<Task, TaskrankError> {
    find_task(conn, id)?.ok_or_else(|| TaskrankError::task_not_found(id))
}

/// Resolve a full id or a unique id prefix among one owner's tasks.
pub fn resolve_task(conn: &Connection, owner_id: &str, reference: &str) -> Result<Task, TaskrankError> {
    if let Some(task) = find_task(conn, reference)? {
        if task.owner_id == owner_id {
            return Ok(task);
        }
    }

    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ?1 AND id LIKE ?2 ESCAPE '\\' LIMIT 6");
    let mut stmt = conn.prepare(&sql)?;
    let prefix = format!("{}%", escape_like(&reference.to_uppercase()));
    let mut tasks: Vec<Task> = stmt
        .query_map(params![owner_id, prefix], row_to_task)?
        .collect::<Result<Vec<_>, _>>()?;

    match tasks.len() {
        0 => Err(TaskrankError::task_not_found(reference)),
        1 => Ok(tasks.remove(0)),
        _ => {
            let candidates: Vec<String> =
                tasks.iter().map(|t| format!("{} ({})", t.title, t.id)).collect();
            Err(TaskrankError::ambiguous_ref(reference, &candidates))
        }
    }
}

/// Make `%`, `_` and `\` match literally under `ESCAPE '\'`.
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Write every mutable column, guarded by the caller's view of `version`.
pub fn update_task(conn: &Connection, t: &Task) -> Result<Task, TaskrankError> {
    let changed = conn
        .execute(
            "UPDATE tasks SET title = ?1, description = ?2, category = ?3, context = ?4,
                related_people = ?5, status = ?6, user_priority = ?7, due_date = ?8,
                estimated_effort = ?9, bump_count = ?10, priority_score = ?11,
                parent_task_id = ?12, series_id = ?13, updated_at = ?14, completed_at = ?15,
                version = version + 1
             WHERE id = ?16 AND version = ?17",
            params![
                t.title,
                t.description,
                t.category,
                t.context,
                people_json(&t.related_people),
                t.status.as_str(),
                t.user_priority,
                t.due_date,
                t.estimated_effort.map(|e| e.as_str()),
                t.bump_count,
                t.priority_score,
                t.parent_task_id,
                t.series_id,
                t.updated_at,
                t.completed_at,
                t.id,
                t.version,
            ],
        )
        .context("updating task")?;

    if changed == 0 {
        return match find_task(conn, &t.id)? {
            Some(_) => Err(TaskrankError::version_conflict(&t.id)),
            None => Err(TaskrankError::task_not_found(&t.id)),
        };
    }
    get_task_by_id(conn, &t.id)
}

pub fn delete_task(conn: &Connection, id: &str) -> Result<(), TaskrankError> {
    let changed = conn
        .execute("DELETE FROM tasks WHERE id = ?1", params![id])
        .context("deleting task")?;
    if changed == 0 {
        return Err(TaskrankError::task_not_found(id));
    }
    Ok(())
}

pub fn increment_bump_count(conn: &Connection, id: &str) -> Result<Task, TaskrankError> {
    let changed = conn
        .execute(
            "UPDATE tasks SET bump_count = bump_count + 1, version = version + 1 WHERE id = ?1",
            params![id],
        )
        .context("bumping task")?;
    if changed == 0 {
        return Err(TaskrankError::task_not_found(id));
    }
    get_task_by_id(conn, id)
}

pub fn list_tasks(
    conn: &Connection,
    owner_id: &str,
    filter: TaskFilter,
) -> Result<Vec<Task>, TaskrankError> {
    let (clause, status) = match filter {
        TaskFilter::All => ("", None),
        TaskFilter::Open => ("AND status != 'done'", None),
        TaskFilter::Status(s) => ("AND status = ?2", Some(s.as_str())),
    };
    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ?1 {clause}
         ORDER BY priority_score DESC, created_at ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let tasks = match status {
        Some(s) => stmt
            .query_map(params![owner_id, s], row_to_task)?
            .collect::<Result<Vec<_>, _>>()?,
        None => stmt
            .query_map(params![owner_id], row_to_task)?
            .collect::<Result<Vec<_>, _>>()?,
    };
    Ok(tasks)
}

pub fn list_tasks_due_between(
    conn: &Connection,
    owner_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<Task>, TaskrankError> {
    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks
         WHERE owner_id = ?1 AND due_date IS NOT NULL AND due_date >= ?2 AND due_date <= ?3
         ORDER BY due_date ASC, priority_score DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let tasks = stmt
        .query_map(params![owner_id, from, to], row_to_task)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

pub fn list_subtasks(conn: &Connection, parent_id: &str) -> Result<Vec<Task>, TaskrankError> {
    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks
         WHERE parent_task_id = ?1 AND task_type = 'subtask'
         ORDER BY created_at ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let tasks = stmt
        .query_map(params![parent_id], row_to_task)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

pub fn count_incomplete_subtasks(conn: &Connection, parent_id: &str) -> Result<i64, TaskrankError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tasks
         WHERE parent_task_id = ?1 AND task_type = 'subtask' AND status != 'done'",
        params![parent_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn list_series_tasks(conn: &Connection, series_id: &str) -> Result<Vec<Task>, TaskrankError> {
    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE series_id = ?1 ORDER BY created_at ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let tasks = stmt
        .query_map(params![series_id], row_to_task)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

fn people_json(people: &[String]) -> String {
    serde_json::to_string(people).unwrap_or_else(|_| "[]".to_string())
}

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let people: String = row.get(6)?;
    Ok(Task {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        category: row.get(4)?,
        context: row.get(5)?,
        related_people: serde_json::from_str(&people).unwrap_or_default(),
        task_type: TaskType::from_str(&row.get::<_, String>(7)?).unwrap_or(TaskType::Regular),
        status: TaskStatus::from_str(&row.get::<_, String>(8)?).unwrap_or(TaskStatus::Todo),
        user_priority: row.get(9)?,
        due_date: row.get(10)?,
        estimated_effort: row
            .get::<_, Option<String>>(11)?
            .and_then(|s| Effort::from_str(&s)),
        bump_count: row.get(12)?,
        priority_score: row.get(13)?,
        parent_task_id: row.get(14)?,
        series_id: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
        completed_at: row.get(18)?,
        version: row.get(19)?,
    })
}
