use rusqlite::Connection;

use crate::error::TaskrankError;

pub fn run_migrations(conn: &Connection) -> Result<(), TaskrankError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            category TEXT,
            context TEXT,
            related_people TEXT NOT NULL DEFAULT '[]',
            task_type TEXT NOT NULL DEFAULT 'regular'
                CHECK (task_type IN ('regular', 'subtask')),
            status TEXT NOT NULL DEFAULT 'todo'
                CHECK (status IN ('todo', 'in_progress', 'done')),
            user_priority INTEGER NOT NULL DEFAULT 5
                CHECK (user_priority BETWEEN 1 AND 10),
            due_date TEXT,
            estimated_effort TEXT
                CHECK (estimated_effort IS NULL OR estimated_effort IN ('small', 'medium', 'large', 'xlarge')),
            bump_count INTEGER NOT NULL DEFAULT 0 CHECK (bump_count >= 0),
            priority_score INTEGER NOT NULL DEFAULT 0,
            parent_task_id TEXT REFERENCES tasks(id) ON DELETE SET NULL,
            series_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            completed_at TEXT,
            version INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS task_dependencies (
            task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
            blocked_by_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
            PRIMARY KEY (task_id, blocked_by_id),
            CHECK (task_id != blocked_by_id)
        );

        CREATE TABLE IF NOT EXISTS task_series (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            original_task_id TEXT NOT NULL,
            pattern TEXT NOT NULL
                CHECK (pattern IN ('none', 'daily', 'weekly', 'monthly')),
            interval_value INTEGER NOT NULL CHECK (interval_value BETWEEN 1 AND 365),
            end_date TEXT,
            due_date_calculation TEXT NOT NULL
                CHECK (due_date_calculation IN ('from_original', 'from_completion')),
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recurrence_preferences (
            owner_id TEXT PRIMARY KEY,
            due_date_calculation TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS category_preferences (
            owner_id TEXT NOT NULL,
            category TEXT NOT NULL,
            due_date_calculation TEXT NOT NULL,
            PRIMARY KEY (owner_id, category)
        );

        CREATE TABLE IF NOT EXISTS task_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id TEXT NOT NULL,
            task_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            old_value TEXT,
            new_value TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_owner_status ON tasks(owner_id, status);
        CREATE INDEX IF NOT EXISTS idx_tasks_owner_due ON tasks(owner_id, due_date);
        CREATE INDEX IF NOT EXISTS idx_tasks_parent ON tasks(parent_task_id);
        CREATE INDEX IF NOT EXISTS idx_tasks_series ON tasks(series_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_deps_task ON task_dependencies(task_id);
        CREATE INDEX IF NOT EXISTS idx_deps_blocker ON task_dependencies(blocked_by_id);
        CREATE INDEX IF NOT EXISTS idx_series_owner ON task_series(owner_id, is_active);
        CREATE INDEX IF NOT EXISTS idx_history_task ON task_history(task_id, id);
        ",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 6);
    }
}
