use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::error::{Result, TaskrankError};
use crate::models::{DueDateCalculation, HistoryEvent, Task, TaskDependency, TaskSeries};
use crate::store::{
    DependencyStore, HistorySink, PreferenceStore, SeriesStore, TaskFilter, TaskStore, UnitOfWork,
};

use super::{dependency_repo, history_repo, preference_repo, series_repo, task_repo};

/// All storage contracts over a single SQLite connection.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(super::connection::open_in_memory()?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl UnitOfWork for SqliteStore {
    fn in_transaction<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f() {
            Ok(value) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }
}

impl TaskStore for SqliteStore {
    fn find_task(&self, id: &str) -> Result<Option<Task>> {
        task_repo::find_task(&self.conn, id)
    }

    fn resolve_task(&self, owner_id: &str, reference: &str) -> Result<Task> {
        task_repo::resolve_task(&self.conn, owner_id, reference)
    }

    fn insert_task(&self, task: &Task) -> Result<()> {
        task_repo::insert_task(&self.conn, task)
    }

    fn update_task(&self, task: &Task) -> Result<Task> {
        task_repo::update_task(&self.conn, task)
    }

    fn delete_task(&self, id: &str) -> Result<()> {
        task_repo::delete_task(&self.conn, id)
    }

    fn increment_bump_count(&self, id: &str) -> Result<Task> {
        task_repo::increment_bump_count(&self.conn, id)
    }

    fn list_tasks(&self, owner_id: &str, filter: TaskFilter) -> Result<Vec<Task>> {
        task_repo::list_tasks(&self.conn, owner_id, filter)
    }

    fn list_tasks_due_between(
        &self,
        owner_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Task>> {
        task_repo::list_tasks_due_between(&self.conn, owner_id, from, to)
    }

    fn list_subtasks(&self, parent_id: &str) -> Result<Vec<Task>> {
        task_repo::list_subtasks(&self.conn, parent_id)
    }

    fn count_incomplete_subtasks(&self, parent_id: &str) -> Result<i64> {
        task_repo::count_incomplete_subtasks(&self.conn, parent_id)
    }
}

impl DependencyStore for SqliteStore {
    fn list_dependencies(&self, owner_id: &str) -> Result<Vec<TaskDependency>> {
        dependency_repo::get_all_dependencies_for_owner(&self.conn, owner_id)
    }

    fn dependency_exists(&self, task_id: &str, blocked_by_id: &str) -> Result<bool> {
        dependency_repo::dependency_exists(&self.conn, task_id, blocked_by_id)
    }

    fn insert_dependency_guarded(
        &self,
        owner_id: &str,
        edge: &TaskDependency,
        guard: &dyn Fn(&[TaskDependency]) -> Result<()>,
    ) -> Result<()> {
        self.in_transaction(|| {
            let edges = dependency_repo::get_all_dependencies_for_owner(&self.conn, owner_id)?;
            guard(&edges)?;
            dependency_repo::add_dependency(&self.conn, &edge.task_id, &edge.blocked_by_id)
                .map_err(|e| TaskrankError::database(format!("inserting dependency: {}", e.message)))
        })
    }

    fn remove_dependency(&self, task_id: &str, blocked_by_id: &str) -> Result<bool> {
        dependency_repo::remove_dependency(&self.conn, task_id, blocked_by_id)
    }

    fn blockers_of(&self, task_id: &str) -> Result<Vec<String>> {
        dependency_repo::get_blockers(&self.conn, task_id)
    }

    fn dependents_of(&self, blocked_by_id: &str) -> Result<Vec<String>> {
        dependency_repo::get_dependents(&self.conn, blocked_by_id)
    }

    fn count_incomplete_blockers(&self, task_id: &str) -> Result<i64> {
        dependency_repo::count_incomplete_blockers(&self.conn, task_id)
    }

    fn count_incomplete_blockers_batch(&self, task_ids: &[String]) -> Result<HashMap<String, i64>> {
        dependency_repo::count_incomplete_blockers_batch(&self.conn, task_ids)
    }
}

impl SeriesStore for SqliteStore {
    fn insert_series(&self, series: &TaskSeries) -> Result<()> {
        series_repo::create_series(&self.conn, series)
    }

    fn find_series(&self, id: &str) -> Result<Option<TaskSeries>> {
        series_repo::find_series(&self.conn, id)
    }

    fn update_series(&self, series: &TaskSeries) -> Result<()> {
        series_repo::update_series(&self.conn, series)
    }

    fn deactivate_series(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        series_repo::deactivate_series(&self.conn, id, at)
    }

    fn list_series(&self, owner_id: &str, active_only: bool) -> Result<Vec<TaskSeries>> {
        series_repo::list_series(&self.conn, owner_id, active_only)
    }

    fn list_series_tasks(&self, series_id: &str) -> Result<Vec<Task>> {
        task_repo::list_series_tasks(&self.conn, series_id)
    }
}

impl PreferenceStore for SqliteStore {
    fn default_calculation(&self, owner_id: &str) -> Result<Option<DueDateCalculation>> {
        preference_repo::get_default(&self.conn, owner_id)
    }

    fn set_default_calculation(&self, owner_id: &str, calc: DueDateCalculation) -> Result<()> {
        preference_repo::set_default(&self.conn, owner_id, calc)
    }

    fn category_calculation(
        &self,
        owner_id: &str,
        category: &str,
    ) -> Result<Option<DueDateCalculation>> {
        preference_repo::get_category(&self.conn, owner_id, category)
    }

    fn set_category_calculation(
        &self,
        owner_id: &str,
        category: &str,
        calc: DueDateCalculation,
    ) -> Result<()> {
        preference_repo::set_category(&self.conn, owner_id, category, calc)
    }

    fn delete_category_calculation(&self, owner_id: &str, category: &str) -> Result<bool> {
        preference_repo::delete_category(&self.conn, owner_id, category)
    }

    fn list_category_calculations(
        &self,
        owner_id: &str,
    ) -> Result<Vec<(String, DueDateCalculation)>> {
        preference_repo::list_categories(&self.conn, owner_id)
    }
}

impl HistorySink for SqliteStore {
    fn record(&self, event: &HistoryEvent) -> Result<()> {
        history_repo::insert_event(&self.conn, event)
    }

    fn history_for(&self, task_id: &str) -> Result<Vec<HistoryEvent>> {
        history_repo::list_for_task(&self.conn, task_id)
    }
}
