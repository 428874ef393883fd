//! Storage contracts consumed by the engine.
//!
//! The engine never talks to a database directly; `db::SqliteStore` is the
//! bundled implementation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    DueDateCalculation, HistoryEvent, Task, TaskDependency, TaskSeries, TaskStatus,
};

/// Which open/closed tasks a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    All,
    Open,
    Status(TaskStatus),
}

pub trait TaskStore {
    fn find_task(&self, id: &str) -> Result<Option<Task>>;
    /// Full id or unique id prefix, scoped to the owner.
    fn resolve_task(&self, owner_id: &str, reference: &str) -> Result<Task>;
    fn insert_task(&self, task: &Task) -> Result<()>;
    /// Compare-and-swap on `task.version`. Returns the stored row with its new version.
    fn update_task(&self, task: &Task) -> Result<Task>;
    fn delete_task(&self, id: &str) -> Result<()>;
    /// Atomically increments `bump_count` and returns the updated row.
    fn increment_bump_count(&self, id: &str) -> Result<Task>;
    fn list_tasks(&self, owner_id: &str, filter: TaskFilter) -> Result<Vec<Task>>;
    fn list_tasks_due_between(
        &self,
        owner_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Task>>;
    fn list_subtasks(&self, parent_id: &str) -> Result<Vec<Task>>;
    fn count_incomplete_subtasks(&self, parent_id: &str) -> Result<i64>;

    fn get_task(&self, id: &str) -> Result<Task> {
        self.find_task(id)?
            .ok_or_else(|| crate::error::TaskrankError::task_not_found(id))
    }
}

pub trait DependencyStore {
    fn list_dependencies(&self, owner_id: &str) -> Result<Vec<TaskDependency>>;
    fn dependency_exists(&self, task_id: &str, blocked_by_id: &str) -> Result<bool>;
    /// Insert an edge after `guard` accepts the owner's current edge set.
    /// Snapshot, guard and insert happen inside one write transaction.
    fn insert_dependency_guarded(
        &self,
        owner_id: &str,
        edge: &TaskDependency,
        guard: &dyn Fn(&[TaskDependency]) -> Result<()>,
    ) -> Result<()>;
    fn remove_dependency(&self, task_id: &str, blocked_by_id: &str) -> Result<bool>;
    fn blockers_of(&self, task_id: &str) -> Result<Vec<String>>;
    fn dependents_of(&self, blocked_by_id: &str) -> Result<Vec<String>>;
    fn count_incomplete_blockers(&self, task_id: &str) -> Result<i64>;
    fn count_incomplete_blockers_batch(&self, task_ids: &[String]) -> Result<HashMap<String, i64>>;
}

pub trait SeriesStore {
    fn insert_series(&self, series: &TaskSeries) -> Result<()>;
    fn find_series(&self, id: &str) -> Result<Option<TaskSeries>>;
    fn update_series(&self, series: &TaskSeries) -> Result<()>;
    fn deactivate_series(&self, id: &str, at: DateTime<Utc>) -> Result<()>;
    fn list_series(&self, owner_id: &str, active_only: bool) -> Result<Vec<TaskSeries>>;
    /// Every task of the series, oldest first.
    fn list_series_tasks(&self, series_id: &str) -> Result<Vec<Task>>;
}

pub trait PreferenceStore {
    fn default_calculation(&self, owner_id: &str) -> Result<Option<DueDateCalculation>>;
    fn set_default_calculation(&self, owner_id: &str, calc: DueDateCalculation) -> Result<()>;
    fn category_calculation(
        &self,
        owner_id: &str,
        category: &str,
    ) -> Result<Option<DueDateCalculation>>;
    fn set_category_calculation(
        &self,
        owner_id: &str,
        category: &str,
        calc: DueDateCalculation,
    ) -> Result<()>;
    fn delete_category_calculation(&self, owner_id: &str, category: &str) -> Result<bool>;
    fn list_category_calculations(
        &self,
        owner_id: &str,
    ) -> Result<Vec<(String, DueDateCalculation)>>;
}

/// Audit trail. Callers treat failures as non-fatal.
pub trait HistorySink {
    fn record(&self, event: &HistoryEvent) -> Result<()>;
    /// Events for one task, oldest first.
    fn history_for(&self, task_id: &str) -> Result<Vec<HistoryEvent>>;
}

pub trait UnitOfWork {
    fn in_transaction<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T>;
}

/// Everything the engine needs from persistence.
pub trait Store:
    TaskStore + DependencyStore + SeriesStore + PreferenceStore + HistorySink + UnitOfWork
{
}

impl<T> Store for T where
    T: TaskStore + DependencyStore + SeriesStore + PreferenceStore + HistorySink + UnitOfWork
{
}

/// Record a history event, logging instead of failing.
pub fn record_soft<S: HistorySink + ?Sized>(sink: &S, event: HistoryEvent) {
    if let Err(e) = sink.record(&event) {
        tracing::warn!(
            task_id = %event.task_id,
            kind = event.kind.as_str(),
            error = %e,
            "failed to record history event"
        );
    }
}
