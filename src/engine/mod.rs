//! The task graph and scoring engine.
//!
//! Every service borrows a [`Store`] and a [`Clock`]; [`Engine`] wires them
//! together the way the CLI uses them.

pub mod dependency;
pub mod lifecycle;
pub mod recurrence;
pub mod subtask;
pub mod tasks;
pub mod validation;

use crate::clock::Clock;
use crate::config::Config;
use crate::error::{Result, TaskrankError};
use crate::models::{
    DueDateCalculation, Task, TaskDraft, TaskSeries, TaskStatus, TaskType, DEFAULT_USER_PRIORITY,
};
use crate::scoring::PriorityCalculator;
use crate::store::{SeriesStore, Store, TaskStore};

pub use dependency::DependencyEngine;
pub use lifecycle::{
    CompletionGate, CompletionOptions, CompletionOutcome, Lifecycle, NoSuccessor,
    PreferenceScope, SuccessorPolicy,
};
pub use recurrence::{RecurrenceDefaults, RecurrenceEngine};
pub use subtask::{SubtaskCompletion, SubtaskGate};
pub use tasks::{RankedTask, TaskService};

/// Load a task and make sure `owner_id` owns it.
pub(crate) fn load_owned_task<S: TaskStore + ?Sized>(
    store: &S,
    owner_id: &str,
    task_id: &str,
) -> Result<Task> {
    let task = store.get_task(task_id)?;
    if task.owner_id != owner_id {
        return Err(TaskrankError::forbidden(&format!("Task {task_id}")));
    }
    Ok(task)
}

pub(crate) fn load_owned_series<S: SeriesStore + ?Sized>(
    store: &S,
    owner_id: &str,
    series_id: &str,
) -> Result<TaskSeries> {
    let series = store
        .find_series(series_id)?
        .ok_or_else(|| TaskrankError::series_not_found(series_id))?;
    if series.owner_id != owner_id {
        return Err(TaskrankError::forbidden(&format!("Series {series_id}")));
    }
    Ok(series)
}

/// Validate a draft and turn it into an unsaved, unscored task.
pub(crate) fn task_from_draft(
    owner_id: &str,
    draft: TaskDraft,
    task_type: TaskType,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<Task> {
    let title = validation::validate_title(&draft.title)?;
    let user_priority =
        validation::validate_priority(draft.user_priority.unwrap_or(DEFAULT_USER_PRIORITY))?;
    let category = validation::normalize_category(draft.category.as_deref())?;
    Ok(Task {
        id: ulid::Ulid::new().to_string(),
        owner_id: owner_id.to_string(),
        title,
        description: draft.description.filter(|d| !d.trim().is_empty()),
        category,
        context: draft.context.filter(|c| !c.trim().is_empty()),
        related_people: validation::normalize_people(draft.related_people),
        task_type,
        status: TaskStatus::Todo,
        user_priority,
        due_date: draft.due_date,
        estimated_effort: draft.estimated_effort,
        bump_count: 0,
        priority_score: 0,
        parent_task_id: None,
        series_id: None,
        created_at: now,
        updated_at: now,
        completed_at: None,
        version: 1,
    })
}

/// Shared wiring for the engine's services.
pub struct Engine<'a, S: Store> {
    store: &'a S,
    clock: &'a dyn Clock,
    calculator: PriorityCalculator,
    defaults: RecurrenceDefaults,
}

impl<'a, S: Store> Engine<'a, S> {
    pub fn new(store: &'a S, clock: &'a dyn Clock, config: &Config) -> Self {
        Self {
            store,
            clock,
            calculator: PriorityCalculator::new(config.scoring),
            defaults: RecurrenceDefaults {
                due_date_calculation: config.default_due_date_calculation,
            },
        }
    }

    pub fn with_default_calculation(mut self, calc: DueDateCalculation) -> Self {
        self.defaults.due_date_calculation = calc;
        self
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    pub fn calculator(&self) -> PriorityCalculator {
        self.calculator
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub fn tasks(&self) -> TaskService<'a, S> {
        TaskService::new(self.store, self.clock, self.calculator, self.recurrence())
    }

    pub fn dependencies(&self) -> DependencyEngine<'a, S> {
        DependencyEngine::new(self.store, self.clock)
    }

    pub fn subtasks(&self) -> SubtaskGate<'a, S> {
        SubtaskGate::new(self.store, self.clock, self.calculator)
    }

    pub fn recurrence(&self) -> RecurrenceEngine<'a, S> {
        RecurrenceEngine::new(self.store, self.clock, self.calculator, self.defaults)
    }

    /// Completion funnel with every gate and the recurrence engine attached.
    pub fn lifecycle(&self) -> Lifecycle<'a, S> {
        Lifecycle::new(self.store, self.clock)
            .with_gate(Box::new(self.subtasks()))
            .with_gate(Box::new(self.dependencies()))
            .with_successor(Box::new(self.recurrence()))
    }
}
