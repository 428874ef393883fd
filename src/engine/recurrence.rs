use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{Result, TaskrankError};
use crate::models::{
    DueDateCalculation, HistoryEvent, HistoryKind, RecurrencePattern, RecurrenceRule,
    SeriesHistory, SeriesInstance, SeriesUpdate, Task, TaskSeries, TaskStatus,
};
use crate::recurrence::{next_due_date, next_due_date_anchored, validate_interval, validate_rule};
use crate::scoring::PriorityCalculator;
use crate::store::{record_soft, Store};

use super::lifecycle::{CompletionOptions, PreferenceScope, SuccessorPolicy};
use super::load_owned_series;
use super::validation::validate_category;

/// System-wide fallbacks, loaded from config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceDefaults {
    pub due_date_calculation: DueDateCalculation,
}

impl Default for RecurrenceDefaults {
    fn default() -> Self {
        Self {
            due_date_calculation: DueDateCalculation::FromOriginal,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryPreference {
    pub category: String,
    pub due_date_calculation: DueDateCalculation,
}

/// A user's stored preferences plus the mode that applies when none matches.
#[derive(Debug, Clone, Serialize)]
pub struct PreferenceSummary {
    pub user_default: Option<DueDateCalculation>,
    pub effective_default: DueDateCalculation,
    pub categories: Vec<CategoryPreference>,
}

pub struct RecurrenceEngine<'a, S> {
    store: &'a S,
    clock: &'a dyn Clock,
    calculator: PriorityCalculator,
    defaults: RecurrenceDefaults,
}

impl<'a, S: Store> RecurrenceEngine<'a, S> {
    pub fn new(
        store: &'a S,
        clock: &'a dyn Clock,
        calculator: PriorityCalculator,
        defaults: RecurrenceDefaults,
    ) -> Self {
        Self {
            store,
            clock,
            calculator,
            defaults,
        }
    }

    /// Persist `task`, plus a series when `rule` actually recurs.
    ///
    /// Task and series are written in one transaction.
    pub fn create_task_with_recurrence(
        &self,
        mut task: Task,
        rule: Option<&RecurrenceRule>,
    ) -> Result<(Task, Option<TaskSeries>)> {
        let Some(rule) = rule.filter(|r| r.pattern != RecurrencePattern::None) else {
            self.store.insert_task(&task)?;
            return Ok((task, None));
        };
        validate_rule(rule)?;

        let calc = self.resolve_calculation(
            &task.owner_id,
            task.category.as_deref(),
            rule.due_date_calculation,
        )?;
        let now = self.clock.now();
        let series = TaskSeries {
            id: ulid::Ulid::new().to_string(),
            owner_id: task.owner_id.clone(),
            original_task_id: task.id.clone(),
            pattern: rule.pattern,
            interval_value: rule.interval_value,
            end_date: rule.end_date,
            due_date_calculation: calc,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        task.series_id = Some(series.id.clone());

        self.store.in_transaction(|| {
            self.store.insert_task(&task)?;
            self.store.insert_series(&series)
        })?;
        info!(
            task_id = %task.id,
            series_id = %series.id,
            pattern = series.pattern.as_str(),
            interval = series.interval_value,
            "recurring series created"
        );
        Ok((task, Some(series)))
    }

    /// Create the follow-up instance of a completed series task, if the
    /// series still calls for one.
    pub fn generate_next_task(
        &self,
        completed: &Task,
        options: &CompletionOptions,
    ) -> Result<Option<Task>> {
        let Some(series_id) = completed.series_id.as_deref() else {
            return Ok(None);
        };
        let now = self.clock.now();

        if options.stop_recurrence {
            if let Some(series) = self.store.find_series(series_id)? {
                self.stop_series(&series, &completed.id, now)?;
            }
            return Ok(None);
        }
        if options.skip_next {
            debug!(task_id = %completed.id, series_id, "skipping next occurrence");
            return Ok(None);
        }

        let Some(series) = self.store.find_series(series_id)? else {
            warn!(task_id = %completed.id, series_id, "task references a missing series");
            return Ok(None);
        };
        if !series.is_active {
            debug!(series_id, "series inactive, nothing to generate");
            return Ok(None);
        }
        if series.end_date.is_some_and(|end| end < now) {
            debug!(series_id, "series end date has passed");
            return Ok(None);
        }

        let calc = options
            .due_date_calculation
            .unwrap_or(series.due_date_calculation);
        if let (Some(scope), Some(explicit)) =
            (options.save_preference, options.due_date_calculation)
        {
            self.save_preference(completed, scope, explicit)?;
        }

        let next_due = match completed.due_date {
            Some(due) => {
                let next = match calc {
                    DueDateCalculation::FromOriginal => {
                        let anchor_day = self.anchor_day(&series)?.unwrap_or_else(|| due.day());
                        next_due_date_anchored(due, series.pattern, series.interval_value, anchor_day)
                    }
                    DueDateCalculation::FromCompletion => {
                        let basis = completed.completed_at.unwrap_or(now);
                        next_due_date(basis, series.pattern, series.interval_value)
                    }
                };
                let next = next.ok_or_else(|| {
                    TaskrankError::validation(format!(
                        "cannot compute the next due date for series {series_id}"
                    ))
                })?;
                Some(next)
            }
            None => None,
        };

        if let (Some(next), Some(end)) = (next_due, series.end_date) {
            if next > end {
                info!(series_id, "next occurrence falls after the end date");
                self.stop_series(&series, &completed.id, now)?;
                return Ok(None);
            }
        }

        let mut next = next_instance_of(completed, next_due, now);
        next.priority_score = self.calculator.calculate_at(&next, now);
        self.store.insert_task(&next)?;
        info!(
            task_id = %next.id,
            previous_id = %completed.id,
            series_id,
            "next occurrence generated"
        );

        record_soft(
            self.store,
            HistoryEvent::new(&next.owner_id, &next.id, HistoryKind::Created, now)
                .values(None, Some(next.title.clone())),
        );
        record_soft(
            self.store,
            HistoryEvent::new(
                &completed.owner_id,
                &completed.id,
                HistoryKind::RecurrenceGenerated,
                now,
            )
            .values(None, Some(next.id.clone())),
        );
        Ok(Some(next))
    }

    pub fn series_history(&self, owner_id: &str, series_id: &str) -> Result<SeriesHistory> {
        let series = load_owned_series(self.store, owner_id, series_id)?;
        let instances = self
            .store
            .list_series_tasks(series_id)?
            .into_iter()
            .map(|t| SeriesInstance {
                task_id: t.id,
                title: t.title,
                status: t.status.as_str().to_string(),
                due_date: t.due_date,
                completed_at: t.completed_at,
                created_at: t.created_at,
            })
            .collect();
        Ok(SeriesHistory { series, instances })
    }

    pub fn update_series(
        &self,
        owner_id: &str,
        series_id: &str,
        update: SeriesUpdate,
    ) -> Result<TaskSeries> {
        let mut series = load_owned_series(self.store, owner_id, series_id)?;
        if let Some(pattern) = update.pattern {
            if pattern == RecurrencePattern::None {
                return Err(TaskrankError::validation(
                    "use `series stop` to end a series instead of setting pattern none",
                ));
            }
            series.pattern = pattern;
        }
        if let Some(interval) = update.interval_value {
            validate_interval(interval)?;
            series.interval_value = interval;
        }
        if let Some(end_date) = update.end_date {
            series.end_date = end_date;
        }
        if let Some(calc) = update.due_date_calculation {
            series.due_date_calculation = calc;
        }
        if let Some(active) = update.is_active {
            series.is_active = active;
        }
        series.updated_at = self.clock.now();
        self.store.update_series(&series)?;
        info!(series_id, "series updated");
        Ok(series)
    }

    /// Stop a series. Already inactive series are returned unchanged.
    pub fn deactivate_series(&self, owner_id: &str, series_id: &str) -> Result<TaskSeries> {
        let series = load_owned_series(self.store, owner_id, series_id)?;
        if !series.is_active {
            return Ok(series);
        }
        let now = self.clock.now();
        self.stop_series(&series, &series.original_task_id, now)?;
        self.store
            .find_series(series_id)?
            .ok_or_else(|| TaskrankError::series_not_found(series_id))
    }

    pub fn list_series(&self, owner_id: &str, active_only: bool) -> Result<Vec<TaskSeries>> {
        self.store.list_series(owner_id, active_only)
    }

    /// Explicit choice, then category override, then user default, then the
    /// configured default.
    pub fn resolve_calculation(
        &self,
        owner_id: &str,
        category: Option<&str>,
        explicit: Option<DueDateCalculation>,
    ) -> Result<DueDateCalculation> {
        if let Some(calc) = explicit {
            return Ok(calc);
        }
        if let Some(category) = category {
            if let Some(calc) = self.store.category_calculation(owner_id, category)? {
                return Ok(calc);
            }
        }
        Ok(self
            .store
            .default_calculation(owner_id)?
            .unwrap_or(self.defaults.due_date_calculation))
    }

    pub fn set_default_calculation(&self, owner_id: &str, calc: DueDateCalculation) -> Result<()> {
        self.store.set_default_calculation(owner_id, calc)?;
        info!(calc = calc.as_str(), "default due date calculation saved");
        Ok(())
    }

    pub fn set_category_calculation(
        &self,
        owner_id: &str,
        category: &str,
        calc: DueDateCalculation,
    ) -> Result<()> {
        let category = validate_category(category)?;
        self.store.set_category_calculation(owner_id, &category, calc)?;
        info!(category = %category, calc = calc.as_str(), "category due date calculation saved");
        Ok(())
    }

    /// Returns false when no override existed for the category.
    pub fn clear_category_calculation(&self, owner_id: &str, category: &str) -> Result<bool> {
        let category = validate_category(category)?;
        self.store.delete_category_calculation(owner_id, &category)
    }

    pub fn preferences(&self, owner_id: &str) -> Result<PreferenceSummary> {
        let user_default = self.store.default_calculation(owner_id)?;
        let categories = self
            .store
            .list_category_calculations(owner_id)?
            .into_iter()
            .map(|(category, due_date_calculation)| CategoryPreference {
                category,
                due_date_calculation,
            })
            .collect();
        Ok(PreferenceSummary {
            user_default,
            effective_default: user_default.unwrap_or(self.defaults.due_date_calculation),
            categories,
        })
    }

    fn save_preference(
        &self,
        completed: &Task,
        scope: PreferenceScope,
        calc: DueDateCalculation,
    ) -> Result<()> {
        match scope {
            PreferenceScope::Global => self.set_default_calculation(&completed.owner_id, calc),
            PreferenceScope::Category => match completed.category.as_deref() {
                Some(category) => self.set_category_calculation(&completed.owner_id, category, calc),
                None => Err(TaskrankError::validation(
                    "cannot save a category preference for a task without a category",
                )),
            },
        }
    }

    /// Day of month the series was first due on. Monthly occurrences return
    /// to it whenever the month is long enough.
    fn anchor_day(&self, series: &TaskSeries) -> Result<Option<u32>> {
        Ok(self
            .store
            .find_task(&series.original_task_id)?
            .and_then(|t| t.due_date)
            .map(|d| d.day()))
    }

    fn stop_series(&self, series: &TaskSeries, task_id: &str, now: DateTime<Utc>) -> Result<()> {
        if !series.is_active {
            return Ok(());
        }
        self.store.deactivate_series(&series.id, now)?;
        info!(series_id = %series.id, "series stopped");
        record_soft(
            self.store,
            HistoryEvent::new(&series.owner_id, task_id, HistoryKind::SeriesStopped, now)
                .values(Some(series.id.clone()), None),
        );
        Ok(())
    }
}

impl<S: Store> SuccessorPolicy for RecurrenceEngine<'_, S> {
    fn next_instance(&self, completed: &Task, options: &CompletionOptions) -> Result<Option<Task>> {
        self.generate_next_task(completed, options)
    }
}

/// Fresh copy of `completed` for the next period. The score is left for
/// the caller to compute.
fn next_instance_of(completed: &Task, due_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Task {
    Task {
        id: ulid::Ulid::new().to_string(),
        owner_id: completed.owner_id.clone(),
        title: completed.title.clone(),
        description: completed.description.clone(),
        category: completed.category.clone(),
        context: completed.context.clone(),
        related_people: completed.related_people.clone(),
        task_type: completed.task_type,
        status: TaskStatus::Todo,
        user_priority: completed.user_priority,
        due_date,
        estimated_effort: completed.estimated_effort,
        bump_count: 0,
        priority_score: 0,
        parent_task_id: Some(completed.id.clone()),
        series_id: completed.series_id.clone(),
        created_at: now,
        updated_at: now,
        completed_at: None,
        version: 1,
    }
}
