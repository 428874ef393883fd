use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{Result, TaskrankError};
use crate::models::{
    HistoryEvent, HistoryKind, RecurrenceRule, Task, TaskDraft, TaskSeries, TaskStatus, TaskType,
    TaskUpdate,
};
use crate::scoring::{is_at_risk, PriorityCalculator, ScoreBreakdown};
use crate::store::{record_soft, Store, TaskFilter};

use super::recurrence::RecurrenceEngine;
use super::validation::{normalize_category, normalize_people, validate_priority, validate_title};
use super::{load_owned_task, task_from_draft};

/// One row of the "what next" ordering.
#[derive(Debug, Clone, Serialize)]
pub struct RankedTask {
    #[serde(flatten)]
    pub task: Task,
    pub incomplete_blockers: i64,
    pub open_subtasks: i64,
    pub actionable: bool,
}

/// Everything `task show` prints.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    pub task: Task,
    pub breakdown: ScoreBreakdown,
    pub at_risk: bool,
    pub subtasks: Vec<Task>,
    pub blocked_by: Vec<String>,
    pub blocking: Vec<String>,
}

pub struct TaskService<'a, S> {
    store: &'a S,
    clock: &'a dyn Clock,
    calculator: PriorityCalculator,
    recurrence: RecurrenceEngine<'a, S>,
}

impl<'a, S: Store> TaskService<'a, S> {
    pub fn new(
        store: &'a S,
        clock: &'a dyn Clock,
        calculator: PriorityCalculator,
        recurrence: RecurrenceEngine<'a, S>,
    ) -> Self {
        Self {
            store,
            clock,
            calculator,
            recurrence,
        }
    }

    pub fn create_task(
        &self,
        owner_id: &str,
        draft: TaskDraft,
        rule: Option<&RecurrenceRule>,
    ) -> Result<(Task, Option<TaskSeries>)> {
        let now = self.clock.now();
        let mut task = task_from_draft(owner_id, draft, TaskType::Regular, now)?;
        task.priority_score = self.calculator.calculate_at(&task, now);

        let (task, series) = self.recurrence.create_task_with_recurrence(task, rule)?;
        info!(task_id = %task.id, score = task.priority_score, "task created");
        record_soft(
            self.store,
            HistoryEvent::new(owner_id, &task.id, HistoryKind::Created, now)
                .values(None, Some(task.title.clone())),
        );
        Ok((task, series))
    }

    /// Accepts a full id or a unique prefix of one.
    pub fn resolve(&self, owner_id: &str, reference: &str) -> Result<Task> {
        self.store.resolve_task(owner_id, reference)
    }

    pub fn detail(&self, owner_id: &str, task_id: &str) -> Result<TaskDetail> {
        let task = load_owned_task(self.store, owner_id, task_id)?;
        let now = self.clock.now();
        let (_, breakdown) = self.calculator.calculate_with_breakdown_at(&task, now);
        Ok(TaskDetail {
            at_risk: task.status.is_open() && is_at_risk(&task, now),
            subtasks: self.store.list_subtasks(task_id)?,
            blocked_by: self.store.blockers_of(task_id)?,
            blocking: self.store.dependents_of(task_id)?,
            breakdown,
            task,
        })
    }

    pub fn list_tasks(&self, owner_id: &str, filter: TaskFilter) -> Result<Vec<Task>> {
        self.store.list_tasks(owner_id, filter)
    }

    pub fn update_task(&self, owner_id: &str, task_id: &str, update: TaskUpdate) -> Result<Task> {
        if update.is_empty() {
            return Err(TaskrankError::validation("nothing to update"));
        }
        let rescore = update.touches_scoring();
        let mut task = load_owned_task(self.store, owner_id, task_id)?;
        let mut changed: Vec<&str> = Vec::new();

        if let Some(title) = update.title.as_deref() {
            task.title = validate_title(title)?;
            changed.push("title");
        }
        if let Some(description) = update.description {
            task.description = description.filter(|d| !d.trim().is_empty());
            changed.push("description");
        }
        if let Some(category) = update.category {
            if task.task_type == TaskType::Subtask {
                return Err(TaskrankError::invalid_task_type(
                    "a subtask's category follows its parent",
                ));
            }
            task.category = normalize_category(category.as_deref())?;
            changed.push("category");
        }
        if let Some(context) = update.context {
            task.context = context.filter(|c| !c.trim().is_empty());
            changed.push("context");
        }
        if let Some(people) = update.related_people {
            task.related_people = normalize_people(people);
            changed.push("related_people");
        }
        if let Some(priority) = update.user_priority {
            task.user_priority = validate_priority(priority)?;
            changed.push("user_priority");
        }
        if let Some(due) = update.due_date {
            task.due_date = due;
            changed.push("due_date");
        }
        if let Some(effort) = update.estimated_effort {
            task.estimated_effort = effort;
            changed.push("estimated_effort");
        }

        let now = self.clock.now();
        let old_score = task.priority_score;
        if rescore {
            task.priority_score = self.score(&task, now)?;
        }
        task.updated_at = now;
        let saved = self.store.update_task(&task)?;
        info!(task_id, fields = %changed.join(","), "task updated");

        record_soft(
            self.store,
            HistoryEvent::new(owner_id, task_id, HistoryKind::Updated, now)
                .values(None, Some(changed.join(","))),
        );
        if saved.priority_score != old_score {
            self.rescore_subtasks(&saved, now)?;
        }
        Ok(saved)
    }

    /// todo → in_progress.
    pub fn start_task(&self, owner_id: &str, task_id: &str) -> Result<Task> {
        let mut task = load_owned_task(self.store, owner_id, task_id)?;
        if task.status != TaskStatus::Todo {
            return Err(TaskrankError::invalid_transition(
                task.status.as_str(),
                TaskStatus::InProgress.as_str(),
            ));
        }
        let now = self.clock.now();
        task.status = TaskStatus::InProgress;
        task.updated_at = now;
        let saved = self.store.update_task(&task)?;
        info!(task_id, "task started");
        record_soft(
            self.store,
            HistoryEvent::new(owner_id, task_id, HistoryKind::StatusChanged, now).values(
                Some(TaskStatus::Todo.as_str().to_string()),
                Some(TaskStatus::InProgress.as_str().to_string()),
            ),
        );
        Ok(saved)
    }

    /// Record that the task was put off again, then rescore it.
    pub fn bump_task(&self, owner_id: &str, task_id: &str) -> Result<Task> {
        let task = load_owned_task(self.store, owner_id, task_id)?;
        if task.is_done() {
            return Err(TaskrankError::invalid_transition("done", "bumped"));
        }
        let mut bumped = self.store.increment_bump_count(task_id)?;
        let now = self.clock.now();
        bumped.priority_score = self.score(&bumped, now)?;
        bumped.updated_at = now;
        let saved = self.store.update_task(&bumped)?;
        info!(task_id, bumps = saved.bump_count, score = saved.priority_score, "task bumped");

        record_soft(
            self.store,
            HistoryEvent::new(owner_id, task_id, HistoryKind::Bumped, now).values(
                Some(task.bump_count.to_string()),
                Some(saved.bump_count.to_string()),
            ),
        );
        if saved.priority_score != task.priority_score {
            self.rescore_subtasks(&saved, now)?;
        }
        Ok(saved)
    }

    /// Delete a task. Tasks that still have subtasks are refused; dependency
    /// edges go with the task.
    pub fn delete_task(&self, owner_id: &str, task_id: &str) -> Result<Task> {
        let task = load_owned_task(self.store, owner_id, task_id)?;
        let subtasks = self.store.list_subtasks(task_id)?;
        if !subtasks.is_empty() {
            return Err(TaskrankError::validation(format!(
                "Task {task_id} has {} subtask(s); delete them first",
                subtasks.len()
            )));
        }
        self.store.delete_task(task_id)?;
        info!(task_id, "task deleted");
        record_soft(
            self.store,
            HistoryEvent::new(owner_id, task_id, HistoryKind::Deleted, self.clock.now())
                .values(Some(task.title.clone()), None),
        );
        Ok(task)
    }

    /// Recompute every open task's score against the current time.
    /// Returns how many scores changed.
    pub fn refresh_scores(&self, owner_id: &str) -> Result<usize> {
        let now = self.clock.now();
        let open = self.store.list_tasks(owner_id, TaskFilter::Open)?;
        let (parents, subtasks): (Vec<Task>, Vec<Task>) = open
            .into_iter()
            .partition(|t| t.task_type == TaskType::Regular);

        let mut changed = 0;
        let mut fresh: HashMap<String, i64> = HashMap::new();
        for mut task in parents {
            let score = self.calculator.calculate_at(&task, now);
            fresh.insert(task.id.clone(), score);
            if score != task.priority_score {
                task.priority_score = score;
                task.updated_at = now;
                self.store.update_task(&task)?;
                changed += 1;
            }
        }
        for mut task in subtasks {
            let parent_score = match task.parent_task_id.as_deref() {
                Some(pid) => match fresh.get(pid) {
                    Some(s) => *s,
                    None => self.store.find_task(pid)?.map_or(0, |p| p.priority_score),
                },
                None => 0,
            };
            let score = self.calculator.calculate_for_subtask_at(&task, parent_score, now);
            if score != task.priority_score {
                task.priority_score = score;
                task.updated_at = now;
                self.store.update_task(&task)?;
                changed += 1;
            }
        }
        info!(owner_id, changed, "scores refreshed");
        Ok(changed)
    }

    /// Open tasks by score, each with its gating counts. `limit` applies
    /// after ranking.
    pub fn ranked(&self, owner_id: &str, limit: Option<usize>) -> Result<Vec<RankedTask>> {
        let open = self.store.list_tasks(owner_id, TaskFilter::Open)?;
        let ids: Vec<String> = open.iter().map(|t| t.id.clone()).collect();
        let blockers = self.store.count_incomplete_blockers_batch(&ids)?;

        let mut open_subtasks: HashMap<&str, i64> = HashMap::new();
        for t in open.iter().filter(|t| t.task_type == TaskType::Subtask) {
            if let Some(pid) = t.parent_task_id.as_deref() {
                *open_subtasks.entry(pid).or_default() += 1;
            }
        }

        let mut ranked: Vec<RankedTask> = open
            .iter()
            .map(|t| {
                let incomplete_blockers = blockers.get(&t.id).copied().unwrap_or(0);
                let subtasks = open_subtasks.get(t.id.as_str()).copied().unwrap_or(0);
                RankedTask {
                    task: t.clone(),
                    incomplete_blockers,
                    open_subtasks: subtasks,
                    actionable: incomplete_blockers == 0 && subtasks == 0,
                }
            })
            .collect();
        if let Some(limit) = limit {
            ranked.truncate(limit);
        }
        debug!(owner_id, count = ranked.len(), "ranked open tasks");
        Ok(ranked)
    }

    /// The highest-scoring tasks that can be completed right now.
    pub fn next_actionable(&self, owner_id: &str, limit: usize) -> Result<Vec<RankedTask>> {
        let mut ranked = self.ranked(owner_id, None)?;
        ranked.retain(|r| r.actionable);
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Refresh stored scores, then rank. Backs `taskrank next`, where scores
    /// written at creation would otherwise ignore age and approaching deadlines.
    pub fn rescore_and_rank(
        &self,
        owner_id: &str,
        limit: usize,
        actionable_only: bool,
    ) -> Result<Vec<RankedTask>> {
        self.refresh_scores(owner_id)?;
        if actionable_only {
            self.next_actionable(owner_id, limit)
        } else {
            self.ranked(owner_id, Some(limit))
        }
    }

    /// Open tasks due inside `[from, to]`, earliest first.
    pub fn due_between(
        &self,
        owner_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Task>> {
        if to < from {
            return Err(TaskrankError::validation("due range ends before it starts"));
        }
        let mut tasks = self.store.list_tasks_due_between(owner_id, from, to)?;
        tasks.retain(|t| t.status.is_open());
        Ok(tasks)
    }

    pub fn at_risk(&self, owner_id: &str) -> Result<Vec<Task>> {
        let now = self.clock.now();
        let mut tasks = self.store.list_tasks(owner_id, TaskFilter::Open)?;
        tasks.retain(|t| is_at_risk(t, now));
        Ok(tasks)
    }

    pub fn task_history(&self, owner_id: &str, task_id: &str) -> Result<Vec<HistoryEvent>> {
        load_owned_task(self.store, owner_id, task_id)?;
        self.store.history_for(task_id)
    }

    fn score(&self, task: &Task, now: DateTime<Utc>) -> Result<i64> {
        match (task.task_type, task.parent_task_id.as_deref()) {
            (TaskType::Subtask, Some(pid)) => {
                let parent_score = self.store.find_task(pid)?.map_or(0, |p| p.priority_score);
                Ok(self.calculator.calculate_for_subtask_at(task, parent_score, now))
            }
            _ => Ok(self.calculator.calculate_at(task, now)),
        }
    }

    fn rescore_subtasks(&self, parent: &Task, now: DateTime<Utc>) -> Result<()> {
        if !parent.can_have_subtasks() {
            return Ok(());
        }
        for mut sub in self.store.list_subtasks(&parent.id)? {
            if sub.is_done() {
                continue;
            }
            let score = self
                .calculator
                .calculate_for_subtask_at(&sub, parent.priority_score, now);
            if score != sub.priority_score {
                sub.priority_score = score;
                self.store.update_task(&sub)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::Config;
    use crate::db::SqliteStore;
    use crate::engine::{CompletionOptions, Engine};
    use crate::error::ErrorCode;
    use crate::models::{DueDateCalculation, Effort, RecurrencePattern};
    use crate::store::{DependencyStore, SeriesStore, TaskStore};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
    }

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.into(),
            ..Default::default()
        }
    }

    fn add(engine: &Engine<'_, SqliteStore>, title: &str) -> Task {
        engine.tasks().create_task("u1", draft(title), None).unwrap().0
    }

    #[test]
    fn create_scores_and_records_history() {
        let store = SqliteStore::in_memory().unwrap();
        let clock = FixedClock(now());
        let engine = Engine::new(&store, &clock, &Config::default());
        let (task, series) = engine
            .tasks()
            .create_task(
                "u1",
                TaskDraft {
                    title: "  file taxes ".into(),
                    user_priority: Some(8),
                    estimated_effort: Some(Effort::Small),
                    ..Default::default()
                },
                None,
            )
            .unwrap();
        assert!(series.is_none());
        assert_eq!(task.title, "file taxes");
        // 80 * 0.4 = 32, small effort boost 1.3.
        assert_eq!(task.priority_score, 42);
        let history = engine.tasks().task_history("u1", &task.id).unwrap();
        assert_eq!(history[0].kind, HistoryKind::Created);
    }

    #[test]
    fn create_rejects_bad_input() {
        let store = SqliteStore::in_memory().unwrap();
        let clock = FixedClock(now());
        let engine = Engine::new(&store, &clock, &Config::default());
        let err = engine.tasks().create_task("u1", draft("   "), None).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        let err = engine
            .tasks()
            .create_task(
                "u1",
                TaskDraft {
                    title: "x".into(),
                    user_priority: Some(11),
                    ..Default::default()
                },
                None,
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn recurring_create_links_series() {
        let store = SqliteStore::in_memory().unwrap();
        let clock = FixedClock(now());
        let engine = Engine::new(&store, &clock, &Config::default())
            .with_default_calculation(DueDateCalculation::FromCompletion);
        let rule = RecurrenceRule {
            pattern: RecurrencePattern::Weekly,
            interval_value: 1,
            end_date: None,
            due_date_calculation: None,
        };
        let (task, series) = engine
            .tasks()
            .create_task("u1", draft("review budget"), Some(&rule))
            .unwrap();
        let series = series.unwrap();
        assert_eq!(task.series_id.as_deref(), Some(series.id.as_str()));
        assert_eq!(series.original_task_id, task.id);
        assert_eq!(series.due_date_calculation, DueDateCalculation::FromCompletion);
        assert!(store.find_series(&series.id).unwrap().is_some());
    }

    #[test]
    fn update_rescores_and_bumps_over_cap() {
        let store = SqliteStore::in_memory().unwrap();
        let clock = FixedClock(now());
        let engine = Engine::new(&store, &clock, &Config::default());
        let task = add(&engine, "call plumber");

        let updated = engine
            .tasks()
            .update_task(
                "u1",
                &task.id,
                TaskUpdate {
                    user_priority: Some(10),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.priority_score, 40);
        assert_eq!(updated.version, task.version + 1);

        let mut last = updated;
        for _ in 0..7 {
            last = engine.tasks().bump_task("u1", &task.id).unwrap();
        }
        assert_eq!(last.bump_count, 7);
        // Bump penalty caps at 50, worth 5 points.
        assert_eq!(last.priority_score, 45);
        assert_eq!(engine.tasks().at_risk("u1").unwrap().len(), 1);
    }

    #[test]
    fn empty_update_is_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        let clock = FixedClock(now());
        let engine = Engine::new(&store, &clock, &Config::default());
        let task = add(&engine, "noop");
        let err = engine
            .tasks()
            .update_task("u1", &task.id, TaskUpdate::default())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn start_only_from_todo() {
        let store = SqliteStore::in_memory().unwrap();
        let clock = FixedClock(now());
        let engine = Engine::new(&store, &clock, &Config::default());
        let task = add(&engine, "draft memo");
        let started = engine.tasks().start_task("u1", &task.id).unwrap();
        assert_eq!(started.status, TaskStatus::InProgress);
        let err = engine.tasks().start_task("u1", &task.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
    }

    #[test]
    fn delete_refuses_parents_and_cascades_edges() {
        let store = SqliteStore::in_memory().unwrap();
        let clock = FixedClock(now());
        let engine = Engine::new(&store, &clock, &Config::default());
        let parent = add(&engine, "move house");
        let blocker = add(&engine, "find flat");
        let sub = engine
            .subtasks()
            .create_subtask("u1", &parent.id, draft("pack"))
            .unwrap();
        engine
            .dependencies()
            .add_dependency("u1", &parent.id, &blocker.id)
            .unwrap();

        let err = engine.tasks().delete_task("u1", &parent.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        engine.tasks().delete_task("u1", &sub.id).unwrap();
        engine.tasks().delete_task("u1", &blocker.id).unwrap();
        assert_eq!(store.count_incomplete_blockers(&parent.id).unwrap(), 0);
        engine.tasks().delete_task("u1", &parent.id).unwrap();
        assert!(store.find_task(&parent.id).unwrap().is_none());
    }

    #[test]
    fn ranking_marks_gated_tasks() {
        let store = SqliteStore::in_memory().unwrap();
        let clock = FixedClock(now());
        let engine = Engine::new(&store, &clock, &Config::default());
        let blocked = add(&engine, "ship release");
        let blocker = add(&engine, "fix tests");
        let parent = add(&engine, "write docs");
        engine
            .dependencies()
            .add_dependency("u1", &blocked.id, &blocker.id)
            .unwrap();
        engine
            .subtasks()
            .create_subtask("u1", &parent.id, draft("api docs"))
            .unwrap();

        let ranked = engine.tasks().ranked("u1", None).unwrap();
        assert_eq!(ranked.len(), 4);
        let by_id: HashMap<&str, &RankedTask> =
            ranked.iter().map(|r| (r.task.id.as_str(), r)).collect();
        assert!(!by_id[blocked.id.as_str()].actionable);
        assert_eq!(by_id[blocked.id.as_str()].incomplete_blockers, 1);
        assert!(!by_id[parent.id.as_str()].actionable);
        assert!(by_id[blocker.id.as_str()].actionable);

        let next = engine.tasks().next_actionable("u1", 10).unwrap();
        assert_eq!(next.len(), 2);
        // The subtask carries a share of its parent's score.
        assert!(next[0].task.task_type == TaskType::Subtask);
    }

    #[test]
    fn refresh_scores_ages_open_tasks() {
        let store = SqliteStore::in_memory().unwrap();
        let clock = FixedClock(now());
        let engine = Engine::new(&store, &clock, &Config::default());
        let task = add(&engine, "old chore");
        assert_eq!(task.priority_score, 20);

        let later = FixedClock(now() + Duration::days(30));
        let engine = Engine::new(&store, &later, &Config::default());
        assert_eq!(engine.tasks().refresh_scores("u1").unwrap(), 1);
        let rescored = store.get_task(&task.id).unwrap();
        assert_eq!(rescored.priority_score, 50);
        assert_eq!(rescored.updated_at, later.0);
        assert_eq!(engine.tasks().refresh_scores("u1").unwrap(), 0);
    }

    #[test]
    fn next_ranks_on_current_scores() {
        let store = SqliteStore::in_memory().unwrap();
        let clock = FixedClock(now());
        let engine = Engine::new(&store, &clock, &Config::default());
        let old = add(&engine, "old chore");

        let later = FixedClock(now() + Duration::days(29));
        let engine = Engine::new(&store, &later, &Config::default());
        let urgent = engine
            .tasks()
            .create_task(
                "u1",
                TaskDraft {
                    title: "fresh but important".into(),
                    user_priority: Some(8),
                    ..Default::default()
                },
                None,
            )
            .unwrap();
        // Stored at creation: 20 for the old chore, 32 for the new task.
        assert_eq!(engine.tasks().ranked("u1", None).unwrap()[0].task.id, urgent.0.id);

        let next = engine.tasks().rescore_and_rank("u1", 10, true).unwrap();
        assert_eq!(next[0].task.id, old.id);
        assert!(next[0].task.priority_score > next[1].task.priority_score);
        assert_eq!(engine.tasks().rescore_and_rank("u1", 1, false).unwrap().len(), 1);
    }

    #[test]
    fn due_between_lists_open_tasks_in_range() {
        let store = SqliteStore::in_memory().unwrap();
        let clock = FixedClock(now());
        let engine = Engine::new(&store, &clock, &Config::default());
        for (title, days) in [("soon", 2), ("later", 20)] {
            engine
                .tasks()
                .create_task(
                    "u1",
                    TaskDraft {
                        title: title.into(),
                        due_date: Some(now() + Duration::days(days)),
                        ..Default::default()
                    },
                    None,
                )
                .unwrap();
        }
        let due = engine
            .tasks()
            .due_between("u1", now(), now() + Duration::days(7))
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].title, "soon");
        assert!(engine
            .tasks()
            .due_between("u1", now(), now() - Duration::days(1))
            .is_err());
    }

    #[test]
    fn completion_is_gated_by_subtasks_then_dependencies() {
        let store = SqliteStore::in_memory().unwrap();
        let clock = FixedClock(now());
        let engine = Engine::new(&store, &clock, &Config::default());
        let lifecycle = engine.lifecycle();
        assert_eq!(lifecycle.gate_names(), vec!["subtasks", "dependencies"]);

        let task = add(&engine, "launch");
        let blocker = add(&engine, "approve");
        let sub = engine
            .subtasks()
            .create_subtask("u1", &task.id, draft("announce"))
            .unwrap();
        engine
            .dependencies()
            .add_dependency("u1", &task.id, &blocker.id)
            .unwrap();

        let opts = CompletionOptions::default();
        let err = lifecycle.complete_task("u1", &task.id, &opts).unwrap_err();
        assert_eq!(err.code, ErrorCode::OpenSubtasks);

        let done_sub = lifecycle.complete_task("u1", &sub.id, &opts).unwrap();
        assert_eq!(
            done_sub.parent_ready.as_ref().map(|t| t.id.as_str()),
            Some(task.id.as_str())
        );

        let err = lifecycle.complete_task("u1", &task.id, &opts).unwrap_err();
        assert_eq!(err.code, ErrorCode::TaskBlocked);
        assert_eq!(store.get_task(&task.id).unwrap().status, TaskStatus::Todo);

        let done_blocker = lifecycle.complete_task("u1", &blocker.id, &opts).unwrap();
        assert_eq!(done_blocker.unblocked.len(), 1);
        assert_eq!(done_blocker.unblocked[0].id, task.id);

        let done = lifecycle.complete_task("u1", &task.id, &opts).unwrap();
        assert_eq!(done.task.status, TaskStatus::Done);
        assert!(done.next_instance.is_none());
    }

    #[test]
    fn completing_a_series_task_generates_the_next() {
        let store = SqliteStore::in_memory().unwrap();
        let clock = FixedClock(now());
        let engine = Engine::new(&store, &clock, &Config::default());
        let rule = RecurrenceRule {
            pattern: RecurrencePattern::Monthly,
            interval_value: 1,
            end_date: None,
            due_date_calculation: None,
        };
        let due = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();
        let (task, _) = engine
            .tasks()
            .create_task(
                "u1",
                TaskDraft {
                    title: "pay rent".into(),
                    due_date: Some(due),
                    ..Default::default()
                },
                Some(&rule),
            )
            .unwrap();

        let out = engine
            .lifecycle()
            .complete_task("u1", &task.id, &CompletionOptions::default())
            .unwrap();
        assert!(!out.is_partial());
        let next = out.next_instance.unwrap();
        assert_eq!(
            next.due_date,
            Some(Utc.with_ymd_and_hms(2025, 2, 28, 12, 0, 0).unwrap())
        );
        assert_eq!(store.list_series_tasks(task.series_id.as_deref().unwrap()).unwrap().len(), 2);
    }
}
