use serde::Serialize;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{Result, TaskrankError};
use crate::models::{HistoryEvent, HistoryKind, Task, TaskDraft, TaskStatus, TaskType};
use crate::scoring::PriorityCalculator;
use crate::store::{record_soft, HistorySink, TaskStore};

use super::lifecycle::{CompletionGate, CompletionOutcome};
use super::{load_owned_task, task_from_draft};

#[derive(Debug, Clone, Serialize)]
pub struct SubtaskCompletion {
    pub subtask: Task,
    pub parent: Option<Task>,
    pub open_subtasks: i64,
    pub all_subtasks_complete: bool,
}

/// One-level subtasks: creation under a regular parent and the parent's
/// completion gate.
pub struct SubtaskGate<'a, S> {
    store: &'a S,
    clock: &'a dyn Clock,
    calculator: PriorityCalculator,
}

impl<'a, S: TaskStore + HistorySink> SubtaskGate<'a, S> {
    pub fn new(store: &'a S, clock: &'a dyn Clock, calculator: PriorityCalculator) -> Self {
        Self {
            store,
            clock,
            calculator,
        }
    }

    pub fn create_subtask(&self, owner_id: &str, parent_id: &str, draft: TaskDraft) -> Result<Task> {
        let parent = load_owned_task(self.store, owner_id, parent_id)?;
        if !parent.can_have_subtasks() {
            return Err(TaskrankError::invalid_task_type(format!(
                "Task {parent_id} is a subtask; subtasks cannot be nested"
            )));
        }
        if parent.is_done() {
            return Err(TaskrankError::validation(format!(
                "Task {parent_id} is already done; reopen it before adding subtasks"
            )));
        }

        let now = self.clock.now();
        let mut subtask = task_from_draft(owner_id, draft, TaskType::Subtask, now)?;
        subtask.category = parent.category.clone();
        subtask.parent_task_id = Some(parent.id.clone());
        subtask.priority_score =
            self.calculator
                .calculate_for_subtask_at(&subtask, parent.priority_score, now);

        self.store.insert_task(&subtask)?;
        info!(task_id = %subtask.id, parent_id, "subtask created");
        record_soft(
            self.store,
            HistoryEvent::new(owner_id, &subtask.id, HistoryKind::Created, now)
                .values(None, Some(subtask.title.clone())),
        );
        Ok(subtask)
    }

    pub fn validate_parent_completion(&self, task: &Task) -> Result<()> {
        if !task.is_regular() {
            return Ok(());
        }
        let open = self.store.count_incomplete_subtasks(&task.id)?;
        if open > 0 {
            debug!(task_id = %task.id, open, "completion blocked by open subtasks");
            return Err(TaskrankError::open_subtasks(&task.id, open));
        }
        Ok(())
    }

    /// Mark a subtask done and report whether its parent is now clear to
    /// complete. The parent itself is never completed here.
    pub fn complete_subtask(&self, owner_id: &str, subtask_id: &str) -> Result<SubtaskCompletion> {
        let subtask = load_owned_task(self.store, owner_id, subtask_id)?;
        if subtask.task_type != TaskType::Subtask {
            return Err(TaskrankError::invalid_task_type(format!(
                "Task {subtask_id} is not a subtask"
            )));
        }
        if subtask.is_done() {
            return Err(TaskrankError::invalid_transition(subtask.status.as_str(), "done"));
        }

        let now = self.clock.now();
        let previous = subtask.status;
        let mut done = subtask;
        done.status = TaskStatus::Done;
        done.completed_at = Some(now);
        done.updated_at = now;
        let done = self.store.update_task(&done)?;
        info!(task_id = subtask_id, "subtask completed");
        record_soft(
            self.store,
            HistoryEvent::new(owner_id, subtask_id, HistoryKind::Completed, now).values(
                Some(previous.as_str().to_string()),
                Some(TaskStatus::Done.as_str().to_string()),
            ),
        );

        let (parent, open_subtasks) = self.parent_status(&done)?;
        Ok(SubtaskCompletion {
            all_subtasks_complete: parent.is_some() && open_subtasks == 0,
            subtask: done,
            parent,
            open_subtasks,
        })
    }

    fn parent_status(&self, subtask: &Task) -> Result<(Option<Task>, i64)> {
        let Some(parent_id) = subtask.parent_task_id.as_deref() else {
            return Ok((None, 0));
        };
        let parent = self.store.find_task(parent_id)?;
        let open = match &parent {
            Some(p) => self.store.count_incomplete_subtasks(&p.id)?,
            None => 0,
        };
        Ok((parent, open))
    }
}

impl<S: TaskStore + HistorySink> CompletionGate for SubtaskGate<'_, S> {
    fn name(&self) -> &'static str {
        "subtasks"
    }

    fn validate_completion(&self, task: &Task) -> Result<()> {
        self.validate_parent_completion(task)
    }

    fn after_completion(&self, task: &Task, outcome: &mut CompletionOutcome) -> Result<()> {
        if task.task_type != TaskType::Subtask {
            return Ok(());
        }
        if let (Some(parent), 0) = self.parent_status(task)? {
            if !parent.is_done() {
                info!(parent_id = %parent.id, "all subtasks complete");
                outcome.parent_ready = Some(parent);
            }
        }
        Ok(())
    }
}
