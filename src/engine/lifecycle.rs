use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{Result, TaskrankError};
use crate::models::{DueDateCalculation, HistoryEvent, HistoryKind, Task, TaskStatus};
use crate::store::{record_soft, HistorySink, TaskStore};

/// Where an explicit due-date-calculation override should be remembered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceScope {
    Global,
    Category,
}

/// Per-request knobs for completing a task.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub stop_recurrence: bool,
    pub skip_next: bool,
    pub due_date_calculation: Option<DueDateCalculation>,
    pub save_preference: Option<PreferenceScope>,
}

impl CompletionOptions {
    /// Reject option combinations that could only fail after completion.
    pub fn validate(&self, task: &Task) -> Result<()> {
        if self.stop_recurrence && self.skip_next {
            return Err(TaskrankError::validation(
                "stop-recurrence and skip-next cannot be combined",
            ));
        }
        match self.save_preference {
            Some(_) if self.due_date_calculation.is_none() => Err(TaskrankError::validation(
                "saving a preference requires an explicit due date calculation",
            )),
            Some(PreferenceScope::Category) if task.category.is_none() => {
                Err(TaskrankError::validation(
                    "cannot save a category preference for a task without a category",
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Result of a completion. `regeneration_error` marks a partial success.
#[derive(Debug)]
pub struct CompletionOutcome {
    pub task: Task,
    pub unblocked: Vec<Task>,
    pub parent_ready: Option<Task>,
    pub next_instance: Option<Task>,
    pub regeneration_error: Option<TaskrankError>,
}

impl CompletionOutcome {
    fn new(task: Task) -> Self {
        Self {
            task,
            unblocked: Vec::new(),
            parent_ready: None,
            next_instance: None,
            regeneration_error: None,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.regeneration_error.is_some()
    }
}

/// A precondition on completion, plus an optional follow-up once it succeeded.
pub trait CompletionGate {
    fn name(&self) -> &'static str;

    fn validate_completion(&self, task: &Task) -> Result<()>;

    /// Runs after the completion is committed. Errors are logged, not returned.
    fn after_completion(&self, _task: &Task, _outcome: &mut CompletionOutcome) -> Result<()> {
        Ok(())
    }
}

/// Produces the follow-up instance of a completed task, if any.
pub trait SuccessorPolicy {
    fn next_instance(&self, completed: &Task, options: &CompletionOptions) -> Result<Option<Task>>;
}

/// Default policy: nothing follows a completed task.
pub struct NoSuccessor;

impl SuccessorPolicy for NoSuccessor {
    fn next_instance(&self, _completed: &Task, _options: &CompletionOptions) -> Result<Option<Task>> {
        Ok(None)
    }
}

/// The completion funnel.
pub struct Lifecycle<'a, S> {
    store: &'a S,
    clock: &'a dyn Clock,
    gates: Vec<Box<dyn CompletionGate + 'a>>,
    successor: Box<dyn SuccessorPolicy + 'a>,
}

impl<'a, S: TaskStore + HistorySink> Lifecycle<'a, S> {
    pub fn new(store: &'a S, clock: &'a dyn Clock) -> Self {
        Self {
            store,
            clock,
            gates: Vec::new(),
            successor: Box::new(NoSuccessor),
        }
    }

    /// Gates run in registration order; the first failure wins.
    pub fn with_gate(mut self, gate: Box<dyn CompletionGate + 'a>) -> Self {
        self.gates.push(gate);
        self
    }

    pub fn with_successor(mut self, successor: Box<dyn SuccessorPolicy + 'a>) -> Self {
        self.successor = successor;
        self
    }

    pub fn gate_names(&self) -> Vec<&'static str> {
        self.gates.iter().map(|g| g.name()).collect()
    }

    pub fn complete_task(
        &self,
        owner_id: &str,
        task_id: &str,
        options: &CompletionOptions,
    ) -> Result<CompletionOutcome> {
        let task = super::load_owned_task(self.store, owner_id, task_id)?;
        if task.is_done() {
            return Err(TaskrankError::invalid_transition(task.status.as_str(), "done"));
        }
        options.validate(&task)?;

        for gate in &self.gates {
            debug!(task_id, gate = gate.name(), "checking completion gate");
            gate.validate_completion(&task)?;
        }

        let now = self.clock.now();
        let previous_status = task.status;
        let mut done = task;
        done.status = TaskStatus::Done;
        done.completed_at = Some(now);
        done.updated_at = now;
        let done = self.store.update_task(&done)?;
        info!(task_id, "task completed");

        record_soft(
            self.store,
            HistoryEvent::new(owner_id, task_id, HistoryKind::Completed, now).values(
                Some(previous_status.as_str().to_string()),
                Some(TaskStatus::Done.as_str().to_string()),
            ),
        );

        let mut outcome = CompletionOutcome::new(done);
        let completed = outcome.task.clone();
        for gate in &self.gates {
            if let Err(e) = gate.after_completion(&completed, &mut outcome) {
                warn!(task_id, gate = gate.name(), error = %e, "post-completion hook failed");
            }
        }

        if completed.series_id.is_some() {
            match self.successor.next_instance(&completed, options) {
                Ok(next) => outcome.next_instance = next,
                Err(e) => {
                    warn!(task_id, error = %e, "completed, but the next occurrence was not created");
                    outcome.regeneration_error = Some(e);
                }
            }
        }

        Ok(outcome)
    }
}
