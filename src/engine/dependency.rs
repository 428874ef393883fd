use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{Result, TaskrankError};
use crate::graph::DependencyGraph;
use crate::models::{HistoryEvent, HistoryKind, Task, TaskDependency};
use crate::store::{record_soft, DependencyStore, HistorySink, TaskStore};

use super::lifecycle::{CompletionGate, CompletionOutcome};
use super::load_owned_task;

/// Dependency workflow: edge legality, completion gating and unblock notices.
pub struct DependencyEngine<'a, S> {
    store: &'a S,
    clock: &'a dyn Clock,
}

impl<'a, S: TaskStore + DependencyStore + HistorySink> DependencyEngine<'a, S> {
    pub fn new(store: &'a S, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Record that `task_id` is blocked by `blocked_by_id`.
    pub fn add_dependency(
        &self,
        owner_id: &str,
        task_id: &str,
        blocked_by_id: &str,
    ) -> Result<TaskDependency> {
        if task_id == blocked_by_id {
            return Err(TaskrankError::self_dependency());
        }
        let task = load_owned_task(self.store, owner_id, task_id)?;
        let blocker = load_owned_task(self.store, owner_id, blocked_by_id)?;
        for t in [&task, &blocker] {
            if !t.is_regular() {
                return Err(TaskrankError::invalid_task_type(format!(
                    "Only regular tasks can take part in dependencies; {} is a {}",
                    t.id,
                    t.task_type.as_str()
                )));
            }
            if t.is_series_generated() {
                return Err(TaskrankError::invalid_task_type(format!(
                    "{} is a generated occurrence of a recurring series and cannot take part in dependencies",
                    t.id
                )));
            }
        }
        if self.store.dependency_exists(task_id, blocked_by_id)? {
            return Err(TaskrankError::duplicate_dependency(task_id, blocked_by_id));
        }

        let edge = TaskDependency {
            task_id: task_id.to_string(),
            blocked_by_id: blocked_by_id.to_string(),
        };
        self.store.insert_dependency_guarded(owner_id, &edge, &|edges: &[TaskDependency]| {
            if edges.contains(&edge) {
                return Err(TaskrankError::duplicate_dependency(task_id, blocked_by_id));
            }
            let mut graph = DependencyGraph::from_edges(edges);
            if graph.would_create_cycle(task_id, blocked_by_id) {
                return Err(TaskrankError::cycle_detected());
            }
            Ok(())
        })?;
        info!(task_id, blocked_by_id, "dependency added");

        record_soft(
            self.store,
            HistoryEvent::new(owner_id, task_id, HistoryKind::DependencyAdded, self.clock.now())
                .values(None, Some(blocked_by_id.to_string())),
        );
        Ok(edge)
    }

    pub fn remove_dependency(&self, owner_id: &str, task_id: &str, blocked_by_id: &str) -> Result<()> {
        load_owned_task(self.store, owner_id, task_id)?;
        if !self.store.remove_dependency(task_id, blocked_by_id)? {
            return Err(TaskrankError::dependency_not_found(task_id, blocked_by_id));
        }
        info!(task_id, blocked_by_id, "dependency removed");
        record_soft(
            self.store,
            HistoryEvent::new(owner_id, task_id, HistoryKind::DependencyRemoved, self.clock.now())
                .values(Some(blocked_by_id.to_string()), None),
        );
        Ok(())
    }

    /// Direct blockers of a task.
    pub fn blockers(&self, owner_id: &str, task_id: &str) -> Result<Vec<Task>> {
        load_owned_task(self.store, owner_id, task_id)?;
        self.store
            .blockers_of(task_id)?
            .iter()
            .map(|id| self.store.get_task(id))
            .collect()
    }

    /// Everything a task transitively depends on.
    pub fn all_dependencies(&self, owner_id: &str, task_id: &str) -> Result<Vec<Task>> {
        load_owned_task(self.store, owner_id, task_id)?;
        let graph = DependencyGraph::from_edges(&self.store.list_dependencies(owner_id)?);
        let mut ids: Vec<String> = graph.all_reachable(task_id).into_iter().collect();
        ids.sort();
        ids.iter().map(|id| self.store.get_task(id)).collect()
    }

    /// True when the owner's stored graph contains a cycle.
    pub fn check_graph(&self, owner_id: &str) -> Result<bool> {
        let graph = DependencyGraph::from_edges(&self.store.list_dependencies(owner_id)?);
        Ok(graph.has_cycle())
    }

    pub fn validate_completion(&self, task: &Task) -> Result<()> {
        if !task.is_regular() {
            return Ok(());
        }
        let open = self.store.count_incomplete_blockers(&task.id)?;
        if open > 0 {
            debug!(task_id = %task.id, open, "completion blocked by dependencies");
            return Err(TaskrankError::task_blocked(&task.id, open));
        }
        Ok(())
    }

    /// Tasks that `completed_blocker_id` was blocking and that now have no
    /// incomplete blockers left.
    pub fn blocker_completion_info(&self, completed_blocker_id: &str) -> Result<Vec<Task>> {
        let dependents = self.store.dependents_of(completed_blocker_id)?;
        if dependents.is_empty() {
            return Ok(Vec::new());
        }
        let remaining = self.store.count_incomplete_blockers_batch(&dependents)?;
        let mut unblocked = Vec::new();
        for id in &dependents {
            if remaining.get(id).copied().unwrap_or(0) == 0 {
                let task = self.store.get_task(id)?;
                if !task.is_done() {
                    unblocked.push(task);
                }
            }
        }
        Ok(unblocked)
    }
}

impl<S: TaskStore + DependencyStore + HistorySink> CompletionGate for DependencyEngine<'_, S> {
    fn name(&self) -> &'static str {
        "dependencies"
    }

    fn validate_completion(&self, task: &Task) -> Result<()> {
        DependencyEngine::validate_completion(self, task)
    }

    fn after_completion(&self, task: &Task, outcome: &mut CompletionOutcome) -> Result<()> {
        if task.is_regular() {
            outcome.unblocked = self.blocker_completion_info(&task.id)?;
            if !outcome.unblocked.is_empty() {
                info!(task_id = %task.id, count = outcome.unblocked.len(), "tasks unblocked");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::SqliteStore;
    use crate::error::ErrorCode;
    use crate::models::{TaskStatus, TaskType};
    use chrono::{TimeZone, Utc};

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap())
    }

    fn seed(store: &SqliteStore, id: &str, owner: &str, kind: TaskType) {
        let now = clock().0;
        store
            .insert_task(&Task {
                id: id.into(),
                owner_id: owner.into(),
                title: id.into(),
                description: None,
                category: None,
                context: None,
                related_people: vec![],
                task_type: kind,
                status: TaskStatus::Todo,
                user_priority: 5,
                due_date: None,
                estimated_effort: None,
                bump_count: 0,
                priority_score: 20,
                parent_task_id: None,
                series_id: None,
                created_at: now,
                updated_at: now,
                completed_at: None,
                version: 1,
            })
            .unwrap();
    }

    fn finish(store: &SqliteStore, id: &str) {
        let mut t = store.get_task(id).unwrap();
        t.status = TaskStatus::Done;
        store.update_task(&t).unwrap();
    }

    #[test]
    fn rejects_self_duplicate_and_cycle() {
        let store = SqliteStore::in_memory().unwrap();
        let clock = clock();
        for id in ["a", "b", "c"] {
            seed(&store, id, "u1", TaskType::Regular);
        }
        let deps = DependencyEngine::new(&store, &clock);

        assert_eq!(deps.add_dependency("u1", "a", "a").unwrap_err().code, ErrorCode::CycleDetected);
        deps.add_dependency("u1", "a", "b").unwrap();
        assert_eq!(
            deps.add_dependency("u1", "a", "b").unwrap_err().code,
            ErrorCode::DuplicateDependency
        );
        deps.add_dependency("u1", "b", "c").unwrap();
        assert_eq!(deps.add_dependency("u1", "c", "a").unwrap_err().code, ErrorCode::CycleDetected);
        assert!(!deps.check_graph("u1").unwrap());
    }

    #[test]
    fn subtasks_cannot_join_dependencies() {
        let store = SqliteStore::in_memory().unwrap();
        let clock = clock();
        seed(&store, "a", "u1", TaskType::Regular);
        seed(&store, "s", "u1", TaskType::Subtask);
        let deps = DependencyEngine::new(&store, &clock);
        assert_eq!(
            deps.add_dependency("u1", "a", "s").unwrap_err().code,
            ErrorCode::InvalidTaskType
        );
        assert_eq!(
            deps.add_dependency("u1", "s", "a").unwrap_err().code,
            ErrorCode::InvalidTaskType
        );
    }

    #[test]
    fn generated_occurrences_cannot_join_dependencies() {
        let store = SqliteStore::in_memory().unwrap();
        let clock = clock();
        seed(&store, "a", "u1", TaskType::Regular);
        seed(&store, "first", "u1", TaskType::Regular);
        seed(&store, "next", "u1", TaskType::Regular);
        let mut occurrence = store.get_task("next").unwrap();
        occurrence.series_id = Some("series-1".into());
        occurrence.parent_task_id = Some("first".into());
        store.update_task(&occurrence).unwrap();

        let deps = DependencyEngine::new(&store, &clock);
        assert_eq!(
            deps.add_dependency("u1", "a", "next").unwrap_err().code,
            ErrorCode::InvalidTaskType
        );
        assert_eq!(
            deps.add_dependency("u1", "next", "a").unwrap_err().code,
            ErrorCode::InvalidTaskType
        );
        assert!(store.blockers_of("a").unwrap().is_empty());
        deps.add_dependency("u1", "a", "first").unwrap();
    }

    #[test]
    fn cross_owner_edges_are_forbidden() {
        let store = SqliteStore::in_memory().unwrap();
        let clock = clock();
        seed(&store, "a", "u1", TaskType::Regular);
        seed(&store, "b", "u2", TaskType::Regular);
        let deps = DependencyEngine::new(&store, &clock);
        assert_eq!(deps.add_dependency("u1", "a", "b").unwrap_err().code, ErrorCode::Forbidden);
    }

    #[test]
    fn completion_gate_flips_after_last_blocker() {
        let store = SqliteStore::in_memory().unwrap();
        let clock = clock();
        for id in ["a", "b", "c"] {
            seed(&store, id, "u1", TaskType::Regular);
        }
        let deps = DependencyEngine::new(&store, &clock);
        deps.add_dependency("u1", "a", "b").unwrap();
        deps.add_dependency("u1", "a", "c").unwrap();

        let a = store.get_task("a").unwrap();
        assert_eq!(deps.validate_completion(&a).unwrap_err().code, ErrorCode::TaskBlocked);

        finish(&store, "b");
        assert!(deps.blocker_completion_info("b").unwrap().is_empty());
        assert!(deps.validate_completion(&a).is_err());

        finish(&store, "c");
        let unblocked = deps.blocker_completion_info("c").unwrap();
        assert_eq!(unblocked.len(), 1);
        assert_eq!(unblocked[0].id, "a");
        assert!(deps.validate_completion(&a).is_ok());
    }

    #[test]
    fn transitive_dependencies_and_removal() {
        let store = SqliteStore::in_memory().unwrap();
        let clock = clock();
        for id in ["a", "b", "c", "d"] {
            seed(&store, id, "u1", TaskType::Regular);
        }
        let deps = DependencyEngine::new(&store, &clock);
        deps.add_dependency("u1", "a", "b").unwrap();
        deps.add_dependency("u1", "b", "c").unwrap();
        deps.add_dependency("u1", "b", "d").unwrap();

        let all: Vec<String> = deps.all_dependencies("u1", "a").unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(all, vec!["b", "c", "d"]);
        assert_eq!(deps.blockers("u1", "a").unwrap().len(), 1);

        deps.remove_dependency("u1", "b", "d").unwrap();
        assert_eq!(
            deps.remove_dependency("u1", "b", "d").unwrap_err().code,
            ErrorCode::DependencyNotFound
        );
        assert_eq!(deps.all_dependencies("u1", "a").unwrap().len(), 2);
    }
}
