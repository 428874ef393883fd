use serde::{Deserialize, Serialize};

/// `task_id` cannot be completed until `blocked_by_id` is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDependency {
    pub task_id: String,
    pub blocked_by_id: String,
}
