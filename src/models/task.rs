use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_PRIORITY: i32 = 5;
pub const MIN_USER_PRIORITY: i32 = 1;
pub const MAX_USER_PRIORITY: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "todo" => Some(Self::Todo),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Done)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Regular,
    Subtask,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Subtask => "subtask",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "regular" => Some(Self::Regular),
            "subtask" => Some(Self::Subtask),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Small,
    Medium,
    Large,
    Xlarge,
}

impl Effort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Xlarge => "xlarge",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            "large" => Some(Self::Large),
            "xlarge" => Some(Self::Xlarge),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub context: Option<String>,
    pub related_people: Vec<String>,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub user_priority: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_effort: Option<Effort>,
    pub bump_count: i64,
    pub priority_score: i64,
    pub parent_task_id: Option<String>,
    pub series_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl Task {
    /// Only regular tasks may own subtasks; this caps nesting at one level.
    pub fn can_have_subtasks(&self) -> bool {
        self.task_type == TaskType::Regular
    }

    pub fn is_regular(&self) -> bool {
        self.task_type == TaskType::Regular
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    /// An occurrence produced by completing an earlier task in a series.
    pub fn is_series_generated(&self) -> bool {
        self.series_id.is_some() && self.parent_task_id.is_some()
    }
}

/// User-supplied fields for a new task. Everything else is derived.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub context: Option<String>,
    pub related_people: Vec<String>,
    pub user_priority: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_effort: Option<Effort>,
}

/// Partial update. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub context: Option<Option<String>>,
    pub related_people: Option<Vec<String>>,
    pub user_priority: Option<i32>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub estimated_effort: Option<Option<Effort>>,
}

impl TaskUpdate {
    pub fn touches_scoring(&self) -> bool {
        self.user_priority.is_some() || self.due_date.is_some() || self.estimated_effort.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.context.is_none()
            && self.related_people.is_none()
            && !self.touches_scoring()
    }
}
