use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    None,
    Daily,
    Weekly,
    Monthly,
}

impl RecurrencePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

/// Which instant the next occurrence's due date is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueDateCalculation {
    FromOriginal,
    FromCompletion,
}

impl DueDateCalculation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FromOriginal => "from_original",
            Self::FromCompletion => "from_completion",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "from_original" => Some(Self::FromOriginal),
            "from_completion" => Some(Self::FromCompletion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSeries {
    pub id: String,
    pub owner_id: String,
    pub original_task_id: String,
    pub pattern: RecurrencePattern,
    pub interval_value: i32,
    pub end_date: Option<DateTime<Utc>>,
    pub due_date_calculation: DueDateCalculation,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Recurrence rule attached when a task is created.
/// `due_date_calculation: None` defers to the user's preferences.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrenceRule {
    pub pattern: RecurrencePattern,
    pub interval_value: i32,
    pub end_date: Option<DateTime<Utc>>,
    pub due_date_calculation: Option<DueDateCalculation>,
}

#[derive(Debug, Clone, Default)]
pub struct SeriesUpdate {
    pub pattern: Option<RecurrencePattern>,
    pub interval_value: Option<i32>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub due_date_calculation: Option<DueDateCalculation>,
    pub is_active: Option<bool>,
}

/// One instance row in a series history listing.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesInstance {
    pub task_id: String,
    pub title: String,
    pub status: String,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesHistory {
    pub series: TaskSeries,
    pub instances: Vec<SeriesInstance>,
}
