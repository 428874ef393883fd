use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    Created,
    Updated,
    Bumped,
    StatusChanged,
    Completed,
    Deleted,
    DependencyAdded,
    DependencyRemoved,
    RecurrenceGenerated,
    SeriesStopped,
}

impl HistoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Bumped => "bumped",
            Self::StatusChanged => "status_changed",
            Self::Completed => "completed",
            Self::Deleted => "deleted",
            Self::DependencyAdded => "dependency_added",
            Self::DependencyRemoved => "dependency_removed",
            Self::RecurrenceGenerated => "recurrence_generated",
            Self::SeriesStopped => "series_stopped",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "bumped" => Some(Self::Bumped),
            "status_changed" => Some(Self::StatusChanged),
            "completed" => Some(Self::Completed),
            "deleted" => Some(Self::Deleted),
            "dependency_added" => Some(Self::DependencyAdded),
            "dependency_removed" => Some(Self::DependencyRemoved),
            "recurrence_generated" => Some(Self::RecurrenceGenerated),
            "series_stopped" => Some(Self::SeriesStopped),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub owner_id: String,
    pub task_id: String,
    pub kind: HistoryKind,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HistoryEvent {
    pub fn new(owner_id: &str, task_id: &str, kind: HistoryKind, at: DateTime<Utc>) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            task_id: task_id.to_string(),
            kind,
            old_value: None,
            new_value: None,
            created_at: at,
        }
    }

    pub fn values(mut self, old: Option<String>, new: Option<String>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }
}
