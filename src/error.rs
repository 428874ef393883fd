use thiserror::Error;

/// Coarse error taxonomy shared by every code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    Conflict,
    StateGated,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::Conflict => "conflict",
            Self::StateGated => "state_gated",
            Self::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotInitialized,
    TaskNotFound,
    SeriesNotFound,
    DependencyNotFound,
    AmbiguousRef,
    Forbidden,
    DuplicateDependency,
    CycleDetected,
    VersionConflict,
    InvalidStatusTransition,
    OpenSubtasks,
    TaskBlocked,
    InvalidTaskType,
    ValidationError,
    ConfigError,
    DatabaseError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::TaskNotFound => "TASK_NOT_FOUND",
            Self::SeriesNotFound => "SERIES_NOT_FOUND",
            Self::DependencyNotFound => "DEPENDENCY_NOT_FOUND",
            Self::AmbiguousRef => "AMBIGUOUS_REF",
            Self::Forbidden => "FORBIDDEN",
            Self::DuplicateDependency => "DUPLICATE_DEPENDENCY",
            Self::CycleDetected => "CYCLE_DETECTED",
            Self::VersionConflict => "VERSION_CONFLICT",
            Self::InvalidStatusTransition => "INVALID_STATUS_TRANSITION",
            Self::OpenSubtasks => "OPEN_SUBTASKS",
            Self::TaskBlocked => "TASK_BLOCKED",
            Self::InvalidTaskType => "INVALID_TASK_TYPE",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::DatabaseError => "DATABASE_ERROR",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationError | Self::InvalidTaskType | Self::AmbiguousRef => {
                ErrorKind::Validation
            }
            Self::NotInitialized
            | Self::TaskNotFound
            | Self::SeriesNotFound
            | Self::DependencyNotFound => ErrorKind::NotFound,
            Self::Forbidden => ErrorKind::Forbidden,
            Self::DuplicateDependency
            | Self::CycleDetected
            | Self::VersionConflict
            | Self::InvalidStatusTransition => ErrorKind::Conflict,
            Self::OpenSubtasks | Self::TaskBlocked => ErrorKind::StateGated,
            Self::ConfigError | Self::DatabaseError => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct TaskrankError {
    pub code: ErrorCode,
    pub message: String,
}

pub type Result<T> = std::result::Result<T, TaskrankError>;

impl TaskrankError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    pub fn not_initialized() -> Self {
        Self::new(
            ErrorCode::NotInitialized,
            "taskrank is not initialized. Run `taskrank init` first.",
        )
    }

    pub fn task_not_found(reference: &str) -> Self {
        Self::new(ErrorCode::TaskNotFound, format!("Task not found: {reference}"))
    }

    pub fn series_not_found(reference: &str) -> Self {
        Self::new(
            ErrorCode::SeriesNotFound,
            format!("Series not found: {reference}"),
        )
    }

    pub fn dependency_not_found(task_id: &str, blocked_by_id: &str) -> Self {
        Self::new(
            ErrorCode::DependencyNotFound,
            format!("Task {task_id} is not blocked by {blocked_by_id}"),
        )
    }

    pub fn ambiguous_ref(reference: &str, candidates: &[String]) -> Self {
        Self::new(
            ErrorCode::AmbiguousRef,
            format!(
                "Ambiguous reference '{}'. Candidates: {}",
                reference,
                candidates.join(", ")
            ),
        )
    }

    pub fn forbidden(resource: &str) -> Self {
        Self::new(
            ErrorCode::Forbidden,
            format!("{resource} belongs to another user"),
        )
    }

    pub fn duplicate_dependency(task_id: &str, blocked_by_id: &str) -> Self {
        Self::new(
            ErrorCode::DuplicateDependency,
            format!("Task {task_id} is already blocked by {blocked_by_id}"),
        )
    }

    pub fn cycle_detected() -> Self {
        Self::new(ErrorCode::CycleDetected, "Dependency cycle detected")
    }

    pub fn self_dependency() -> Self {
        Self::new(ErrorCode::CycleDetected, "A task cannot be blocked by itself")
    }

    pub fn version_conflict(task_id: &str) -> Self {
        Self::new(
            ErrorCode::VersionConflict,
            format!("Task {task_id} was modified concurrently; reload and retry"),
        )
    }

    pub fn invalid_transition(from: &str, to: &str) -> Self {
        Self::new(
            ErrorCode::InvalidStatusTransition,
            format!("Invalid status transition: {from} → {to}"),
        )
    }

    pub fn open_subtasks(task_id: &str, open: i64) -> Self {
        Self::new(
            ErrorCode::OpenSubtasks,
            format!("Cannot complete task {task_id}: {open} subtask(s) still open"),
        )
    }

    pub fn task_blocked(task_id: &str, blockers: i64) -> Self {
        Self::new(
            ErrorCode::TaskBlocked,
            format!("Cannot complete task {task_id}: blocked by {blockers} unfinished task(s)"),
        )
    }

    pub fn invalid_task_type(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTaskType, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }
}

impl From<rusqlite::Error> for TaskrankError {
    fn from(e: rusqlite::Error) -> Self {
        Self::database(e.to_string())
    }
}

/// Attach a short description of the failed operation to internal errors.
pub trait ResultExt<T> {
    fn context(self, what: &str) -> Result<T>;
}

impl<T> ResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn context(self, what: &str) -> Result<T> {
        self.map_err(|e| TaskrankError::database(format!("{what}: {e}")))
    }
}
