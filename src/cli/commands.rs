use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};

use crate::models::{DueDateCalculation, Effort, RecurrencePattern, TaskStatus};

#[derive(Parser)]
#[command(
    name = "taskrank",
    version,
    about = "Personal task engine: priority scoring, dependencies, subtasks and recurring tasks",
    after_help = "\
NOTE:
  Data lives in --home (or $TASKRANK_HOME), default ./.taskrank.
  Run `taskrank init` before any other command.
  Task ids may be shortened to any unique prefix.

EXIT CODES:
  0  Success
  1  Error (validation, not found, conflict, blocked, etc.)
  3  Partial success: the task was completed but its next occurrence was not created

DATES:
  RFC 3339 (2025-01-10T17:00:00Z) or a plain date (2025-01-10), read as the end of that day in UTC.

COMPLETION RULES:
  A task with open subtasks cannot be completed.
  A task blocked by unfinished tasks cannot be completed.
  Completing a recurring task creates its next occurrence unless --skip-next or --stop-recurrence is given."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Data directory
    #[arg(long, global = true, env = "TASKRANK_HOME")]
    pub home: Option<PathBuf>,

    /// Act as this user instead of the configured owner
    #[arg(long, global = true, env = "TASKRANK_USER")]
    pub user: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory, database and default config
    Init,

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Subtasks of a regular task
    #[command(subcommand)]
    Subtask(SubtaskCommands),

    /// Dependencies between tasks
    #[command(subcommand)]
    Dep(DepCommands),

    /// Recurring series
    #[command(subcommand)]
    Series(SeriesCommands),

    /// Due date calculation preferences for recurring tasks
    #[command(subcommand)]
    Pref(PrefCommands),

    /// Highest-scoring tasks that can be completed now
    #[command(after_help = "\
NOTE:
  Tasks with unfinished blockers or open subtasks are left out unless --all is given.
  Scores are as of the last mutation; run `taskrank rescore` to age them.")]
    Next {
        /// How many tasks to show
        #[arg(long, short = 'n', default_value = "5")]
        limit: usize,

        /// Include blocked tasks and parents with open subtasks
        #[arg(long)]
        all: bool,
    },

    /// Open tasks bumped 3+ times or overdue by 3+ days
    AtRisk,

    /// Recompute every open task's score against the current time
    Rescore,
}

#[derive(Args, Clone, Default)]
pub struct TaskFields {
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub context: Option<String>,
    /// Related person (repeatable)
    #[arg(long = "person")]
    pub people: Vec<String>,
    /// 1 (lowest) to 10 (highest), default 5
    #[arg(long, short = 'p')]
    pub priority: Option<i32>,
    #[arg(long, value_parser = parse_datetime)]
    pub due: Option<DateTime<Utc>>,
    /// small | medium | large | xlarge
    #[arg(long, value_parser = parse_effort)]
    pub effort: Option<Effort>,
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task
    Add {
        /// Task title
        title: String,
        #[arg(long)]
        category: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
        /// Make the task recur: daily | weekly | monthly
        #[arg(long, value_parser = parse_pattern)]
        repeat: Option<RecurrencePattern>,
        /// Recur every N days/weeks/months (default 1)
        #[arg(long, requires = "repeat")]
        every: Option<i32>,
        /// Last date an occurrence may be due
        #[arg(long, value_parser = parse_datetime, requires = "repeat")]
        until: Option<DateTime<Utc>>,
        /// from_original | from_completion (default: your preferences)
        #[arg(long, value_parser = parse_calculation, requires = "repeat")]
        calc: Option<DueDateCalculation>,
    },
    /// List tasks (open ones by default)
    List {
        /// Include done tasks
        #[arg(long, conflicts_with = "status")]
        all: bool,
        /// todo | in_progress | done
        #[arg(long, value_parser = parse_status)]
        status: Option<TaskStatus>,
        /// Only open tasks due within this many days
        #[arg(long, conflicts_with_all = ["all", "status"])]
        due_within: Option<i64>,
    },
    /// Show a task with its score breakdown, subtasks and dependencies
    Show { id: String },
    /// Change a task's fields
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_category")]
        category: Option<String>,
        #[arg(long)]
        clear_category: bool,
        #[command(flatten)]
        fields: TaskFields,
        #[arg(long, conflicts_with = "description")]
        clear_description: bool,
        #[arg(long, conflicts_with = "context")]
        clear_context: bool,
        #[arg(long, conflicts_with = "people")]
        clear_people: bool,
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
        #[arg(long, conflicts_with = "effort")]
        clear_effort: bool,
    },
    /// Start a task (todo → in_progress)
    Start { id: String },
    /// Put a task off again; repeated bumps raise its score and flag it at risk
    Bump { id: String },
    /// Complete a task
    Done {
        id: String,
        #[command(flatten)]
        recurrence: CompletionArgs,
    },
    /// Delete a task (refused while it has subtasks)
    Delete { id: String },
    /// Audit trail of a task
    History { id: String },
}

#[derive(Args, Clone, Default)]
pub struct CompletionArgs {
    /// End the task's series; no further occurrences
    #[arg(long, conflicts_with = "skip_next")]
    pub stop_recurrence: bool,
    /// Do not create the next occurrence this time
    #[arg(long)]
    pub skip_next: bool,
    /// Override how the next due date is computed: from_original | from_completion
    #[arg(long, value_parser = parse_calculation)]
    pub calc: Option<DueDateCalculation>,
    /// Remember --calc as your default
    #[arg(long, requires = "calc", conflicts_with = "save_category")]
    pub save_default: bool,
    /// Remember --calc for this task's category
    #[arg(long, requires = "calc")]
    pub save_category: bool,
}

#[derive(Subcommand)]
pub enum SubtaskCommands {
    /// Add a subtask under a regular task; it takes the parent's category
    Add {
        /// Parent task id
        parent: String,
        title: String,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Complete a subtask and report whether its parent is ready
    Done { id: String },
}

#[derive(Subcommand)]
pub enum DepCommands {
    /// Mark TASK as blocked by BLOCKER
    Add { task: String, blocker: String },
    /// Remove a blocked-by edge
    Remove { task: String, blocker: String },
    /// Tasks blocking TASK
    List {
        task: String,
        /// Everything TASK depends on, transitively
        #[arg(long)]
        all: bool,
    },
    /// Verify the dependency graph has no cycles
    Check,
}

#[derive(Subcommand)]
pub enum SeriesCommands {
    /// List series (active ones by default)
    List {
        /// Include stopped series
        #[arg(long)]
        all: bool,
    },
    /// A series and every occurrence created so far
    Show { id: String },
    /// Change a series' schedule
    Update {
        id: String,
        /// daily | weekly | monthly
        #[arg(long, value_parser = parse_pattern)]
        pattern: Option<RecurrencePattern>,
        #[arg(long)]
        every: Option<i32>,
        #[arg(long, value_parser = parse_datetime, conflicts_with = "clear_until")]
        until: Option<DateTime<Utc>>,
        #[arg(long)]
        clear_until: bool,
        /// from_original | from_completion
        #[arg(long, value_parser = parse_calculation)]
        calc: Option<DueDateCalculation>,
        /// Reactivate a stopped series
        #[arg(long)]
        activate: bool,
    },
    /// Stop a series
    Stop { id: String },
}

#[derive(Subcommand)]
pub enum PrefCommands {
    /// Show your default and per-category settings
    Show,
    /// Set your default calculation: from_original | from_completion
    SetDefault {
        #[arg(value_parser = parse_calculation)]
        calc: DueDateCalculation,
    },
    /// Override the calculation for one category
    SetCategory {
        category: String,
        #[arg(value_parser = parse_calculation)]
        calc: DueDateCalculation,
    },
    /// Remove a category override
    UnsetCategory { category: String },
}

/// RFC 3339, or `YYYY-MM-DD` meaning the last second of that day in UTC.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid date '{s}': expected YYYY-MM-DD or RFC 3339"))
}

fn parse_effort(s: &str) -> Result<Effort, String> {
    Effort::from_str(&s.to_lowercase())
        .ok_or_else(|| format!("invalid effort '{s}': expected small, medium, large or xlarge"))
}

fn parse_pattern(s: &str) -> Result<RecurrencePattern, String> {
    match RecurrencePattern::from_str(&s.to_lowercase()) {
        Some(RecurrencePattern::None) | None => Err(format!(
            "invalid pattern '{s}': expected daily, weekly or monthly"
        )),
        Some(p) => Ok(p),
    }
}

fn parse_calculation(s: &str) -> Result<DueDateCalculation, String> {
    DueDateCalculation::from_str(&s.to_lowercase().replace('-', "_")).ok_or_else(|| {
        format!("invalid calculation '{s}': expected from_original or from_completion")
    })
}

fn parse_status(s: &str) -> Result<TaskStatus, String> {
    TaskStatus::from_str(&s.to_lowercase().replace('-', "_"))
        .ok_or_else(|| format!("invalid status '{s}': expected todo, in_progress or done"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn plain_dates_mean_end_of_day() {
        assert_eq!(
            parse_datetime("2025-01-10").unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 10, 23, 59, 59).unwrap()
        );
        assert_eq!(
            parse_datetime("2025-01-10T17:00:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 10, 15, 0, 0).unwrap()
        );
        assert!(parse_datetime("tomorrow").is_err());
    }

    #[test]
    fn enum_flags_accept_dashes_and_case() {
        assert_eq!(parse_calculation("From-Completion").unwrap(), DueDateCalculation::FromCompletion);
        assert_eq!(parse_status("in-progress").unwrap(), TaskStatus::InProgress);
        assert!(parse_pattern("none").is_err());
        assert_eq!(parse_effort("XLARGE").unwrap(), Effort::Xlarge);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
