pub mod commands;
pub mod dep;
pub mod init;
pub mod next;
pub mod pref;
pub mod series;
pub mod subtask;
pub mod task;

pub use commands::*;

use std::path::PathBuf;

use serde_json::Value;

use crate::clock::Clock;
use crate::config::Config;
use crate::db::{connection, SqliteStore};
use crate::engine::Engine;
use crate::error::{ErrorCode, TaskrankError};
use crate::output;

/// Resolved global flags, shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Context {
    pub home: PathBuf,
    pub owner: String,
    pub config: Config,
    pub json: bool,
}

impl Context {
    pub fn open_store(&self) -> Result<SqliteStore, TaskrankError> {
        let conn = connection::open_db(&self.home)?;
        Ok(SqliteStore::new(conn))
    }

    pub fn engine<'a>(&self, store: &'a SqliteStore, clock: &'a dyn Clock) -> Engine<'a, SqliteStore> {
        Engine::new(store, clock, &self.config)
    }

    /// Print `data` as a success envelope, or run `text` for humans.
    pub fn respond(&self, data: Value, text: impl FnOnce()) {
        if self.json {
            output::json::emit(&output::json::success(data));
        } else {
            text();
        }
    }
}

/// Expand a full id or unique prefix to a task id. A reference that matches
/// none of the owner's tasks passes through, so the engine can tell a
/// foreign task (forbidden) from a missing one.
pub fn resolve_task_id(
    engine: &Engine<'_, SqliteStore>,
    owner: &str,
    reference: &str,
) -> Result<String, TaskrankError> {
    match engine.tasks().resolve(owner, reference) {
        Ok(task) => Ok(task.id),
        Err(e) if e.code == ErrorCode::TaskNotFound => Ok(reference.to_string()),
        Err(e) => Err(e),
    }
}

/// Turn a command result into an exit code, reporting the error.
pub fn finish(result: Result<i32, TaskrankError>, json_output: bool) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(code = e.code.as_str(), "command failed");
            if json_output {
                output::json::emit(&output::json::error(&e));
            } else {
                eprintln!("Error: {}", e.message);
            }
            1
        }
    }
}
