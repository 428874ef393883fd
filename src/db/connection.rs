use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::config::{DB_FILE, DEFAULT_HOME};
use crate::error::TaskrankError;

use super::migrations;

/// Resolve the data directory: explicit flag/env value, else `./.taskrank`.
pub fn resolve_home(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(DEFAULT_HOME),
    }
}

/// Get the path to the taskrank database.
pub fn db_path(home: &Path) -> PathBuf {
    home.join(DB_FILE)
}

/// Open a connection to the database. Returns error if not initialized.
pub fn open_db(home: &Path) -> Result<Connection, TaskrankError> {
    let path = db_path(home);
    if !path.exists() {
        return Err(TaskrankError::not_initialized());
    }
    let conn = Connection::open(&path)?;
    configure_connection(&conn)?;
    // Idempotent; picks up tables added since the database was created.
    migrations::run_migrations(&conn)?;
    Ok(conn)
}

/// Initialize the database: create directories, database, and run migrations.
pub fn init_db(home: &Path) -> Result<PathBuf, TaskrankError> {
    fs::create_dir_all(home).map_err(|e| {
        TaskrankError::database(format!("creating {}: {e}", home.display()))
    })?;
    let path = db_path(home);
    let conn = Connection::open(&path)?;
    configure_connection(&conn)?;
    migrations::run_migrations(&conn)?;
    Ok(path)
}

/// Fresh in-memory database with the full schema.
pub fn open_in_memory() -> Result<Connection, TaskrankError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    migrations::run_migrations(&conn)?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> Result<(), TaskrankError> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA busy_timeout=5000;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}
