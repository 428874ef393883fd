pub mod connection;
pub mod migrations;
pub mod task_repo;
pub mod dependency_repo;
pub mod series_repo;
pub mod preference_repo;
pub mod history_repo;
pub mod sqlite_store;

pub use connection::*;
pub use sqlite_store::SqliteStore;
