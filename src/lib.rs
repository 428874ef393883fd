pub mod cli;
pub mod clock;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod graph;
pub mod models;
pub mod output;
pub mod recurrence;
pub mod scoring;
pub mod store;
