//! Mentor Storage crate - SQLite persistence for group conversations.
//!
//! Provides a WAL-mode SQLite database with migrations, an append-only
//! message repository, and per-group interaction counters.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{MessageRepository, MetricsRepository};
