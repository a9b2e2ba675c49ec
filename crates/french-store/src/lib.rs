//! SQLite-backed persistence for Mr. French.
//!
//! Three stores share one database file:
//! - [`TaskRepository`]: CRUD over task records with exact and fuzzy
//!   name lookup.
//! - [`HistoryStore`]: append-only per-channel message log with
//!   chronological and relevance-ranked retrieval, plus the analyzer
//!   audit log.
//! - [`ZoneStore`]: the single-row behavioral zone scalar.

pub mod db;
pub mod history;
pub mod matching;
pub mod migrations;
pub mod tasks;
pub mod zone;

pub use db::Database;
pub use history::{AuditEntry, HistoryStore};
pub use matching::similarity;
pub use tasks::{NewTask, TaskChanges, TaskRepository};
pub use zone::ZoneStore;
