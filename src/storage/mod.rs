//! Storage module for persisting harvested school records
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and idempotent schema management
//! - School record upserts keyed on the source page URL
//! - Harvest run tracking with final counters

mod schema;
mod sqlite;
mod traits;

pub use schema::initialize_schema;
pub use sqlite::SqliteStore;
pub use traits::{SchoolStore, StoreError, StoreResult};

use crate::records::SchoolRecord;

/// A school row as stored in the database
#[derive(Debug, Clone)]
pub struct StoredSchool {
    pub id: i64,
    pub record: SchoolRecord,
    pub created_at: String,
    pub updated_at: String,
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub records_written: u64,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    CompletedWithFailures,
    Failed,
}

impl RunStatus {
    /// Converts to the string stored in the database
    pub fn to_db_string(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::CompletedWithFailures => "completed-with-failures",
            RunStatus::Failed => "failed",
        }
    }

    /// Parses the database representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "completed-with-failures" => Some(RunStatus::CompletedWithFailures),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}
