//! Storage traits and error types
//!
//! This module defines the trait interface the pipeline writes through and
//! the associated error types. The pipeline never issues SQL itself.

use crate::records::SchoolRecord;
use crate::report::RunSummary;
use crate::storage::{RunRecord, RunStatus, StoredSchool};
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for the persistent store the harvester writes into
///
/// Both `ensure_schema` and `upsert_school` are idempotent: re-running a
/// whole harvest produces the same stored state as running it once, modulo
/// timestamp columns.
pub trait SchoolStore {
    // ===== Schema =====

    /// Creates the schema if absent; invoked once before any writes
    fn ensure_schema(&mut self) -> StoreResult<()>;

    // ===== School Records =====

    /// Inserts or updates a school keyed on its source page URL
    ///
    /// An existing row keeps its `created_at` and has its business fields
    /// replaced and `updated_at` bumped; a new row gets
    /// `created_at = updated_at = now`.
    ///
    /// # Returns
    ///
    /// The row ID of the inserted or updated school
    fn upsert_school(&mut self, record: &SchoolRecord) -> StoreResult<i64>;

    /// Looks up a school by its source page URL
    fn get_school_by_source_url(&self, url: &str) -> StoreResult<Option<StoredSchool>>;

    /// Lists all stored schools ordered by name
    fn list_schools(&self) -> StoreResult<Vec<StoredSchool>>;

    /// Counts stored schools
    fn count_schools(&self) -> StoreResult<u64>;

    // ===== Run Tracking =====

    /// Creates a new harvest run in the Running state
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StoreResult<i64>;

    /// Marks a run finished with its final status and counters
    fn complete_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        summary: &RunSummary,
    ) -> StoreResult<()>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StoreResult<Option<RunRecord>>;
}
