//! SQLite store implementation
//!
//! This module provides a SQLite-based implementation of the SchoolStore trait.

use crate::records::{degree_set_from_json, degree_set_to_json, SchoolRecord};
use crate::report::RunSummary;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{SchoolStore, StoreError, StoreResult};
use crate::storage::{RunRecord, RunStatus, StoredSchool};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database file
    ///
    /// The schema is not created here; call `ensure_schema` before writing.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened database
    /// * `Err(StoreError)` - Failed to open database
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    fn row_to_school(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredSchool> {
        let quota: Option<i64> = row.get(5)?;
        let degree_json: String = row.get(6)?;

        Ok(StoredSchool {
            id: row.get(0)?,
            record: SchoolRecord {
                source_page_url: row.get(1)?,
                name: row.get(2)?,
                country: row.get(3)?,
                city: row.get(4)?,
                exchange_quota: quota.and_then(|q| u32::try_from(q).ok()),
                degree_types: degree_set_from_json(&degree_json),
                description: row.get(7)?,
                official_website: row.get(8)?,
                location_info: row.get(9)?,
                image_url: row.get(10)?,
            },
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }
}

const SCHOOL_COLUMNS: &str = "id, source_page_url, name, country, city, exchange_quota,
     degree_types, description, official_website, location_info, image_url,
     created_at, updated_at";

impl SchoolStore for SqliteStore {
    // ===== Schema =====

    fn ensure_schema(&mut self) -> StoreResult<()> {
        initialize_schema(&self.conn)?;
        Ok(())
    }

    // ===== School Records =====

    fn upsert_school(&mut self, record: &SchoolRecord) -> StoreResult<i64> {
        let now = Utc::now().to_rfc3339();
        let degree_json = degree_set_to_json(&record.degree_types);
        let quota = record.exchange_quota.map(|q| q as i64);

        // Existing row: replace business fields, keep created_at, bump updated_at
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM schools WHERE source_page_url = ?1",
                params![record.source_page_url],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            self.conn
                .execute(
                    "UPDATE schools SET name = ?1, country = ?2, city = ?3,
                     exchange_quota = ?4, degree_types = ?5, description = ?6,
                     official_website = ?7, location_info = ?8, image_url = ?9,
                     updated_at = ?10
                     WHERE id = ?11",
                    params![
                        record.name,
                        record.country,
                        record.city,
                        quota,
                        degree_json,
                        record.description,
                        record.official_website,
                        record.location_info,
                        record.image_url,
                        now,
                        id
                    ],
                )
                .map_err(map_constraint)?;
            return Ok(id);
        }

        self.conn
            .execute(
                "INSERT INTO schools (source_page_url, name, country, city,
                 exchange_quota, degree_types, description, official_website,
                 location_info, image_url, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                params![
                    record.source_page_url,
                    record.name,
                    record.country,
                    record.city,
                    quota,
                    degree_json,
                    record.description,
                    record.official_website,
                    record.location_info,
                    record.image_url,
                    now
                ],
            )
            .map_err(map_constraint)?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_school_by_source_url(&self, url: &str) -> StoreResult<Option<StoredSchool>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM schools WHERE source_page_url = ?1",
            SCHOOL_COLUMNS
        ))?;

        let school = stmt
            .query_row(params![url], Self::row_to_school)
            .optional()?;

        Ok(school)
    }

    fn list_schools(&self) -> StoreResult<Vec<StoredSchool>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM schools ORDER BY name",
            SCHOOL_COLUMNS
        ))?;

        let schools = stmt
            .query_map([], Self::row_to_school)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(schools)
    }

    fn count_schools(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM schools", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Run Tracking =====

    fn create_run(&mut self, config_hash: &str) -> StoreResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        summary: &RunSummary,
    ) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2,
             pages_visited = ?3, pages_failed = ?4, entries_discovered = ?5,
             entries_enriched = ?6, entries_failed = ?7, records_written = ?8
             WHERE id = ?9",
            params![
                status.to_db_string(),
                now,
                summary.pages_visited as i64,
                summary.pages_failed as i64,
                summary.entries_discovered as i64,
                summary.entries_enriched as i64,
                summary.entries_failed as i64,
                summary.records_written as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StoreError::RunNotFound(run_id));
        }

        Ok(())
    }

    fn get_latest_run(&self) -> StoreResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status, records_written
             FROM runs ORDER BY id DESC LIMIT 1",
        )?;

        let run = stmt
            .query_row([], |row| {
                let records_written: i64 = row.get(5)?;
                Ok(RunRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    config_hash: row.get(3)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                        .unwrap_or(RunStatus::Failed),
                    records_written: records_written as u64,
                })
            })
            .optional()?;

        Ok(run)
    }
}

/// Maps SQLite constraint failures to the dedicated error variant
fn map_constraint(error: rusqlite::Error) -> StoreError {
    match &error {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::ConstraintViolation(error.to_string())
        }
        _ => StoreError::Sqlite(error),
    }
}
