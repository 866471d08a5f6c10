//! Harvest pipeline
//!
//! This module contains the core harvest logic, including:
//! - Sequential pagination walking with per-page failure tolerance
//! - Detail-page enrichment with retry and bounded concurrency
//! - Normalization, validation, and union-merge deduplication
//! - Idempotent writing into the school store
//! - Overall orchestration and cancellation

mod enricher;
mod normalize;
mod orchestrator;
mod retry;
mod walker;

pub use enricher::enrich;
pub use normalize::{dedup_entries, merge_records, normalize, AbsorbOutcome, RecordSet, RejectReason};
pub use orchestrator::{Orchestrator, RunPhase};
pub use retry::{fetch_with_retry, RetryPolicy};
pub use walker::{page_url, walk};

use crate::config::Config;
use crate::report::RunSummary;
use crate::snapshot::HttpSnapshotSource;
use crate::storage::SqliteStore;
use crate::{AtlasError, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation signal
///
/// Once raised, no new fetches are issued; in-flight fetches finish and their
/// results are still recorded.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a new, unraised token
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the cancellation signal
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Checks whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Runs a complete harvest operation
///
/// This is the main entry point for starting a harvest. It will:
/// 1. Build the HTTP snapshot source
/// 2. Open the store and ensure the schema exists
/// 3. Walk the listing, enrich entries, normalize and write records
/// 4. Record the run and return its summary
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `config_hash` - Hash of the configuration file, recorded with the run
/// * `cancel` - Cooperative cancellation token
///
/// # Returns
///
/// * `Ok(RunSummary)` - Harvest completed (possibly with partial failures)
/// * `Err(AtlasError)` - Infrastructure failure before any fetching began
pub async fn run_harvest(
    config: Config,
    config_hash: &str,
    cancel: CancelToken,
) -> Result<RunSummary> {
    let source = HttpSnapshotSource::new(&config.http, &config.user_agent)
        .map_err(|e| AtlasError::Infrastructure(format!("Failed to build HTTP client: {}", e)))?;

    let mut store = SqliteStore::new(Path::new(&config.output.database_path))
        .map_err(|e| AtlasError::Infrastructure(format!("Store unreachable: {}", e)))?;

    let mut orchestrator = Orchestrator::new(config, Arc::new(source), cancel);
    orchestrator.run(&mut store, config_hash).await
}
