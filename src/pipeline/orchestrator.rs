//! Crawl orchestrator
//!
//! Drives a harvest run through its phases:
//!
//! ```text
//! Idle -> Listing -> Enrichment -> Writing -> Done
//!                                          \-> Failed (infrastructure only)
//! ```
//!
//! Ordinary per-page and per-entry failures are recorded in the run report
//! and the run proceeds; only infrastructure failures (store unreachable,
//! schema creation failed) before any fetching reach the `Failed` state.

use crate::config::Config;
use crate::pipeline::enricher::enrich;
use crate::pipeline::normalize::{dedup_entries, normalize, AbsorbOutcome, RecordSet};
use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::walker::walk;
use crate::pipeline::CancelToken;
use crate::records::{RawListEntry, SchoolRecord};
use crate::report::{CrawlRunReport, RunSummary};
use crate::snapshot::SnapshotSource;
use crate::storage::{RunStatus, SchoolStore};
use crate::{AtlasError, Result};
use futures::stream::{self, StreamExt};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Phase of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Listing,
    Enrichment,
    Writing,
    Done,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Listing => "listing",
            RunPhase::Enrichment => "enrichment",
            RunPhase::Writing => "writing",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Main harvest orchestrator
pub struct Orchestrator {
    config: Arc<Config>,
    source: Arc<dyn SnapshotSource>,
    report: Arc<CrawlRunReport>,
    cancel: CancelToken,
    phase: RunPhase,
}

impl Orchestrator {
    /// Creates a new orchestrator
    ///
    /// # Arguments
    ///
    /// * `config` - The harvester configuration
    /// * `source` - The snapshot source to fetch pages through
    /// * `cancel` - Cooperative cancellation token (wire it to a signal
    ///   handler before calling `run`)
    pub fn new(config: Config, source: Arc<dyn SnapshotSource>, cancel: CancelToken) -> Self {
        Self {
            config: Arc::new(config),
            source,
            report: Arc::new(CrawlRunReport::new()),
            cancel,
            phase: RunPhase::Idle,
        }
    }

    /// Current phase of the run
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Shared handle to the run report
    pub fn report(&self) -> Arc<CrawlRunReport> {
        Arc::clone(&self.report)
    }

    fn set_phase(&mut self, phase: RunPhase) {
        tracing::info!("Phase: {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// Runs the harvest to completion
    ///
    /// # Arguments
    ///
    /// * `store` - The school store to write into
    /// * `config_hash` - Hash of the configuration file, recorded on the run
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - Run reached `Done`, possibly with partial
    ///   failures (visible in the summary)
    /// * `Err(AtlasError::Infrastructure)` - Run reached `Failed` before any
    ///   fetching began
    pub async fn run(
        &mut self,
        store: &mut dyn SchoolStore,
        config_hash: &str,
    ) -> Result<RunSummary> {
        let start = std::time::Instant::now();

        let base = Url::parse(&self.config.listing.base_url)
            .map_err(|e| self.fail(format!("Invalid listing base URL: {}", e)))?;

        // Schema creation and run registration happen before any fetching;
        // their failure is the only fatal path.
        store
            .ensure_schema()
            .map_err(|e| self.fail(format!("Schema creation failed: {}", e)))?;
        let run_id = store
            .create_run(config_hash)
            .map_err(|e| self.fail(format!("Failed to register run: {}", e)))?;

        tracing::info!(
            "Starting harvest run {} over {} listing pages",
            run_id,
            self.config.listing.page_count
        );

        // ===== Listing =====
        self.set_phase(RunPhase::Listing);
        let policy = RetryPolicy::from_config(&self.config.http);
        let delay = Duration::from_millis(self.config.http.request_delay_ms);

        let entries = walk(
            self.source.as_ref(),
            &base,
            self.config.listing.page_count,
            &self.config.listing.detail_link_pattern,
            &policy,
            delay,
            &self.report,
            &self.cancel,
        )
        .await;

        // ===== Enrichment =====
        self.set_phase(RunPhase::Enrichment);
        let unique_entries = dedup_entries(entries, &self.report);
        tracing::info!("Enriching {} unique entries", unique_entries.len());

        let records = self.enrich_all(unique_entries, &policy, delay).await;

        // ===== Writing =====
        self.set_phase(RunPhase::Writing);
        let mut set = RecordSet::new();
        for record in records {
            let url = record.source_page_url.clone();
            match normalize(record) {
                Ok(normalized) => {
                    if set.absorb(normalized) == AbsorbOutcome::Merged {
                        self.report.duplicate_merged();
                    }
                }
                Err(reason) => {
                    tracing::warn!("Rejecting record from {}: {}", url, reason);
                    self.report.record_rejected(&url, reason.to_string());
                }
            }
        }

        tracing::info!("Writing {} records", set.len());
        for record in set.into_records() {
            self.write_record(store, &record);
        }

        // ===== Done =====
        let summary = self.report.summary();
        let status = if summary.has_partial_failures() {
            RunStatus::CompletedWithFailures
        } else {
            RunStatus::Completed
        };

        if let Err(e) = store.complete_run(run_id, status, &summary) {
            tracing::warn!("Failed to record run completion: {}", e);
        }

        self.set_phase(RunPhase::Done);
        tracing::info!(
            "Harvest run {} finished in {:?}: {} written, {} pages failed, {} entries failed",
            run_id,
            start.elapsed(),
            summary.records_written,
            summary.pages_failed,
            summary.entries_failed
        );

        Ok(summary)
    }

    /// Enriches entries with bounded concurrency
    ///
    /// Each worker sleeps the inter-request delay before fetching, bounding
    /// the request rate against the source site. Entries reached after
    /// cancellation skip their fetch but still yield list-only records, so
    /// nothing is silently dropped.
    async fn enrich_all(
        &self,
        entries: Vec<RawListEntry>,
        policy: &RetryPolicy,
        delay: Duration,
    ) -> Vec<SchoolRecord> {
        let concurrency = (self.config.http.concurrency as usize).max(1);

        stream::iter(entries)
            .map(|entry| {
                let source = Arc::clone(&self.source);
                let report = Arc::clone(&self.report);
                let cancel = self.cancel.clone();
                let policy = policy.clone();

                async move {
                    if cancel.is_cancelled() {
                        tracing::debug!("Cancelled before fetching {}", entry.detail_url);
                        return entry.into_partial_record();
                    }
                    tokio::time::sleep(delay).await;
                    enrich(source.as_ref(), entry, &policy, &report).await
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await
    }

    /// Writes one record, retrying a failed upsert once
    fn write_record(&self, store: &mut dyn SchoolStore, record: &SchoolRecord) {
        match store.upsert_school(record) {
            Ok(_) => self.report.record_written(),
            Err(first) => {
                tracing::warn!(
                    "Upsert of {} failed, retrying once: {}",
                    record.source_page_url,
                    first
                );
                match store.upsert_school(record) {
                    Ok(_) => self.report.record_written(),
                    Err(second) => {
                        self.report
                            .write_failed(&record.source_page_url, second.to_string());
                    }
                }
            }
        }
    }

    /// Transitions to `Failed` and builds the fatal error
    fn fail(&mut self, message: String) -> AtlasError {
        tracing::error!("{}", message);
        self.set_phase(RunPhase::Failed);
        AtlasError::Infrastructure(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HttpConfig, ListingConfig, OutputConfig, UserAgentConfig};
    use crate::snapshot::{build_snapshot, PageSnapshot, SnapshotError, SnapshotResult};
    use crate::storage::{RunRecord, SqliteStore, StoreError, StoreResult, StoredSchool};
    use async_trait::async_trait;
    use std::collections::HashMap;

    fn test_config(page_count: u32) -> Config {
        Config {
            listing: ListingConfig {
                base_url: "https://partners.example.edu/school-list".to_string(),
                page_count,
                detail_link_pattern: "/node/".to_string(),
            },
            http: HttpConfig {
                concurrency: 4,
                request_delay_ms: 0,
                max_retries: 0,
                retry_backoff_ms: 1,
                timeout_secs: 5,
            },
            user_agent: UserAgentConfig {
                crawler_name: "TestAtlas".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
            },
            output: OutputConfig {
                database_path: ":memory:".to_string(),
                json_path: "./schools.json".to_string(),
            },
        }
    }

    struct ScriptedSource {
        pages: HashMap<String, PageSnapshot>,
    }

    impl ScriptedSource {
        fn new() -> Self {
            Self {
                pages: HashMap::new(),
            }
        }

        fn page(mut self, url: &str, html: &str) -> Self {
            let parsed = Url::parse(url).unwrap();
            self.pages
                .insert(url.to_string(), build_snapshot(html, &parsed));
            self
        }
    }

    #[async_trait]
    impl SnapshotSource for ScriptedSource {
        async fn fetch(&self, url: &Url) -> SnapshotResult<PageSnapshot> {
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| SnapshotError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    const LISTING: &str = r#"<html><body><table>
        <tr><td>
            <a href="/node/1">Zagreb School of Economics</a>
            國家: 克羅埃西亞 城市: 薩格勒布 交換名額: 4 Bachelor Master
        </td></tr>
        <tr><td>
            <a href="/node/2">Tulane University</a>
            Country: USA City: NewOrleans Quota: 2 Bachelor
        </td></tr>
    </table></body></html>"#;

    const DETAIL: &str = r#"<html><body>
        <p>A well-regarded partner school with a long history of exchange cooperation.</p>
        <div><a href="https://official.example.org">Website</a></div>
    </body></html>"#;

    #[tokio::test]
    async fn test_full_run_writes_records_and_reaches_done() {
        let source = ScriptedSource::new()
            .page("https://partners.example.edu/school-list", LISTING)
            .page("https://partners.example.edu/node/1", DETAIL)
            .page("https://partners.example.edu/node/2", DETAIL);

        let mut store = SqliteStore::new_in_memory().unwrap();
        let mut orchestrator =
            Orchestrator::new(test_config(1), Arc::new(source), CancelToken::new());

        let summary = orchestrator.run(&mut store, "hash").await.unwrap();

        assert_eq!(orchestrator.phase(), RunPhase::Done);
        assert_eq!(summary.pages_visited, 1);
        assert_eq!(summary.entries_discovered, 2);
        assert_eq!(summary.entries_enriched, 2);
        assert_eq!(summary.records_written, 2);
        assert!(!summary.has_partial_failures());

        let stored = store
            .get_school_by_source_url("https://partners.example.edu/node/1")
            .unwrap()
            .unwrap();
        assert_eq!(stored.record.name, "Zagreb School of Economics");
        assert!(stored.record.description.is_some());
    }

    #[tokio::test]
    async fn test_missing_detail_page_still_writes_partial_record() {
        // node/2 has no detail page
        let source = ScriptedSource::new()
            .page("https://partners.example.edu/school-list", LISTING)
            .page("https://partners.example.edu/node/1", DETAIL);

        let mut store = SqliteStore::new_in_memory().unwrap();
        let mut orchestrator =
            Orchestrator::new(test_config(1), Arc::new(source), CancelToken::new());

        let summary = orchestrator.run(&mut store, "hash").await.unwrap();

        assert_eq!(summary.entries_enriched, 1);
        assert_eq!(summary.entries_failed, 1);
        assert_eq!(summary.records_written, 2);
        assert!(summary.has_partial_failures());

        let partial = store
            .get_school_by_source_url("https://partners.example.edu/node/2")
            .unwrap()
            .unwrap();
        assert_eq!(partial.record.name, "Tulane University");
        assert_eq!(partial.record.country.as_deref(), Some("USA"));
        assert_eq!(partial.record.description, None);
    }

    /// Store whose schema creation always fails
    struct BrokenStore;

    impl SchoolStore for BrokenStore {
        fn ensure_schema(&mut self) -> StoreResult<()> {
            Err(StoreError::ConstraintViolation("disk full".to_string()))
        }
        fn upsert_school(&mut self, _: &SchoolRecord) -> StoreResult<i64> {
            unreachable!("no writes after a fatal startup failure")
        }
        fn get_school_by_source_url(&self, _: &str) -> StoreResult<Option<StoredSchool>> {
            Ok(None)
        }
        fn list_schools(&self) -> StoreResult<Vec<StoredSchool>> {
            Ok(Vec::new())
        }
        fn count_schools(&self) -> StoreResult<u64> {
            Ok(0)
        }
        fn create_run(&mut self, _: &str) -> StoreResult<i64> {
            unreachable!("schema creation failed first")
        }
        fn complete_run(&mut self, _: i64, _: RunStatus, _: &RunSummary) -> StoreResult<()> {
            Ok(())
        }
        fn get_latest_run(&self) -> StoreResult<Option<RunRecord>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_schema_failure_is_fatal_before_any_fetching() {
        let source = ScriptedSource::new();
        let mut store = BrokenStore;
        let mut orchestrator =
            Orchestrator::new(test_config(3), Arc::new(source), CancelToken::new());

        let result = orchestrator.run(&mut store, "hash").await;

        assert!(matches!(result, Err(AtlasError::Infrastructure(_))));
        assert_eq!(orchestrator.phase(), RunPhase::Failed);
        // No pages were visited or failed: the run aborted before fetching
        let summary = orchestrator.report().summary();
        assert_eq!(summary.pages_visited, 0);
        assert_eq!(summary.pages_failed, 0);
    }

    /// Raises the cancel signal as a side effect of serving the listing page
    struct CancelAfterListing {
        inner: ScriptedSource,
        cancel: CancelToken,
    }

    #[async_trait]
    impl SnapshotSource for CancelAfterListing {
        async fn fetch(&self, url: &Url) -> SnapshotResult<PageSnapshot> {
            let snapshot = self.inner.fetch(url).await;
            if url.path().ends_with("/school-list") {
                self.cancel.cancel();
            }
            snapshot
        }
    }

    #[tokio::test]
    async fn test_cancelled_run_keeps_list_only_records() {
        let cancel = CancelToken::new();
        let source = CancelAfterListing {
            inner: ScriptedSource::new()
                .page("https://partners.example.edu/school-list", LISTING)
                .page("https://partners.example.edu/node/1", DETAIL)
                .page("https://partners.example.edu/node/2", DETAIL),
            cancel: cancel.clone(),
        };

        let mut store = SqliteStore::new_in_memory().unwrap();
        let mut orchestrator =
            Orchestrator::new(test_config(1), Arc::new(source), cancel);

        let summary = orchestrator.run(&mut store, "hash").await.unwrap();

        // Detail fetches were never issued, yet every discovered entry was
        // still written with its listing fields.
        assert_eq!(orchestrator.phase(), RunPhase::Done);
        assert_eq!(summary.pages_visited, 1);
        assert_eq!(summary.entries_discovered, 2);
        assert_eq!(summary.entries_enriched, 0);
        assert_eq!(summary.records_written, 2);

        let stored = store
            .get_school_by_source_url("https://partners.example.edu/node/1")
            .unwrap()
            .unwrap();
        assert_eq!(stored.record.description, None);
        assert_eq!(stored.record.country.as_deref(), Some("克羅埃西亞"));
    }
}
