//! Crawl run report
//!
//! A single owned aggregation object for progress and error accounting,
//! shared by reference across concurrent workers. Counters are atomics and
//! the failure/note lists are append-only behind a mutex, so there are no
//! read-modify-write races. The report is mutated throughout a run and
//! emitted as a read-only `RunSummary` at the end.

use crate::extract::FieldNote;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Classification of recovered (non-fatal) failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network error or timeout; retries were exhausted
    TransientFetch,

    /// An extraction rule cascade was exhausted
    ParseAmbiguity,

    /// A mandatory field was missing after normalization
    ValidationRejection,

    /// An upsert failed after its single retry
    StoreWrite,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::TransientFetch => "transient-fetch",
            ErrorKind::ParseAmbiguity => "parse-ambiguity",
            ErrorKind::ValidationRejection => "validation-rejection",
            ErrorKind::StoreWrite => "store-write",
        };
        f.write_str(name)
    }
}

/// One recovered failure, recorded for the final report
#[derive(Debug, Clone)]
pub struct Failure {
    pub url: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Thread-safe accumulation of run progress and failures
#[derive(Debug, Default)]
pub struct CrawlRunReport {
    pages_visited: AtomicU64,
    pages_failed: AtomicU64,
    entries_discovered: AtomicU64,
    entries_enriched: AtomicU64,
    entries_failed: AtomicU64,
    records_written: AtomicU64,
    records_rejected: AtomicU64,
    duplicates_merged: AtomicU64,
    writes_failed: AtomicU64,
    failures: Mutex<Vec<Failure>>,
    notes: Mutex<Vec<FieldNote>>,
}

impl CrawlRunReport {
    /// Creates an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one successfully loaded listing page
    pub fn page_visited(&self) {
        self.pages_visited.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a listing page that failed after retries
    pub fn page_failed(&self, url: &str, message: String) {
        self.pages_failed.fetch_add(1, Ordering::Relaxed);
        self.push_failure(url, ErrorKind::TransientFetch, message);
    }

    /// Records entries discovered on a listing page
    pub fn entries_discovered(&self, count: u64) {
        self.entries_discovered.fetch_add(count, Ordering::Relaxed);
    }

    /// Records one successfully enriched entry
    pub fn entry_enriched(&self) {
        self.entries_enriched.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an entry whose detail page could not be fetched
    pub fn entry_failed(&self, url: &str, message: String) {
        self.entries_failed.fetch_add(1, Ordering::Relaxed);
        self.push_failure(url, ErrorKind::TransientFetch, message);
    }

    /// Records one record written to the store
    pub fn record_written(&self) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a record rejected by validation
    pub fn record_rejected(&self, url: &str, reason: String) {
        self.records_rejected.fetch_add(1, Ordering::Relaxed);
        self.push_failure(url, ErrorKind::ValidationRejection, reason);
    }

    /// Records a duplicate key that was union-merged
    pub fn duplicate_merged(&self) {
        self.duplicates_merged.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an upsert that failed after its retry
    pub fn write_failed(&self, url: &str, message: String) {
        self.writes_failed.fetch_add(1, Ordering::Relaxed);
        self.push_failure(url, ErrorKind::StoreWrite, message);
    }

    /// Attaches low-severity extraction notes
    pub fn add_notes(&self, mut new_notes: Vec<FieldNote>) {
        if new_notes.is_empty() {
            return;
        }
        if let Ok(mut notes) = self.notes.lock() {
            notes.append(&mut new_notes);
        }
    }

    fn push_failure(&self, url: &str, kind: ErrorKind, message: String) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(Failure {
                url: url.to_string(),
                kind,
                message,
            });
        }
    }

    /// Takes a read-only snapshot of the report
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            pages_visited: self.pages_visited.load(Ordering::Relaxed),
            pages_failed: self.pages_failed.load(Ordering::Relaxed),
            entries_discovered: self.entries_discovered.load(Ordering::Relaxed),
            entries_enriched: self.entries_enriched.load(Ordering::Relaxed),
            entries_failed: self.entries_failed.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
            duplicates_merged: self.duplicates_merged.load(Ordering::Relaxed),
            writes_failed: self.writes_failed.load(Ordering::Relaxed),
            failures: self.failures.lock().map(|f| f.clone()).unwrap_or_default(),
            notes: self.notes.lock().map(|n| n.clone()).unwrap_or_default(),
        }
    }
}

/// Read-only snapshot of a finished (or in-progress) run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub pages_visited: u64,
    pub pages_failed: u64,
    pub entries_discovered: u64,
    pub entries_enriched: u64,
    pub entries_failed: u64,
    pub records_written: u64,
    pub records_rejected: u64,
    pub duplicates_merged: u64,
    pub writes_failed: u64,
    pub failures: Vec<Failure>,
    pub notes: Vec<FieldNote>,
}

impl RunSummary {
    /// True if any page, entry, or write failed during the run
    ///
    /// Partial failures never make the run fatal; they only distinguish a
    /// clean completion from a degraded one.
    pub fn has_partial_failures(&self) -> bool {
        self.pages_failed > 0
            || self.entries_failed > 0
            || self.records_rejected > 0
            || self.writes_failed > 0
    }
}

/// Prints a run summary to stdout in a formatted manner
pub fn print_summary(summary: &RunSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Listing:");
    println!("  Pages visited: {}", summary.pages_visited);
    println!("  Pages failed: {}", summary.pages_failed);
    println!("  Entries discovered: {}", summary.entries_discovered);
    println!();

    println!("Enrichment:");
    println!("  Entries enriched: {}", summary.entries_enriched);
    println!("  Entries failed: {}", summary.entries_failed);
    println!();

    println!("Records:");
    println!("  Written: {}", summary.records_written);
    println!("  Rejected: {}", summary.records_rejected);
    println!("  Duplicates merged: {}", summary.duplicates_merged);
    println!("  Writes failed: {}", summary.writes_failed);

    if !summary.failures.is_empty() {
        println!("\nFailures ({}):", summary.failures.len());
        for failure in &summary.failures {
            println!("  [{}] {}: {}", failure.kind, failure.url, failure.message);
        }
    }

    if !summary.notes.is_empty() {
        println!("\nExtraction notes ({}):", summary.notes.len());
        for note in &summary.notes {
            println!(
                "  [{}] {} missing at {}",
                ErrorKind::ParseAmbiguity,
                note.field,
                note.context
            );
        }
    }
}
