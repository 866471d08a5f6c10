//! Snapshot Source capability
//!
//! The harvester never touches HTML or a browser directly. It consumes a
//! `SnapshotSource`: given a URL, the source returns a `PageSnapshot`, a
//! structured representation of the rendered page's visible content:
//! - content blocks in display order (text + anchors + images per block)
//! - paragraph texts
//!
//! The production implementation (`HttpSnapshotSource`) fetches over HTTP and
//! builds the snapshot with an HTML parser; tests substitute mock servers.

mod http;

pub use http::{build_http_client, build_snapshot, HttpSnapshotSource};

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Errors a snapshot source can produce
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Navigation timeout for {url}")]
    NavigationTimeout { url: String },

    #[error("Navigation error for {url}: {message}")]
    NavigationError { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },
}

impl SnapshotError {
    /// Returns true if retrying the fetch may succeed
    ///
    /// Timeouts and network errors are transient; HTTP errors are retried
    /// only for server-side conditions (5xx, 429).
    pub fn is_retryable(&self) -> bool {
        match self {
            SnapshotError::NavigationTimeout { .. } => true,
            SnapshotError::NavigationError { .. } => true,
            SnapshotError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
        }
    }
}

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// A link found in a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    /// Visible text of the link, whitespace-collapsed
    pub text: String,

    /// Absolute target URL
    pub href: Url,
}

/// One content block of a page, in display order
///
/// On tabular listings a block corresponds to one row; elsewhere to one
/// top-level body element.
#[derive(Debug, Clone, Default)]
pub struct Block {
    /// Visible text of the block, whitespace-collapsed
    pub text: String,

    /// Links within the block
    pub anchors: Vec<Anchor>,

    /// Image sources within the block, resolved to absolute URLs
    pub images: Vec<Url>,
}

/// Structured representation of a rendered page's visible content
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    /// The URL this snapshot was taken from
    pub url: Option<Url>,

    /// Content blocks in display order
    pub blocks: Vec<Block>,

    /// Paragraph texts in display order, whitespace-collapsed
    pub paragraphs: Vec<String>,
}

impl PageSnapshot {
    /// Iterates over every anchor on the page, in display order
    pub fn anchors(&self) -> impl Iterator<Item = &Anchor> {
        self.blocks.iter().flat_map(|b| b.anchors.iter())
    }

    /// Full visible text of the page
    pub fn full_text(&self) -> String {
        let mut parts: Vec<&str> = self.blocks.iter().map(|b| b.text.as_str()).collect();
        parts.retain(|t| !t.is_empty());
        parts.join(" ")
    }
}

/// Capability consumed by the pipeline: navigate to a URL and return a
/// structured snapshot of the rendered page
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, url: &Url) -> SnapshotResult<PageSnapshot>;
}

/// Collapses runs of whitespace to single spaces and trims the ends
///
/// Snapshot text is whitespace-collapsed by contract; the normalizer applies
/// the same collapse to every text field it touches.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
