//! Exchange-Atlas: a partner-school directory harvester
//!
//! This crate implements a two-stage crawler that walks a paginated
//! partner-school listing, follows each school to its detail page, normalizes
//! the merged data, and upserts it into a SQLite store.

pub mod config;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod records;
pub mod report;
pub mod snapshot;
pub mod storage;

use thiserror::Error;

/// Main error type for Exchange-Atlas operations
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] snapshot::SnapshotError),

    #[error("Store error: {0}")]
    Store(#[from] storage::StoreError),

    /// Fatal infrastructure failure (store unreachable, schema creation
    /// failed). Raised before any fetching begins; everything below this
    /// class is recovered locally and surfaced through the run report.
    #[error("Infrastructure failure: {0}")]
    Infrastructure(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AtlasError {
    /// Returns true if this error must abort the run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Infrastructure(_))
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Exchange-Atlas operations
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use records::{DegreeType, DetailFields, RawListEntry, SchoolRecord};
pub use report::{CrawlRunReport, ErrorKind, RunSummary};
pub use snapshot::{HttpSnapshotSource, PageSnapshot, SnapshotSource};
