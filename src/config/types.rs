use serde::Deserialize;

/// Main configuration structure for Exchange-Atlas
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub listing: ListingConfig,
    pub http: HttpConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Listing traversal configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    /// Base URL of the paginated school listing
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Number of listing pages to walk
    #[serde(rename = "page-count")]
    pub page_count: u32,

    /// Path fragment identifying detail-page links on the listing
    #[serde(rename = "detail-link-pattern", default = "default_detail_pattern")]
    pub detail_link_pattern: String,
}

fn default_detail_pattern() -> String {
    "/node/".to_string()
}

/// HTTP behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Maximum number of concurrent detail-page fetches
    pub concurrency: u32,

    /// Minimum delay between requests issued by one worker (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Maximum retry attempts for a transient fetch failure
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Base backoff between retries (milliseconds, doubled per attempt)
    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,

    /// Bounded wait for a single page fetch (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the full user agent string sent with every request
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path for the JSON export of harvested records
    #[serde(rename = "json-path")]
    pub json_path: String,
}
