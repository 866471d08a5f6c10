//! Retry policy for snapshot fetches
//!
//! Every external fetch goes through `fetch_with_retry`: transient failures
//! are retried with exponential backoff up to the configured attempt count,
//! then surfaced to the caller, who records them and continues. Nothing in
//! the pipeline lets a fetch failure propagate past its call site.

use crate::config::HttpConfig;
use crate::snapshot::{PageSnapshot, SnapshotResult, SnapshotSource};
use std::time::Duration;
use url::Url;

/// Retry behavior for transient fetch failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retry attempts after the initial try
    pub max_retries: u32,

    /// Base backoff, doubled on each subsequent attempt
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Builds the policy from the HTTP configuration
    pub fn from_config(http: &HttpConfig) -> Self {
        Self {
            max_retries: http.max_retries,
            backoff: Duration::from_millis(http.retry_backoff_ms),
        }
    }

    /// Backoff before retry `attempt` (zero-based): base * 2^attempt
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff * 2u32.saturating_pow(attempt)
    }
}

/// Fetches a snapshot, retrying transient failures per the policy
///
/// Non-retryable failures (e.g. HTTP 404) return immediately. Retryable
/// failures are retried `max_retries` times; the last error is returned once
/// attempts are exhausted.
pub async fn fetch_with_retry(
    source: &dyn SnapshotSource,
    url: &Url,
    policy: &RetryPolicy,
) -> SnapshotResult<PageSnapshot> {
    let mut attempt = 0;

    loop {
        match source.fetch(url).await {
            Ok(snapshot) => return Ok(snapshot),
            Err(error) => {
                if !error.is_retryable() || attempt >= policy.max_retries {
                    return Err(error);
                }

                let backoff = policy.backoff_for(attempt);
                tracing::debug!(
                    "Fetch of {} failed ({}), retry {}/{} in {:?}",
                    url,
                    error,
                    attempt + 1,
                    policy.max_retries,
                    backoff
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}
