//! Pagination walker
//!
//! Walks the listing's pages sequentially, in page order, extracting entries
//! from each. A page that fails to load after retries is recorded in the run
//! report and the walk continues with the next page: a listing of 11 pages
//! with one unreachable page yields 10 pages of entries plus one failure.

use crate::extract::extract_list_entries;
use crate::pipeline::retry::{fetch_with_retry, RetryPolicy};
use crate::pipeline::CancelToken;
use crate::records::RawListEntry;
use crate::report::CrawlRunReport;
use crate::snapshot::SnapshotSource;
use std::time::Duration;
use url::Url;

/// Builds the URL of one listing page
///
/// The walker counts pages from 1; the source site counts its page query
/// parameter from 0, so page 1 is the bare listing URL and page n appends
/// `page={n-1}`.
pub fn page_url(base: &Url, page_index: u32) -> Url {
    if page_index <= 1 {
        return base.clone();
    }

    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("page", &(page_index - 1).to_string());
    url
}

/// Walks listing pages `1..=page_count` and returns their entries in order
///
/// Display order is preserved within a page (used for progress logging; no
/// ordering invariant holds downstream). Duplicate keys across pages are
/// left in place for the orchestrator's union-merge.
///
/// # Arguments
///
/// * `source` - The snapshot source to fetch pages through
/// * `base` - Base URL of the listing
/// * `page_count` - Number of pages to walk
/// * `detail_pattern` - Path fragment identifying detail-page links
/// * `policy` - Retry policy for page fetches
/// * `delay` - Minimum delay between page requests
/// * `report` - Run report for progress and failure accounting
/// * `cancel` - Cooperative cancellation; stops issuing new page fetches
#[allow(clippy::too_many_arguments)]
pub async fn walk(
    source: &dyn SnapshotSource,
    base: &Url,
    page_count: u32,
    detail_pattern: &str,
    policy: &RetryPolicy,
    delay: Duration,
    report: &CrawlRunReport,
    cancel: &CancelToken,
) -> Vec<RawListEntry> {
    let mut entries = Vec::new();

    for page_index in 1..=page_count {
        if cancel.is_cancelled() {
            tracing::info!("Cancellation requested, stopping at page {}", page_index);
            break;
        }

        if page_index > 1 {
            tokio::time::sleep(delay).await;
        }

        let url = page_url(base, page_index);
        tracing::debug!("Fetching listing page {}: {}", page_index, url);

        match fetch_with_retry(source, &url, policy).await {
            Ok(snapshot) => {
                let mut notes = Vec::new();
                let page_entries = extract_list_entries(&snapshot, detail_pattern, &mut notes);
                report.add_notes(notes);
                report.page_visited();
                report.entries_discovered(page_entries.len() as u64);

                tracing::info!(
                    "Page {}/{}: {} entries",
                    page_index,
                    page_count,
                    page_entries.len()
                );
                entries.extend(page_entries);
            }
            Err(error) => {
                tracing::warn!("Page {}/{} failed: {}", page_index, page_count, error);
                report.page_failed(url.as_str(), error.to_string());
            }
        }
    }

    entries
}
