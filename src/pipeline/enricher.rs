//! Detail-page enricher
//!
//! Fetches each entry's detail page and merges the extracted fields into a
//! SchoolRecord. Enrichment never fails the batch: after retries are
//! exhausted the entry is emitted with only its listing fields and the
//! failure is recorded in the run report.

use crate::extract::extract_detail_fields;
use crate::pipeline::retry::{fetch_with_retry, RetryPolicy};
use crate::records::{RawListEntry, SchoolRecord};
use crate::report::CrawlRunReport;
use crate::snapshot::SnapshotSource;

/// Enriches one listing entry with its detail-page fields
///
/// # Arguments
///
/// * `source` - The snapshot source to fetch the detail page through
/// * `entry` - The listing entry to enrich
/// * `policy` - Retry policy for the detail fetch
/// * `report` - Run report for enrichment accounting
///
/// # Returns
///
/// The merged SchoolRecord; detail fields are absent if the page could not
/// be fetched.
pub async fn enrich(
    source: &dyn SnapshotSource,
    entry: RawListEntry,
    policy: &RetryPolicy,
    report: &CrawlRunReport,
) -> SchoolRecord {
    let detail_url = entry.detail_url.clone();

    match fetch_with_retry(source, &detail_url, policy).await {
        Ok(snapshot) => {
            let mut notes = Vec::new();
            let detail = extract_detail_fields(&snapshot, &mut notes);
            report.add_notes(notes);
            report.entry_enriched();

            tracing::debug!("Enriched {} ({})", entry.name, detail_url);
            entry.into_record(detail)
        }
        Err(error) => {
            tracing::warn!(
                "Detail page {} failed, keeping listing fields only: {}",
                detail_url,
                error
            );
            report.entry_failed(detail_url.as_str(), error.to_string());
            entry.into_partial_record()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{build_snapshot, PageSnapshot, SnapshotError, SnapshotResult};
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::time::Duration;
    use url::Url;

    struct OnePageSource {
        url: String,
        html: Option<String>,
    }

    #[async_trait]
    impl SnapshotSource for OnePageSource {
        async fn fetch(&self, url: &Url) -> SnapshotResult<PageSnapshot> {
            match &self.html {
                Some(html) if url.as_str() == self.url => Ok(build_snapshot(html, url)),
                _ => Err(SnapshotError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    fn entry() -> RawListEntry {
        RawListEntry {
            name: "Tulane University".to_string(),
            country: Some("USA".to_string()),
            city: Some("NewOrleans".to_string()),
            exchange_quota: Some(2),
            degree_types: BTreeSet::new(),
            image_url: None,
            detail_url: Url::parse("https://partners.example.edu/node/386").unwrap(),
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 0,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_enrich_merges_detail_fields() {
        let source = OnePageSource {
            url: "https://partners.example.edu/node/386".to_string(),
            html: Some(
                r#"<html><body>
                    <p>The Freeman School of Business is located in New Orleans and offers exchange programs.</p>
                    <div><a href="https://freeman.tulane.edu">Website</a></div>
                </body></html>"#
                    .to_string(),
            ),
        };
        let report = CrawlRunReport::new();

        let record = enrich(&source, entry(), &policy(), &report).await;

        assert!(record.description.as_deref().unwrap().contains("Freeman"));
        assert_eq!(
            record.official_website.as_deref(),
            Some("https://freeman.tulane.edu/")
        );
        assert_eq!(record.country.as_deref(), Some("USA"));
        assert_eq!(report.summary().entries_enriched, 1);
        assert_eq!(report.summary().entries_failed, 0);
    }

    #[tokio::test]
    async fn test_unreachable_detail_page_yields_partial_record() {
        let source = OnePageSource {
            url: "https://partners.example.edu/node/386".to_string(),
            html: None,
        };
        let report = CrawlRunReport::new();

        let record = enrich(&source, entry(), &policy(), &report).await;

        // Listing fields survive, detail fields stay absent
        assert_eq!(record.name, "Tulane University");
        assert_eq!(record.exchange_quota, Some(2));
        assert_eq!(record.description, None);
        assert_eq!(record.official_website, None);

        let summary = report.summary();
        assert_eq!(summary.entries_enriched, 0);
        assert_eq!(summary.entries_failed, 1);
        assert_eq!(summary.failures.len(), 1);
    }
}
