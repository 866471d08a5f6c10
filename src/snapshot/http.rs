//! HTTP snapshot source
//!
//! Fetches pages with reqwest and builds `PageSnapshot`s from the parsed
//! HTML. Segmentation rules:
//! - If the page contains table rows, each `<tr>` becomes one block (the
//!   listing layout used by the directory site).
//! - Otherwise each direct child of `<body>` becomes one block.
//! - `<p>` texts are collected separately for description extraction.

use crate::config::{HttpConfig, UserAgentConfig};
use crate::snapshot::{
    collapse_whitespace, Anchor, Block, PageSnapshot, SnapshotError, SnapshotResult,
    SnapshotSource,
};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with proper identification and timeouts
///
/// # Arguments
///
/// * `http` - HTTP behavior configuration (timeout)
/// * `user_agent` - Crawler identification configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    http: &HttpConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(http.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Snapshot source backed by plain HTTP fetches
pub struct HttpSnapshotSource {
    client: Client,
}

impl HttpSnapshotSource {
    /// Creates a new HTTP snapshot source
    pub fn new(http: &HttpConfig, user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(http, user_agent)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self, url: &Url) -> SnapshotResult<PageSnapshot> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SnapshotError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // The final URL after redirects is the base for resolving links
        let final_url = response.url().clone();

        let body = response
            .text()
            .await
            .map_err(|e| classify_request_error(url, e))?;

        Ok(build_snapshot(&body, &final_url))
    }
}

/// Classifies a reqwest error into the snapshot error taxonomy
fn classify_request_error(url: &Url, error: reqwest::Error) -> SnapshotError {
    if error.is_timeout() {
        SnapshotError::NavigationTimeout {
            url: url.to_string(),
        }
    } else {
        SnapshotError::NavigationError {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Builds a structured snapshot from HTML content
///
/// Pure function, exposed for extractor unit tests.
pub fn build_snapshot(html: &str, base_url: &Url) -> PageSnapshot {
    let document = Html::parse_document(html);

    let elements: Vec<ElementRef> = match (Selector::parse("tr"), Selector::parse("body > *")) {
        (Ok(row_selector), Ok(body_selector)) => {
            let rows: Vec<ElementRef> = document.select(&row_selector).collect();
            if rows.is_empty() {
                document.select(&body_selector).collect()
            } else {
                rows
            }
        }
        _ => Vec::new(),
    };

    let blocks = elements
        .into_iter()
        .map(|el| build_block(el, base_url))
        .filter(|b| !b.text.is_empty() || !b.anchors.is_empty() || !b.images.is_empty())
        .collect();

    let paragraphs = match Selector::parse("p") {
        Ok(paragraph_selector) => document
            .select(&paragraph_selector)
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    };

    PageSnapshot {
        url: Some(base_url.clone()),
        blocks,
        paragraphs,
    }
}

/// Builds one content block from an element subtree
fn build_block(element: ElementRef, base_url: &Url) -> Block {
    let text = collapse_whitespace(&element.text().collect::<String>());

    let anchors = match Selector::parse("a[href]") {
        Ok(anchor_selector) => element
            .select(&anchor_selector)
            .filter_map(|a| {
                let href = a.value().attr("href")?;
                let resolved = resolve_href(href, base_url)?;
                Some(Anchor {
                    text: collapse_whitespace(&a.text().collect::<String>()),
                    href: resolved,
                })
            })
            .collect(),
        Err(_) => Vec::new(),
    };

    let images = match Selector::parse("img[src]") {
        Ok(image_selector) => element
            .select(&image_selector)
            .filter_map(|img| resolve_href(img.value().attr("src")?, base_url))
            .collect(),
        Err(_) => Vec::new(),
    };

    Block {
        text,
        anchors,
        images,
    }
}

/// Resolves an href to an absolute http(s) URL
///
/// Returns None for empty hrefs, fragment-only links, and non-navigable
/// schemes (javascript:, mailto:, tel:, data:).
fn resolve_href(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute)
        }
        _ => None,
    }
}
