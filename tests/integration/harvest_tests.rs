//! Integration tests for the harvester
//!
//! These tests use wiremock to serve a small partner-school directory and
//! exercise the full harvest cycle end-to-end: listing walk, detail
//! enrichment, normalization, and the idempotent store.

use exchange_atlas::config::{Config, HttpConfig, ListingConfig, OutputConfig, UserAgentConfig};
use exchange_atlas::pipeline::{run_harvest, CancelToken};
use exchange_atlas::storage::{RunStatus, SchoolStore, SqliteStore};
use std::path::Path;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointed at the mock server
fn create_test_config(base_url: &str, page_count: u32, db_path: &Path) -> Config {
    Config {
        listing: ListingConfig {
            base_url: format!("{}/school-list", base_url),
            page_count,
            detail_link_pattern: "/node/".to_string(),
        },
        http: HttpConfig {
            concurrency: 4,
            request_delay_ms: 0, // No pacing needed against a local mock
            max_retries: 1,
            retry_backoff_ms: 1,
            timeout_secs: 5,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestAtlas".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string_lossy().to_string(),
            json_path: db_path
                .with_extension("json")
                .to_string_lossy()
                .to_string(),
        },
    }
}

fn listing_row(node: u32, name: &str, tail: &str) -> String {
    format!(
        r#"<tr><td><h3><a href="/node/{}">{}</a></h3> {}</td></tr>"#,
        node, name, tail
    )
}

fn listing_page(rows: &[String]) -> String {
    format!(
        "<html><body><table>{}</table></body></html>",
        rows.join("\n")
    )
}

fn detail_page(description: &str, website: &str) -> String {
    format!(
        r#"<html><body>
            <p>{}</p>
            <div><a href="{}">Official website</a></div>
            <div>Location: on the main campus</div>
        </body></html>"#,
        description, website
    )
}

async fn mount_html(server: &MockServer, at: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_harvest_two_pages() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().expect("tempdir");
    let db_path = tmp.path().join("atlas.db");

    // Page 2 carries the page=1 query; mount it before the bare listing so
    // the more specific matcher wins.
    Mock::given(method("GET"))
        .and(path("/school-list"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&[listing_row(
                    2,
                    "Tulane University",
                    "Country: USA City: NewOrleans Quota: 2 Bachelor",
                )]))
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    mount_html(
        &server,
        "/school-list",
        listing_page(&[listing_row(
            1,
            "Zagreb School of Economics",
            "國家: 克羅埃西亞 城市: 薩格勒布 交換名額: 4 Bachelor Master",
        )]),
    )
    .await;

    mount_html(
        &server,
        "/node/1",
        detail_page(
            "The Zagreb School of Economics and Management is a leading regional business school.",
            "https://www.zsem.hr/en",
        ),
    )
    .await;
    mount_html(
        &server,
        "/node/2",
        detail_page(
            "The Freeman School of Business offers exchange places across its programs.",
            "https://freeman.tulane.edu",
        ),
    )
    .await;

    let config = create_test_config(&server.uri(), 2, &db_path);
    let summary = run_harvest(config, "test-hash", CancelToken::new())
        .await
        .expect("harvest should complete");

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.pages_failed, 0);
    assert_eq!(summary.entries_discovered, 2);
    assert_eq!(summary.entries_enriched, 2);
    assert_eq!(summary.records_written, 2);
    assert!(!summary.has_partial_failures());

    // Verify stored records
    let mut store = SqliteStore::new(&db_path).expect("open db");
    store.ensure_schema().expect("schema");
    assert_eq!(store.count_schools().unwrap(), 2);

    let zagreb_url = format!("{}/node/1", server.uri());
    let zagreb = store
        .get_school_by_source_url(&zagreb_url)
        .unwrap()
        .expect("zagreb stored");
    assert_eq!(zagreb.record.name, "Zagreb School of Economics");
    assert_eq!(zagreb.record.country.as_deref(), Some("克羅埃西亞"));
    assert_eq!(zagreb.record.exchange_quota, Some(4));
    assert!(zagreb
        .record
        .description
        .as_deref()
        .unwrap()
        .contains("leading regional business school"));
    assert_eq!(
        zagreb.record.official_website.as_deref(),
        Some("https://www.zsem.hr/en")
    );
    assert!(zagreb
        .record
        .location_info
        .as_deref()
        .unwrap()
        .contains("main campus"));

    // Run row reflects a clean completion
    let run = store.get_latest_run().unwrap().expect("run recorded");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.records_written, 2);
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_failing_listing_page_does_not_abort_the_walk() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().expect("tempdir");
    let db_path = tmp.path().join("atlas.db");

    // Page 2 (query page=1) always answers 500; retries are exhausted
    Mock::given(method("GET"))
        .and(path("/school-list"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    // Page 3 (query page=2) works
    Mock::given(method("GET"))
        .and(path("/school-list"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&[listing_row(
                    3,
                    "Third Page College",
                    "Country: France City: Lyon Quota: 1 Master",
                )]))
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    mount_html(
        &server,
        "/school-list",
        listing_page(&[listing_row(
            1,
            "First Page College",
            "Country: Spain City: Madrid Quota: 3 Bachelor",
        )]),
    )
    .await;

    mount_html(&server, "/node/1", detail_page("First page detail text goes here, long enough.", "https://first.example.org")).await;
    mount_html(&server, "/node/3", detail_page("Third page detail text goes here, long enough.", "https://third.example.org")).await;

    let config = create_test_config(&server.uri(), 3, &db_path);
    let summary = run_harvest(config, "test-hash", CancelToken::new())
        .await
        .expect("partial failures must not be fatal");

    // One failed page, the other two processed
    assert_eq!(summary.pages_failed, 1);
    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.records_written, 2);
    assert!(summary.has_partial_failures());

    let mut store = SqliteStore::new(&db_path).expect("open db");
    store.ensure_schema().expect("schema");
    assert_eq!(store.count_schools().unwrap(), 2);

    let run = store.get_latest_run().unwrap().expect("run recorded");
    assert_eq!(run.status, RunStatus::CompletedWithFailures);
}

#[tokio::test]
async fn test_detail_without_description_still_persists() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().expect("tempdir");
    let db_path = tmp.path().join("atlas.db");

    mount_html(
        &server,
        "/school-list",
        listing_page(&[listing_row(
            7,
            "Sparse Detail University",
            "Country: Norway City: Bergen Quota: 2 Master",
        )]),
    )
    .await;

    // Detail page with no recognizable description or website
    mount_html(
        &server,
        "/node/7",
        "<html><body><div>nothing useful</div></body></html>".to_string(),
    )
    .await;

    let config = create_test_config(&server.uri(), 1, &db_path);
    let summary = run_harvest(config, "test-hash", CancelToken::new())
        .await
        .expect("harvest should complete");

    assert_eq!(summary.records_written, 1);
    // Extraction gaps are notes, not failures
    assert!(!summary.notes.is_empty());

    let mut store = SqliteStore::new(&db_path).expect("open db");
    store.ensure_schema().expect("schema");

    let stored = store
        .get_school_by_source_url(&format!("{}/node/7", server.uri()))
        .unwrap()
        .expect("record stored despite sparse detail page");
    assert_eq!(stored.record.name, "Sparse Detail University");
    assert_eq!(stored.record.country.as_deref(), Some("Norway"));
    assert_eq!(stored.record.city.as_deref(), Some("Bergen"));
    assert_eq!(stored.record.description, None);
    assert_eq!(stored.record.official_website, None);
}

#[tokio::test]
async fn test_rerunning_the_harvest_is_idempotent() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().expect("tempdir");
    let db_path = tmp.path().join("atlas.db");

    mount_html(
        &server,
        "/school-list",
        listing_page(&[listing_row(
            1,
            "Stable University",
            "Country: Japan City: Osaka Quota: 5 Bachelor Master",
        )]),
    )
    .await;
    mount_html(
        &server,
        "/node/1",
        detail_page(
            "Stable University has run the same exchange program for decades.",
            "https://stable.example.ac.jp",
        ),
    )
    .await;

    let first = run_harvest(
        create_test_config(&server.uri(), 1, &db_path),
        "test-hash",
        CancelToken::new(),
    )
    .await
    .expect("first harvest");
    assert_eq!(first.records_written, 1);

    let (before, created_before) = {
        let mut store = SqliteStore::new(&db_path).expect("open db");
        store.ensure_schema().expect("schema");
        let stored = store
            .get_school_by_source_url(&format!("{}/node/1", server.uri()))
            .unwrap()
            .unwrap();
        (stored.record, stored.created_at)
    };

    let second = run_harvest(
        create_test_config(&server.uri(), 1, &db_path),
        "test-hash",
        CancelToken::new(),
    )
    .await
    .expect("second harvest");
    assert_eq!(second.records_written, 1);

    let mut store = SqliteStore::new(&db_path).expect("open db");
    store.ensure_schema().expect("schema");

    // Still one row, business fields unchanged, creation timestamp kept
    assert_eq!(store.count_schools().unwrap(), 1);
    let stored = store
        .get_school_by_source_url(&format!("{}/node/1", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(stored.record, before);
    assert_eq!(stored.created_at, created_before);
}

#[tokio::test]
async fn test_complementary_duplicates_merge_across_pages() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().expect("tempdir");
    let db_path = tmp.path().join("atlas.db");

    // The same school appears on both pages: page 1 knows its image,
    // page 2 knows its quota.
    Mock::given(method("GET"))
        .and(path("/school-list"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&[listing_row(
                    9,
                    "Twice Listed University",
                    "Country: Italy Quota: 6 Master",
                )]))
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    mount_html(
        &server,
        "/school-list",
        listing_page(&[r#"<tr><td><h3><a href="/node/9">Twice Listed University</a></h3>
               <img src="/img/twice.jpg"> Country: Italy Bachelor</td></tr>"#
            .to_string()]),
    )
    .await;

    mount_html(
        &server,
        "/node/9",
        detail_page(
            "Twice Listed University appears on two listing pages at once.",
            "https://twice.example.it",
        ),
    )
    .await;

    let config = create_test_config(&server.uri(), 2, &db_path);
    let summary = run_harvest(config, "test-hash", CancelToken::new())
        .await
        .expect("harvest should complete");

    assert_eq!(summary.entries_discovered, 2);
    assert_eq!(summary.duplicates_merged, 1);
    assert_eq!(summary.records_written, 1);
    // The detail page is fetched once for the merged entry
    assert_eq!(summary.entries_enriched, 1);

    let mut store = SqliteStore::new(&db_path).expect("open db");
    store.ensure_schema().expect("schema");

    let stored = store
        .get_school_by_source_url(&format!("{}/node/9", server.uri()))
        .unwrap()
        .expect("merged record stored");
    // Both complementary fields survived the merge
    assert!(stored.record.image_url.as_deref().unwrap().ends_with("/img/twice.jpg"));
    assert_eq!(stored.record.exchange_quota, Some(6));
    assert_eq!(stored.record.degree_types.len(), 2);
}

#[tokio::test]
async fn test_unreachable_store_is_fatal_before_any_fetching() {
    let server = MockServer::start().await;

    // The listing must never be requested when the store cannot be opened
    Mock::given(method("GET"))
        .and(path("/school-list"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let bad_db = Path::new("/nonexistent-dir/atlas.db");
    let config = create_test_config(&server.uri(), 3, bad_db);

    let result = run_harvest(config, "test-hash", CancelToken::new()).await;

    assert!(result.is_err());
    let error = result.unwrap_err();
    assert!(error.is_fatal(), "store failure at startup must be fatal");
}
