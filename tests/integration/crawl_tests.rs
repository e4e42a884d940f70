//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end through `CrawlService`.

use std::sync::Arc;
use std::time::Duration;
use sumi_scrape::config::{CrawlConfig, UserAgentConfig};
use sumi_scrape::crawler::{build_http_client, CrawlHandle, HtmlExtractor, HttpFetcher};
use sumi_scrape::output::{write_markdown_report, PageErrorKind};
use sumi_scrape::progress::TrackerError;
use sumi_scrape::storage::{open_history, HistoryStore};
use sumi_scrape::{
    CrawlRequest, CrawlResult, CrawlService, CrawlStatus, ProgressTracker, ScrapeError, SessionId,
};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a service backed by the real HTTP fetcher
fn create_test_service() -> CrawlService {
    let client = build_http_client(&UserAgentConfig::default()).expect("Failed to build client");
    CrawlService::new(
        ProgressTracker::new(),
        Arc::new(HttpFetcher::new(client, 512 * 1024)),
        Arc::new(HtmlExtractor::new()),
        Vec::new(),
    )
}

/// Creates a request with no politeness delay and short timeouts
fn create_test_request(seed: &str) -> CrawlRequest {
    let config = CrawlConfig {
        inter_page_delay_ms: 0,
        page_timeout_secs: 2,
        safety_buffer_secs: 5,
        time_budget_secs: 30,
        ..CrawlConfig::default()
    };
    CrawlRequest::from_config(Url::parse(seed).expect("Invalid seed"), &config)
}

fn html(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, body
        ),
        "text/html",
    )
}

async fn mount_page(server: &MockServer, page: &str, title: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(title, body))
        .mount(server)
        .await;
}

async fn run(service: &CrawlService, request: CrawlRequest) -> CrawlResult {
    let handle: CrawlHandle = service
        .start(SessionId::new("test"), request)
        .expect("Failed to start crawl");
    handle.wait().await
}

fn page_paths(result: &CrawlResult) -> Vec<String> {
    result
        .pages
        .iter()
        .map(|page| Url::parse(&page.url).expect("Invalid page URL").path().to_string())
        .collect()
}

async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect()
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        "Home",
        r#"<p>Welcome home</p>
        <a href="/page1">Page 1</a>
        <a href="/page2">Page 2</a>
        <img src="/logo.png" alt="Logo">"#,
    )
    .await;
    mount_page(&mock_server, "/page1", "Page 1", r#"<p>First</p><a href="/">Home</a>"#).await;
    mount_page(&mock_server, "/page2", "Page 2", "<p>Second</p>").await;

    let service = create_test_service();
    let result = run(&service, create_test_request(&mock_server.uri())).await;

    assert_eq!(result.status, CrawlStatus::Completed);
    assert!(!result.truncated);
    assert_eq!(page_paths(&result), vec!["/", "/page1", "/page2"]);
    assert_eq!(result.site_title(), "Home");
    assert!(result.pages[0].text.contains("Welcome home"));

    assert_eq!(result.images.len(), 1);
    assert_eq!(result.images[0].alt_text, "Logo");
    assert!(result.links.iter().all(|link| !link.external));

    // Each page was requested exactly once
    let mut requested = requested_paths(&mock_server).await;
    requested.sort();
    assert_eq!(requested, vec!["/", "/page1", "/page2"]);

    let progress = service.tracker().read(&SessionId::new("test"));
    assert_eq!(progress.status, CrawlStatus::Completed);
    assert_eq!(progress.pages_fetched, 3);
}

#[tokio::test]
async fn test_depth_limit_respected() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", "Root", r#"<a href="/a">A</a>"#).await;
    mount_page(&mock_server, "/a", "A", r#"<a href="/b">B</a>"#).await;
    mount_page(&mock_server, "/b", "B", r#"<a href="/c">C</a>"#).await;
    mount_page(&mock_server, "/c", "C", "<p>Too deep</p>").await;

    let mut request = create_test_request(&mock_server.uri());
    request.max_depth = 2;

    let result = run(&create_test_service(), request).await;

    assert_eq!(result.status, CrawlStatus::Completed);
    assert_eq!(page_paths(&result), vec!["/", "/a", "/b"]);
    assert_eq!(result.pages[2].depth, 2);

    // The link to /c is collected, the page is not fetched
    assert!(result.links.iter().any(|link| link.url.ends_with("/c")));
    assert!(!requested_paths(&mock_server).await.contains(&"/c".to_string()));
}

#[tokio::test]
async fn test_single_page_budget() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        "Root",
        r#"<a href="/a">A</a><a href="/b">B</a>"#,
    )
    .await;

    let mut request = create_test_request(&mock_server.uri());
    request.max_pages = 1;

    let result = run(&create_test_service(), request).await;

    assert_eq!(result.status, CrawlStatus::Completed);
    assert!(result.truncated);
    assert_eq!(result.pages.len(), 1);
    assert_eq!(result.links.len(), 2);
    assert_eq!(requested_paths(&mock_server).await, vec!["/"]);
}

#[tokio::test]
async fn test_missing_page_does_not_stop_crawl() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        "Root",
        r#"<a href="/missing">Missing</a><a href="/ok">OK</a>"#,
    )
    .await;
    mount_page(&mock_server, "/ok", "OK", "<p>Fine</p>").await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let result = run(&create_test_service(), create_test_request(&mock_server.uri())).await;

    assert_eq!(result.status, CrawlStatus::Completed);
    assert_eq!(page_paths(&result), vec!["/", "/ok"]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, PageErrorKind::HttpStatus);
    assert_eq!(result.errors[0].status_code, Some(404));
    assert!(result.succeeded());
}

#[tokio::test]
async fn test_external_links_recorded_not_fetched() {
    let mock_server = MockServer::start().await;
    let port = mock_server.address().port();

    // `localhost` is a different site from `127.0.0.1`, even on the same server
    mount_page(
        &mock_server,
        "/",
        "Root",
        &format!(
            r#"<a href="http://localhost:{}/elsewhere">Elsewhere</a><a href="/local">Local</a>"#,
            port
        ),
    )
    .await;
    mount_page(&mock_server, "/local", "Local", "<p>Local</p>").await;
    mount_page(&mock_server, "/elsewhere", "Elsewhere", "<p>Off site</p>").await;

    let result = run(&create_test_service(), create_test_request(&mock_server.uri())).await;

    assert_eq!(page_paths(&result), vec!["/", "/local"]);
    assert_eq!(result.external_link_count(), 1);

    let external = result
        .links
        .iter()
        .find(|link| link.external)
        .expect("external link missing");
    assert_eq!(external.anchor_text, "Elsewhere");
    assert!(!requested_paths(&mock_server)
        .await
        .contains(&"/elsewhere".to_string()));
}

#[tokio::test]
async fn test_slow_page_times_out() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        "Root",
        r#"<a href="/slow">Slow</a><a href="/fast">Fast</a>"#,
    )
    .await;
    mount_page(&mock_server, "/fast", "Fast", "<p>Quick</p>").await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("Slow", "<p>Late</p>").set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let mut request = create_test_request(&mock_server.uri());
    request.page_timeout = Duration::from_millis(300);
    request.safety_buffer = Duration::from_secs(1);
    request.time_budget = Duration::from_secs(10);

    let result = run(&create_test_service(), request).await;

    assert_eq!(result.status, CrawlStatus::Completed);
    assert_eq!(page_paths(&result), vec!["/", "/fast"]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, PageErrorKind::Timeout);
    assert!(result.elapsed < Duration::from_secs(3));
}

#[tokio::test]
async fn test_redirect_followed() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", "Root", r#"<a href="/old">Old</a>"#).await;
    mount_page(&mock_server, "/new", "New", "<p>Moved here</p>").await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&mock_server)
        .await;

    let result = run(&create_test_service(), create_test_request(&mock_server.uri())).await;

    assert_eq!(page_paths(&result), vec!["/", "/new"]);
    assert_eq!(result.page_text(&result.pages[1].url), Some("Moved here"));
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn test_unreachable_seed_is_not_a_success() {
    // Bind then drop a server to get a port nothing listens on
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };

    let result = run(&create_test_service(), create_test_request(&uri)).await;

    assert!(result.pages.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, PageErrorKind::ConnectionError);
    assert!(!result.succeeded());
}

#[tokio::test]
async fn test_second_crawl_for_session_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("Root", "<p>Slow root</p>").set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let service = create_test_service();
    let session = SessionId::new("user-1");

    let first = service
        .start(session.clone(), create_test_request(&mock_server.uri()))
        .expect("Failed to start crawl");
    assert!(service.tracker().is_running(&session));

    let second = service.start(session.clone(), create_test_request(&mock_server.uri()));
    assert!(matches!(
        second,
        Err(ScrapeError::Tracker(TrackerError::AlreadyRunning(_)))
    ));

    let result = first.wait().await;
    assert_eq!(result.status, CrawlStatus::Completed);
    assert_eq!(result.pages.len(), 1);

    // Finished sessions can crawl again
    let third = service
        .start(session, create_test_request(&mock_server.uri()))
        .expect("Failed to restart crawl");
    assert_eq!(third.wait().await.status, CrawlStatus::Completed);
}

#[tokio::test]
async fn test_abort_running_crawl() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", "Root", r#"<a href="/slow">Slow</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("Slow", "<p>Late</p>").set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let mut request = create_test_request(&mock_server.uri());
    request.page_timeout = Duration::from_secs(10);
    request.safety_buffer = Duration::from_secs(15);

    let service = create_test_service();
    let session = SessionId::new("user-1");
    let handle = service.start(session.clone(), request).expect("Failed to start crawl");

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(service.abort(&session));

    let result = handle.wait().await;
    assert_eq!(result.status, CrawlStatus::Aborted);
    assert!(result.truncated);
    assert_eq!(result.pages.len(), 1);
    assert!(result.elapsed < Duration::from_secs(5));

    assert!(!service.tracker().is_running(&session));
    assert!(!service.abort(&session));
}

#[tokio::test]
async fn test_history_recorded() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", "Recorded", "<p>Hello</p>").await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("history.db");

    let store = open_history(&db_path).expect("Failed to open history");
    let service = create_test_service().with_history(store, "abc123");

    let result = run(&service, create_test_request(&mock_server.uri())).await;
    assert!(result.succeeded());

    // Reopen to read what the service committed
    let store = open_history(&db_path).expect("Failed to reopen history");
    assert_eq!(store.count().expect("count failed"), 1);

    let recent = store.recent(5).expect("recent failed");
    let entry = &recent[0].entry;
    assert_eq!(entry.title, "Recorded");
    assert!(entry.success);
    assert_eq!(entry.status, CrawlStatus::Completed);
    assert_eq!(entry.pages_fetched, 1);
    assert_eq!(entry.config_hash, "abc123");
    assert!(entry.error_message.is_none());
}

#[tokio::test]
async fn test_markdown_report_written() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        "Report Site",
        r#"<p>Front page</p><a href="/about">About us</a><img src="/team.jpg" alt="Team">"#,
    )
    .await;
    mount_page(&mock_server, "/about", "About", "<p>About page</p>").await;

    let result = run(&create_test_service(), create_test_request(&mock_server.uri())).await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let report_path = temp_dir.path().join("report.md");
    write_markdown_report(&result, &report_path).expect("Failed to write report");

    let report = std::fs::read_to_string(&report_path).expect("Failed to read report");
    assert!(report.starts_with("# Report Site"));
    assert!(report.contains("About us"));
    assert!(report.contains("Team"));
    assert!(!report.contains("Partial results"));
}
