//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use crawldocs::config::Config;
use crawldocs::crawler::{crawl, CrawlOutcome, CrawlSession, LinkEvent, PageEvent};
use crawldocs::manifest::ManifestStore;
use crawldocs::resume::ResumeOverrides;
use crawldocs::state::{PageStatus, SessionStatus};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Single worker and no rate limit, so fetch order is deterministic
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.crawler.parallelism = 1;
    config.crawler.rate_limit = 0;
    config.crawler.timeout_seconds = 5;
    config.dedup.expected_items = 10_000;
    config.dedup.cache_capacity = 1_000;
    config
}

fn html_page(title: &str, links: &[&str], body: &str) -> String {
    let nav: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a> "#, href, href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body><nav>{}</nav><main><p>{}</p></main></body></html>",
        title, nav, body
    )
}

fn home_text() -> String {
    "This site documents the widget toolkit. Start with the guide to learn the basics. \
     Each section explains one part of the toolkit in depth."
        .to_string()
}

fn guide_text() -> String {
    "The guide walks through installing the toolkit and building a first widget. ".repeat(10)
}

async fn mount_html(server: &MockServer, route: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
        .mount(server)
        .await;
}

/// Mounts a small documentation site:
/// - `/` links to every other page and to an external host
/// - `/guide` and `/copy` serve the same article
/// - `/missing` is a 404, `/manual.pdf` is not HTML, `/short` is nearly empty
async fn mount_site(server: &MockServer) {
    let home = html_page(
        "Docs Home",
        &[
            "/guide",
            "/guide#top",
            "/copy",
            "/missing",
            "/manual.pdf",
            "/short",
            "https://elsewhere.example/page",
        ],
        &home_text(),
    );
    mount_html(server, "/", home).await;
    mount_html(server, "/guide", html_page("Guide", &["/"], &guide_text())).await;
    mount_html(server, "/copy", html_page("Guide (copy)", &["/"], &guide_text())).await;
    mount_html(server, "/short", html_page("Short", &[], "Soon")).await;

    Mock::given(method("GET"))
        .and(path("/manual.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

fn assert_full_site_recorded(base: &str, dir: &Path) {
    let store = ManifestStore::load(dir).unwrap();
    assert_eq!(store.status(), SessionStatus::Completed);

    let stats = store.statistics();
    assert_eq!(stats.total_pages, 6);
    assert_eq!(stats.successful_pages, 2);
    assert_eq!(stats.failed_pages, 1);
    assert_eq!(stats.skipped_pages, 3);
    assert_eq!(stats.duplicate_pages, 1);
    assert!(stats.is_consistent());

    let copy = store.page(&format!("{}/copy", base)).unwrap();
    assert!(copy.duplicate);
    assert_eq!(copy.duplicate_of, Some(format!("{}/guide", base)));

    let missing = store.page(&format!("{}/missing", base)).unwrap();
    assert_eq!(missing.status, PageStatus::Failed);
    assert_eq!(missing.error_message.as_deref(), Some("404 Not Found"));

    let pdf = store.page(&format!("{}/manual.pdf", base)).unwrap();
    assert_eq!(pdf.status, PageStatus::Skipped);
    assert!(pdf.error_message.unwrap().contains("application/pdf"));

    let short = store.page(&format!("{}/short", base)).unwrap();
    assert_eq!(short.error_message.as_deref(), Some("minimal content"));

    assert!(store.page("https://elsewhere.example/page").is_none());
    assert!(store.pending_queue().is_empty());

    let index = std::fs::read_to_string(dir.join("index.md")).unwrap();
    assert!(index.starts_with("# Docs Home\n\nSource: "));
    assert!(index.contains("widget toolkit"));
    assert!(dir.join("guide.md").exists());
    assert!(!dir.join("copy.md").exists());
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let base = mock_server.uri();

    let dir = TempDir::new().unwrap();
    let base_url = Url::parse(&base).unwrap();
    let session = Arc::new(
        CrawlSession::start(&base_url, dir.path(), &create_test_config(), None).unwrap(),
    );

    let report = crawl(session).await.unwrap();
    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(report.statistics.total_pages, 6);

    assert_full_site_recorded(&base, dir.path());
}

#[tokio::test]
async fn test_page_limit_completes_session() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config();
    config.crawler.max_pages = 1;
    let base_url = Url::parse(&mock_server.uri()).unwrap();
    let session = Arc::new(CrawlSession::start(&base_url, dir.path(), &config, None).unwrap());

    let report = crawl(Arc::clone(&session)).await.unwrap();
    assert!(session.limit_reached());
    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(report.statistics.successful_pages, 1);
    assert!(dir.path().join("index.md").exists());
}

#[tokio::test]
async fn test_interrupted_crawl_resumes_to_completion() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let base = mock_server.uri();

    let dir = TempDir::new().unwrap();
    let config = create_test_config();
    let base_url = Url::parse(&base).unwrap();

    // Stopped before the first fetch: only the base URL is queued
    let session = Arc::new(CrawlSession::start(&base_url, dir.path(), &config, None).unwrap());
    session.request_stop();
    let report = crawl(session).await.unwrap();
    assert_eq!(report.status, SessionStatus::Interrupted);
    assert_eq!(report.statistics.total_pages, 0);
    assert_eq!(report.pages_queued, 1);

    let resumed = Arc::new(
        CrawlSession::resume(dir.path(), &config, &ResumeOverrides::default()).unwrap(),
    );
    let report = crawl(resumed).await.unwrap();
    assert_eq!(report.status, SessionStatus::Completed);

    assert_full_site_recorded(&base, dir.path());
}

#[tokio::test]
async fn test_resume_does_not_refetch_recorded_pages() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html_page("Home", &[], &home_text()), "text/html"))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/guide"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html_page("Guide", &["/"], &guide_text()), "text/html"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config();
    let base_url = Url::parse(&base).unwrap();
    let guide_url = base_url.join("/guide").unwrap();

    // First run: the home page was handled, the guide only discovered
    let session = CrawlSession::start(&base_url, dir.path(), &config, None).unwrap();
    session
        .on_page(PageEvent::html(base_url.clone(), "Home", home_text()).with_links(vec![guide_url.clone()]))
        .await;
    assert!(session.on_link_discovered(&LinkEvent::new(guide_url.clone(), Some(base_url.to_string()), 1)));
    session.finish(CrawlOutcome::Interrupted).await.unwrap();

    let resumed = Arc::new(
        CrawlSession::resume(dir.path(), &config, &ResumeOverrides::default()).unwrap(),
    );
    let report = crawl(resumed).await.unwrap();

    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(report.statistics.successful_pages, 2);

    let store = ManifestStore::load(dir.path()).unwrap();
    let guide = store.page(guide_url.as_str()).unwrap();
    assert_eq!(guide.status, PageStatus::Completed);
    assert_eq!(guide.parent_url, Some(base_url.to_string()));
    assert_eq!(guide.depth, 1);
}
