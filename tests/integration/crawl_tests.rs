//! Integration tests for the crawler and watch runs
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl and change-detection cycle end-to-end.

use driftwatch::config::{parse_config, Config};
use driftwatch::content::hash_content;
use driftwatch::crawler::{build_loader, crawl, CrawlConfig, CrawlOutput};
use driftwatch::output::generate_change_report;
use driftwatch::storage::{open_storage, SnapshotStore, SqliteStorage, Storage};
use driftwatch::watch::run_watch;
use driftwatch::FetchError;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with one target at `target_url`
fn create_test_config(target_url: &str, max_pages: usize, db_path: &str, extra: &str) -> Config {
    parse_config(&format!(
        r#"
[crawler]
max-pages = {max_pages}
tracking-max-pages = 2
scroll-settle-ms = 0
page-timeout-secs = 5
max-concurrent-crawls = 2

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
database-path = "{db_path}"
report-path = "report.md"

[[target]]
name = "Acme"
url = "{target_url}"
{extra}
"#
    ))
    .expect("test config should be valid")
}

async fn mount_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html.to_string(), "text/html"))
        .mount(server)
        .await;
}

async fn crawl_server(server: &MockServer, max_pages: usize) -> CrawlOutput {
    let config = create_test_config(&server.uri(), max_pages, "unused.db", "");
    let crawl_config = CrawlConfig::new(&server.uri(), max_pages).unwrap();

    crawl(&crawl_config, &config.crawler, &config.user_agent)
        .await
        .expect("http loader should start")
}

fn sorted_keys(output: &CrawlOutput) -> Vec<String> {
    let mut keys: Vec<String> = output.text_map().into_keys().collect();
    keys.sort();
    keys
}

#[tokio::test]
async fn test_crawl_start_and_two_internal_links() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><body><h1>Home</h1><a href="/x">X</a><a href="/y">Y</a></body></html>"#,
    )
    .await;
    mount_page(&server, "/x", "<html><body><p>Page X</p></body></html>").await;
    mount_page(&server, "/y", "<html><body><p>Page Y</p></body></html>").await;

    let output = crawl_server(&server, 10).await;

    assert_eq!(
        sorted_keys(&output),
        vec![format!("{}/", base), format!("{}/x", base), format!("{}/y", base)]
    );
    assert_eq!(output.text_map()[&format!("{}/x", base)], "Page X");
    assert!(output.failures.is_empty());
}

#[tokio::test]
async fn test_mailto_link_not_followed() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<html><body><a href="mailto:info@a.test">Mail us</a></body></html>"#,
    )
    .await;

    let output = crawl_server(&server, 10).await;

    assert_eq!(output.len(), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_page_budget_of_one() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<a href="/1">1</a><a href="/2">2</a><a href="/3">3</a><a href="/4">4</a>"#,
    )
    .await;
    for route in ["/1", "/2", "/3", "/4"] {
        mount_page(&server, route, "<p>leaf</p>").await;
    }

    let output = crawl_server(&server, 1).await;

    assert_eq!(sorted_keys(&output), vec![format!("{}/", server.uri())]);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_other_host_never_crawled() {
    let server = MockServer::start().await;
    let port = url::Url::parse(&server.uri()).unwrap().port().unwrap();

    // Same server, reached through a different host name
    mount_page(
        &server,
        "/",
        &format!(
            r#"<a href="http://localhost:{}/elsewhere">Elsewhere</a><a href="/here">Here</a>"#,
            port
        ),
    )
    .await;
    mount_page(&server, "/here", "<p>here</p>").await;
    mount_page(&server, "/elsewhere", "<p>elsewhere</p>").await;

    let output = crawl_server(&server, 10).await;

    assert_eq!(output.len(), 2);
    assert!(output.pages.iter().all(|p| !p.url.contains("elsewhere")));
}

#[tokio::test]
async fn test_failing_pages_leave_partial_results() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<a href="/ok">Ok</a><a href="/missing">Missing</a><a href="/broken">Broken</a><a href="/file">File</a>"#,
    )
    .await;
    mount_page(&server, "/ok", "<p>fine</p>").await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/file"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.4", "application/pdf"))
        .mount(&server)
        .await;

    let output = crawl_server(&server, 10).await;

    assert_eq!(output.len(), 2);
    assert_eq!(output.failures.len(), 3);
    assert!(output
        .failures
        .iter()
        .any(|f| matches!(f.error, FetchError::Http { status: 404, .. })));
    assert!(output
        .failures
        .iter()
        .any(|f| matches!(f.error, FetchError::Http { status: 500, .. })));
    assert!(output
        .failures
        .iter()
        .any(|f| matches!(f.error, FetchError::ContentMismatch { .. })));
}

#[tokio::test]
async fn test_directory_redirect_keeps_relative_links() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/docs/"))
        .mount(&server)
        .await;
    mount_page(&server, "/docs/", r#"<p>Docs</p><a href="intro">Intro</a>"#).await;
    mount_page(&server, "/docs/intro", "<p>Getting started</p>").await;

    let config = create_test_config(&base, 10, "unused.db", "");
    let crawl_config = CrawlConfig::new(&format!("{}/docs/", base), 10).unwrap();
    let output = crawl(&crawl_config, &config.crawler, &config.user_agent)
        .await
        .unwrap();

    // Results stay keyed by the normalized requested URL
    assert_eq!(
        sorted_keys(&output),
        vec![format!("{}/docs", base), format!("{}/docs/intro", base)]
    );
    assert_eq!(output.text_map()[&format!("{}/docs/intro", base)], "Getting started");
    assert!(output.failures.is_empty());
}

#[tokio::test]
async fn test_noise_does_not_change_hash() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<html><head><script>var t = 1;</script></head><body><p>Same   text</p><a href="/b">b</a></body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/b",
        r#"<html><head><script>var t = 2;</script><style>p{}</style></head><body><p>Same text</p><a href="/">b</a></body></html>"#,
    )
    .await;

    let output = crawl_server(&server, 10).await;

    assert_eq!(output.len(), 2);
    assert_eq!(output.pages[0].content_hash, output.pages[1].content_hash);
}

#[tokio::test]
async fn test_watch_run_baselines_then_reports_changes() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("watch.db");
    let config = create_test_config(&base, 10, &db_path.display().to_string(), "");

    mount_page(&server, "/", r#"<a href="/pricing">Pricing</a><a href="/about">About</a>"#).await;
    mount_page(&server, "/pricing", "<p>Basic</p><p>$10</p>").await;
    mount_page(&server, "/about", "<p>About Acme</p>").await;

    let storage = Arc::new(Mutex::new(open_storage(&db_path).unwrap()));
    let loader = build_loader(&config.crawler, &config.user_agent).await.unwrap();

    // First run: every page is new and silently baselined
    let first = run_watch(&config, "hash-1", loader.clone(), storage.clone())
        .await
        .unwrap();
    assert_eq!(first.targets.len(), 1);
    assert_eq!(first.targets[0].pages_crawled, 3);
    assert_eq!(first.targets[0].baselined, 3);
    assert_eq!(first.total_changes(), 0);

    // Second run: pricing changed
    server.reset().await;
    mount_page(&server, "/", r#"<a href="/pricing">Pricing</a><a href="/about">About</a>"#).await;
    mount_page(&server, "/pricing", "<p>Basic</p><p>$12</p>").await;
    mount_page(&server, "/about", "<p>About Acme</p>").await;

    let second = run_watch(&config, "hash-1", loader.clone(), storage.clone())
        .await
        .unwrap();
    let target = &second.targets[0];
    assert_eq!(target.unchanged, 2);
    assert_eq!(target.changes.len(), 1);

    let change = &target.changes[0];
    assert_eq!(change.url, format!("{}/pricing", base));
    assert!(change.diff.contains("-Basic $10"));
    assert!(change.diff.contains("+Basic $12"));

    {
        let store = storage.lock().unwrap();
        assert_eq!(store.count_runs().unwrap(), 2);
        assert_eq!(store.count_changes().unwrap(), 1);
        assert_eq!(store.get_changes_for_run(second.run_id).unwrap().len(), 1);
        let snapshot = store
            .get_snapshot(&format!("{}/pricing", base))
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.raw_text, "Basic $12");
    }

    let report_path = dir.path().join("report.md");
    generate_change_report(&second, "hash-1", &report_path).unwrap();
    let report = std::fs::read_to_string(&report_path).unwrap();
    assert!(report.contains("```diff"));
    assert!(report.contains("+Basic $12"));

    loader.shutdown().await;
}

#[tokio::test]
async fn test_watch_run_first_sighting_report() {
    let server = MockServer::start().await;
    let config = create_test_config(
        &server.uri(),
        10,
        "unused.db",
        "\n[changes]\nfirst-sighting = \"report\"",
    );

    mount_page(&server, "/", "<p>Launch day</p>").await;

    let storage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
    let loader = build_loader(&config.crawler, &config.user_agent).await.unwrap();

    let report = run_watch(&config, "hash", loader, storage).await.unwrap();

    assert_eq!(report.total_changes(), 1);
    let target = &report.targets[0];
    assert_eq!(target.changes[0].previous_hash, hash_content(""));
    assert!(target.changes[0].diff.contains("+Launch day"));
    assert!(target.is_first_sighting(&target.changes[0].url));
}

#[tokio::test]
async fn test_tracking_url_crawled_as_own_job() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", "<p>Home</p>").await;
    mount_page(
        &server,
        "/careers",
        r#"<p>Careers</p><a href="/careers/eng">Eng</a><a href="/careers/ops">Ops</a>"#,
    )
    .await;
    mount_page(&server, "/careers/eng", "<p>Eng</p>").await;
    mount_page(&server, "/careers/ops", "<p>Ops</p>").await;

    let config = create_test_config(
        &base,
        10,
        "unused.db",
        &format!(r#"tracking-urls = ["{}/careers"]"#, base),
    );

    let storage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
    let loader = build_loader(&config.crawler, &config.user_agent).await.unwrap();
    let report = run_watch(&config, "hash", loader, storage.clone()).await.unwrap();

    // Main job sees only the home page; the tracking job stops at its budget of 2
    assert_eq!(report.targets[0].pages_crawled, 3);
    assert_eq!(storage.lock().unwrap().count_snapshots().unwrap(), 3);
}

#[tokio::test]
async fn test_page_shared_by_main_and_tracking_jobs_counted_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<p>Home</p><a href="/careers">Careers</a>"#).await;
    mount_page(&server, "/careers", "<p>Careers</p>").await;

    let config = create_test_config(
        &base,
        10,
        "unused.db",
        &format!(
            "tracking-urls = [\"{}/careers\"]\n\n[changes]\nfirst-sighting = \"report\"",
            base
        ),
    );

    let storage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
    let loader = build_loader(&config.crawler, &config.user_agent).await.unwrap();
    let report = run_watch(&config, "hash", loader, storage.clone()).await.unwrap();

    let target = &report.targets[0];
    assert_eq!(target.pages_crawled, 2);
    assert_eq!(target.changes.len(), 2);
    assert_eq!(storage.lock().unwrap().count_changes().unwrap(), 2);
}
