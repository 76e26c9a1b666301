//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use sitegrove::config::{Config, CrawlerConfig, FetchConfig, RenderMode, SitemapFormat};
use sitegrove::crawler::{
    CrawlBudget, CrawlEngine, FetchDispatcher, FetchError, FetchMethod, HttpFetcher,
    PageMetadata, RenderFetch, RenderedPage,
};
use sitegrove::output::render_sitemap;
use sitegrove::storage::{persist_report, SqliteStorage, Storage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with short delays and no browser
fn create_test_config(max_depth: u32, max_pages: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_depth,
            max_pages,
            page_timeout_ms: 5_000,
            max_retries: 2,
            politeness_delay_ms: 10, // Very short for testing
            retry_base_delay_ms: 10,
            max_children_per_page: 10,
        },
        fetch: FetchConfig {
            request_timeout_ms: 2_000,
            transport_retries: 0,
            render_mode: RenderMode::Never,
            ..FetchConfig::default()
        },
        ..Config::default()
    }
}

/// A server-rendered page with enough visible text to skip the browser
fn html_page(title: &str, links: &[&str], extra: &str) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!("<a href=\"{}\">{}</a>\n", href, href))
        .collect();
    let text = "Plenty of ordinary server rendered prose fills this paragraph. ".repeat(6);
    format!(
        "<html><head><title>{}</title></head><body><h1>{}</h1><p>{}</p>{}{}</body></html>",
        title, title, text, anchors, extra
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_same_origin_crawl_with_depth_limit() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        html_page(
            "Home",
            &["/a", "/b", "/c", "https://elsewhere.example/offsite"],
            "",
        ),
    )
    .await;
    for (route, title) in [("/a", "A"), ("/b", "B"), ("/c", "C")] {
        // Depth 2 links must never be followed with max depth 1
        mount_page(&mock_server, route, html_page(title, &["/deeper"], "")).await;
    }

    let config = create_test_config(1, 5);
    let seed = format!("{}/", base_url);
    let report = sitegrove::crawl(&seed, &config).await.unwrap();

    assert_eq!(report.successful, 4);
    assert_eq!(report.failed, 0);
    assert_eq!(report.max_depth_reached, 1);
    assert!(report
        .pages
        .iter()
        .all(|p| !p.url.contains("elsewhere.example") && !p.url.ends_with("/deeper")));
    assert!(report
        .pages
        .iter()
        .all(|p| p.method == Some(FetchMethod::Lightweight)));

    // Discovery order is depth-first in document order
    let urls = report.successful_urls();
    assert_eq!(
        urls,
        vec![
            format!("{}/", base_url),
            format!("{}/a", base_url),
            format!("{}/b", base_url),
            format!("{}/c", base_url),
        ]
    );

    let home = &report.pages[0];
    assert_eq!(home.metadata.title.as_deref(), Some("Home"));
    assert!(home
        .links
        .contains(&"https://elsewhere.example/offsite".to_string()));

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != "/deeper"));

    let xml = render_sitemap(&report, SitemapFormat::Xml);
    assert_eq!(xml.matches("<loc>").count(), 4);
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let mock_server = MockServer::start().await;

    // Registered first, so it answers the first two requests
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/", html_page("Recovered", &[], "")).await;

    let config = create_test_config(1, 5);
    let seed = format!("{}/", mock_server.uri());
    let report = sitegrove::crawl(&seed, &config).await.unwrap();

    assert_eq!(report.total, 1);
    assert_eq!(report.successful, 1);
    assert_eq!(report.pages[0].retry_count, 2);
    assert_eq!(report.pages[0].status, Some(200));

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_permanent_failures_are_recorded() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", html_page("Home", &["/missing", "/broken"], "")).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let config = create_test_config(1, 10);
    let seed = format!("{}/", mock_server.uri());
    let report = sitegrove::crawl(&seed, &config).await.unwrap();

    assert_eq!(report.successful, 1);
    assert_eq!(report.failed, 2);

    let breakdown = report.error_breakdown();
    assert_eq!(breakdown.get("http_404"), Some(&1));
    assert_eq!(breakdown.get("http_503"), Some(&1));

    // 404 is terminal, 503 exhausts max_retries + 1 attempts
    let requests = mock_server.received_requests().await.unwrap();
    let count = |p: &str| requests.iter().filter(|r| r.url.path() == p).count();
    assert_eq!(count("/missing"), 1);
    assert_eq!(count("/broken"), 3);
}

#[tokio::test]
async fn test_invalid_seed_aborts_run() {
    let config = create_test_config(1, 5);
    let result = sitegrove::crawl("not a url", &config).await;
    assert!(matches!(
        result,
        Err(sitegrove::SitegroveError::InvalidSeed { .. })
    ));
}

#[tokio::test]
async fn test_invalid_config_rejected_before_crawl() {
    let mock_server = MockServer::start().await;
    let mut config = create_test_config(1, 5);
    config.crawler.max_pages = 0;

    let seed = format!("{}/", mock_server.uri());
    let result = sitegrove::crawl(&seed, &config).await;

    assert!(matches!(result, Err(sitegrove::SitegroveError::Config(_))));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sitemap_omits_fragments() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", html_page("Home", &["/about#team"], "")).await;
    mount_page(&mock_server, "/about", html_page("About", &[], "")).await;

    let config = create_test_config(1, 5);
    let seed = format!("{}/", mock_server.uri());
    let report = sitegrove::crawl(&seed, &config).await.unwrap();
    assert_eq!(report.successful, 2);

    let xml = render_sitemap(&report, SitemapFormat::Xml);
    assert!(xml.contains(&format!("<loc>{}/about</loc>", mock_server.uri())));
    assert!(!xml.contains('#'));
}

/// Browser stand-in that records how often it was used
#[derive(Clone, Default)]
struct StubBrowser {
    renders: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl RenderFetch for StubBrowser {
    type Handle = ();

    async fn launch(&self) -> Result<(), FetchError> {
        Ok(())
    }

    async fn render(&self, url: &Url, _shared: Option<&()>) -> Result<RenderedPage, FetchError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        Ok(RenderedPage {
            final_url: url.clone(),
            html: "<html><body><div id=\"__next\">hydrated</div></body></html>".to_string(),
            links: Vec::new(),
            metadata: PageMetadata {
                title: Some("Hydrated".to_string()),
                ..PageMetadata::default()
            },
            duration: Duration::from_millis(3),
        })
    }

    async fn close(&self, _handle: ()) -> Result<(), FetchError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_framework_page_is_rendered() {
    let mock_server = MockServer::start().await;

    let next_data = r#"<script id="__NEXT_DATA__" type="application/json">{"props":{}}</script>"#;
    mount_page(&mock_server, "/", html_page("Shell", &[], next_data)).await;

    let mut config = create_test_config(1, 5);
    config.fetch.render_mode = RenderMode::Auto;

    let browser = StubBrowser::default();
    let dispatcher = FetchDispatcher::with_renderer(
        HttpFetcher::new(&config.fetch).unwrap(),
        browser.clone(),
        &config.fetch,
    );
    let mut engine = CrawlEngine::new(dispatcher, CrawlBudget::from_config(&config.crawler));

    let seed = format!("{}/", mock_server.uri());
    let report = engine.run(&seed).await.unwrap();

    assert_eq!(report.successful, 1);
    let page = &report.pages[0];
    assert_eq!(page.method, Some(FetchMethod::Render));
    assert_eq!(page.status, Some(200));
    assert_eq!(page.metadata.title.as_deref(), Some("Hydrated"));
    assert_eq!(report.rendered_count(), 1);
    assert_eq!(browser.renders.load(Ordering::SeqCst), 1);
    assert_eq!(browser.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_crawl_persisted_to_history() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", html_page("Home", &["/about"], "")).await;
    mount_page(&mock_server, "/about", html_page("About", &[], "")).await;

    let config = create_test_config(1, 5);
    let seed = format!("{}/", mock_server.uri());
    let report = sitegrove::crawl(&seed, &config).await.unwrap();

    let dir = tempfile::TempDir::new().unwrap();
    let mut storage = SqliteStorage::new(&dir.path().join("history.db")).unwrap();
    let id = persist_report(&mut storage, &report, "test-hash", 1234).unwrap();

    let stored = storage.get_crawl(id).unwrap();
    assert_eq!(stored.start_url, seed);
    assert_eq!(stored.successful_pages, 2);
    assert_eq!(stored.output_size_bytes, 1234);
    assert_eq!(stored.pages[1].title.as_deref(), Some("About"));

    let history = storage.list_crawls(10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, id);
}
