//! Browser render fetcher
//!
//! Drives a real browser through a WebDriver endpoint so pages that build their
//! content with JavaScript can be crawled. One script evaluation pulls the
//! rendered HTML, anchor links and SEO metadata out of the live DOM.

use crate::config::FetchConfig;
use crate::crawler::error::{FetchError, TlsIssue};
use crate::crawler::parser::PageMetadata;
use fantoccini::error::CmdError;
use fantoccini::wd::{TimeoutConfiguration, WindowHandle};
use fantoccini::{Client, ClientBuilder};
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

const EXTRACT_SCRIPT: &str = r#"
const squash = (s) => (s || '').replace(/\s+/g, ' ').trim();
const description = document.querySelector('meta[name="description"]')
    || document.querySelector('meta[property="og:description"]');
const canonical = document.querySelector('link[rel="canonical"][href]');
const h1 = Array.from(document.querySelectorAll('h1')).map(el => squash(el.textContent)).find(Boolean);
const bodyText = document.body ? squash(document.body.innerText) : '';
const links = Array.from(document.querySelectorAll('a[href]:not([download])'))
    .map(a => a.href)
    .filter(href => /^https?:/i.test(href));
return {
    html: document.documentElement ? document.documentElement.outerHTML : '',
    links: Array.from(new Set(links)),
    title: squash(document.title) || null,
    description: description ? (squash(description.getAttribute('content')) || null) : null,
    canonical: canonical ? canonical.href : null,
    h1: h1 || null,
    wordCount: bodyText ? bodyText.split(' ').length : 0
};
"#;

/// A page rendered in the browser
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// URL the browser ended on
    pub final_url: Url,
    /// Serialized DOM after scripts ran
    pub html: String,
    /// Absolute anchor hrefs, deduplicated, document order
    pub links: Vec<String>,
    pub metadata: PageMetadata,
    pub duration: Duration,
}

/// What the extraction script returns
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DomSnapshot {
    html: String,
    #[serde(default)]
    links: Vec<String>,
    title: Option<String>,
    description: Option<String>,
    canonical: Option<String>,
    h1: Option<String>,
    word_count: Option<usize>,
}

impl DomSnapshot {
    fn into_page(self, final_url: Url, duration: Duration) -> RenderedPage {
        RenderedPage {
            final_url,
            html: self.html,
            links: self.links,
            metadata: PageMetadata {
                title: self.title,
                description: self.description,
                h1: self.h1,
                canonical: self.canonical,
                word_count: self.word_count,
            },
            duration,
        }
    }
}

/// An open WebDriver session
///
/// Shared by every render of one crawl run; closed once at the end.
#[derive(Debug, Clone)]
pub struct BrowserHandle {
    client: Client,
    main_window: WindowHandle,
}

impl BrowserHandle {
    /// Opens a session on the configured WebDriver endpoint
    pub async fn launch(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut builder = ClientBuilder::native();
        if let Some(caps) = browser_capabilities(config).as_object() {
            builder.capabilities(caps.clone());
        }

        let client = builder
            .connect(&config.webdriver_url)
            .await
            .map_err(|e| {
                FetchError::BrowserUnavailable(format!("{}: {}", config.webdriver_url, e))
            })?;

        // Navigation gives up inside the page budget instead of being cancelled mid-render
        let page_load = Duration::from_millis(config.page_load_timeout_ms);
        client
            .update_timeouts(TimeoutConfiguration::new(None, Some(page_load), None))
            .await
            .map_err(|e| FetchError::BrowserUnavailable(format!("setting timeouts: {}", e)))?;

        let main_window = client
            .window()
            .await
            .map_err(|e| FetchError::BrowserUnavailable(e.to_string()))?;

        debug!("Connected to WebDriver at {}", config.webdriver_url);
        Ok(Self { client, main_window })
    }

    /// Closes every tab except the main window and switches back to it
    ///
    /// A render cancelled by the page timeout never reaches its own cleanup,
    /// so its tab is closed here before the next one opens.
    async fn close_stray_tabs(&self) -> Result<(), FetchError> {
        let windows = self.client.windows().await.map_err(classify_cmd_error)?;
        let stray: Vec<WindowHandle> = windows
            .into_iter()
            .filter(|w| *w != self.main_window)
            .collect();
        if stray.is_empty() {
            return Ok(());
        }

        debug!("Closing {} leftover render tab(s)", stray.len());
        for window in stray {
            self.client
                .switch_to_window(window)
                .await
                .map_err(classify_cmd_error)?;
            if let Err(e) = self.client.close_window().await {
                warn!("Failed to close leftover render tab: {}", e);
            }
        }
        self.client
            .switch_to_window(self.main_window.clone())
            .await
            .map_err(classify_cmd_error)
    }

    /// Ends the WebDriver session
    pub async fn close(self) -> Result<(), FetchError> {
        self.client
            .close()
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))
    }
}

fn browser_capabilities(config: &FetchConfig) -> serde_json::Value {
    let mut chrome_args = vec![
        "--disable-gpu".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        format!("--user-agent={}", config.user_agent),
    ];
    let mut firefox_args = Vec::new();
    if config.headless {
        chrome_args.push("--headless=new".to_string());
        firefox_args.push("-headless".to_string());
    }

    json!({
        "goog:chromeOptions": { "args": chrome_args },
        "moz:firefoxOptions": { "args": firefox_args },
        "pageLoadStrategy": "normal"
    })
}

/// Browser-based fetch strategy
#[derive(Debug, Clone)]
pub struct RenderFetcher {
    config: FetchConfig,
    ready_timeout: Duration,
    settle_delay: Duration,
}

impl RenderFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            config: config.clone(),
            ready_timeout: Duration::from_millis(config.ready_timeout_ms),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
        }
    }

    pub async fn launch(&self) -> Result<BrowserHandle, FetchError> {
        BrowserHandle::launch(&self.config).await
    }

    /// Renders a page, in a new tab of `shared` or in a session of its own
    ///
    /// The tab is always closed afterwards. A session created here is closed
    /// too; a shared one never is.
    pub async fn render(
        &self,
        url: &Url,
        shared: Option<&BrowserHandle>,
    ) -> Result<RenderedPage, FetchError> {
        match shared {
            Some(handle) => self.render_in_new_tab(handle, url).await,
            None => {
                let local = self.launch().await?;
                let result = self.render_in_current_window(&local.client, url).await;
                if let Err(e) = local.close().await {
                    warn!("Failed to close browser session: {}", e);
                }
                result
            }
        }
    }

    async fn render_in_new_tab(
        &self,
        handle: &BrowserHandle,
        url: &Url,
    ) -> Result<RenderedPage, FetchError> {
        handle.close_stray_tabs().await?;

        let client = &handle.client;
        let tab = client.new_window(true).await.map_err(classify_cmd_error)?;
        client
            .switch_to_window(tab.handle)
            .await
            .map_err(classify_cmd_error)?;

        let result = self.render_in_current_window(client, url).await;

        if let Err(e) = client.close_window().await {
            warn!("Failed to close render tab for {}: {}", url, e);
        }
        if let Err(e) = client.switch_to_window(handle.main_window.clone()).await {
            warn!("Failed to switch back to the main browser window: {}", e);
        }

        result
    }

    async fn render_in_current_window(
        &self,
        client: &Client,
        url: &Url,
    ) -> Result<RenderedPage, FetchError> {
        let started = Instant::now();

        client.goto(url.as_str()).await.map_err(classify_cmd_error)?;
        self.wait_until_ready(client, url).await;
        tokio::time::sleep(self.settle_delay).await;

        let value = client
            .execute(EXTRACT_SCRIPT, Vec::new())
            .await
            .map_err(|e| match e {
                CmdError::Lost(_) => FetchError::BrowserUnavailable(e.to_string()),
                other => FetchError::Extraction(other.to_string()),
            })?;
        let snapshot: DomSnapshot = serde_json::from_value(value)
            .map_err(|e| FetchError::Extraction(format!("unexpected DOM snapshot: {}", e)))?;

        let final_url = client.current_url().await.unwrap_or_else(|_| url.clone());

        Ok(snapshot.into_page(final_url, started.elapsed()))
    }

    /// Polls `document.readyState` until complete or the ready timeout passes
    async fn wait_until_ready(&self, client: &Client, url: &Url) {
        let deadline = Instant::now() + self.ready_timeout;
        loop {
            let state = client
                .execute("return document.readyState;", Vec::new())
                .await
                .ok()
                .and_then(|v| v.as_str().map(str::to_string));
            if state.as_deref() == Some("complete") {
                return;
            }
            if Instant::now() >= deadline {
                debug!("{} not ready after {:?}, extracting anyway", url, self.ready_timeout);
                return;
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }
}

/// Classifies a WebDriver command failure
fn classify_cmd_error(err: CmdError) -> FetchError {
    if matches!(err, CmdError::Lost(_)) {
        return FetchError::BrowserUnavailable(err.to_string());
    }
    classify_browser_message(&err.to_string())
}

/// Maps browser navigation error text (Chrome net errors included) to a class
fn classify_browser_message(text: &str) -> FetchError {
    let message = text.to_string();
    let upper = text.to_ascii_uppercase();

    if upper.contains("ERR_NAME_NOT_RESOLVED") || upper.contains("DNSNOTFOUND") {
        FetchError::DnsNotFound(message)
    } else if upper.contains("ERR_CONNECTION_REFUSED") || upper.contains("CONNECTIONFAILURE") {
        FetchError::ConnectionRefused(message)
    } else if upper.contains("ERR_CERT_DATE_INVALID") {
        FetchError::Tls {
            issue: TlsIssue::Expired,
            message,
        }
    } else if upper.contains("ERR_CERT_AUTHORITY_INVALID") {
        FetchError::Tls {
            issue: TlsIssue::UnverifiableChain,
            message,
        }
    } else if upper.contains("ERR_CERT") || upper.contains("ERR_SSL") || upper.contains("SECURITY_ERROR") {
        FetchError::Tls {
            issue: TlsIssue::Other,
            message,
        }
    } else if upper.contains("ERR_TOO_MANY_REDIRECTS") {
        FetchError::TooManyRedirects(message)
    } else if upper.contains("ERR_TIMED_OUT") || upper.contains("TIMEOUT") || upper.contains("TIMED OUT") {
        FetchError::Timeout(message)
    } else if upper.contains("ERR_INTERNET_DISCONNECTED") || upper.contains("ERR_CONNECTION") {
        FetchError::Network(message)
    } else {
        FetchError::Browser(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::error::ErrorClass;

    #[test]
    fn test_classify_browser_navigation_errors() {
        let cases = [
            ("unknown error: net::ERR_NAME_NOT_RESOLVED", ErrorClass::DnsNotFound),
            ("unknown error: net::ERR_CONNECTION_REFUSED", ErrorClass::ConnectionRefused),
            ("unknown error: net::ERR_CERT_DATE_INVALID", ErrorClass::Tls(TlsIssue::Expired)),
            (
                "unknown error: net::ERR_CERT_AUTHORITY_INVALID",
                ErrorClass::Tls(TlsIssue::UnverifiableChain),
            ),
            ("unknown error: net::ERR_SSL_PROTOCOL_ERROR", ErrorClass::Tls(TlsIssue::Other)),
            ("unknown error: net::ERR_TOO_MANY_REDIRECTS", ErrorClass::TooManyRedirects),
            ("timeout: Timed out receiving message from renderer", ErrorClass::Timeout),
            ("unknown error: net::ERR_CONNECTION_RESET", ErrorClass::Network),
            ("no such window: target window already closed", ErrorClass::Browser),
        ];

        for (text, expected) in cases {
            assert_eq!(classify_browser_message(text).class(), expected, "{}", text);
        }
    }

    #[test]
    fn test_snapshot_into_page() {
        let value = json!({
            "html": "<html><body><h1>Hi</h1></body></html>",
            "links": ["https://a.com/x", "https://a.com/y"],
            "title": "Hi there",
            "description": null,
            "canonical": "https://a.com/",
            "h1": "Hi",
            "wordCount": 1
        });
        let snapshot: DomSnapshot = serde_json::from_value(value).unwrap();
        let page = snapshot.into_page(Url::parse("https://a.com/").unwrap(), Duration::ZERO);

        assert_eq!(page.links.len(), 2);
        assert_eq!(page.metadata.title.as_deref(), Some("Hi there"));
        assert_eq!(page.metadata.description, None);
        assert_eq!(page.metadata.word_count, Some(1));
    }

    #[test]
    fn test_malformed_snapshot_rejected() {
        let value = json!({ "links": "not a list" });
        assert!(serde_json::from_value::<DomSnapshot>(value).is_err());
    }

    #[test]
    fn test_capabilities_headless() {
        let config = FetchConfig::default();
        let caps = browser_capabilities(&config);
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.iter().any(|a| a == "--headless=new"));

        let config = FetchConfig {
            headless: false,
            ..FetchConfig::default()
        };
        let caps = browser_capabilities(&config);
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(!args.iter().any(|a| a == "--headless=new"));
    }

    #[tokio::test]
    async fn test_unreachable_webdriver_is_browser_unavailable() {
        let config = FetchConfig {
            webdriver_url: "http://127.0.0.1:9".to_string(),
            ..FetchConfig::default()
        };
        let err = BrowserHandle::launch(&config).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::BrowserUnavailable);
    }
}
