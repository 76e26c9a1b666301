//! Fetch strategy selection
//!
//! The dispatcher decides per URL whether the plain HTTP fetch is enough or the
//! page has to be rendered in a browser, and turns either result into one
//! [`FetchedPage`].

use crate::config::{FetchConfig, RenderMode};
use crate::crawler::error::FetchError;
use crate::crawler::fetcher::{HttpFetcher, HttpPage};
use crate::crawler::parser::{parse_html, PageMetadata, ParsedPage};
use crate::crawler::render::{BrowserHandle, RenderFetcher, RenderedPage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Which strategy produced a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMethod {
    Lightweight,
    Render,
}

impl FetchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lightweight => "lightweight",
            Self::Render => "render",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "lightweight" => Some(Self::Lightweight),
            "render" => Some(Self::Render),
            _ => None,
        }
    }
}

impl fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successfully fetched page, whichever strategy produced it
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub requested_url: Url,
    pub final_url: Url,
    pub method: FetchMethod,
    /// HTTP status, when a plain request reached the server
    pub status: Option<u16>,
    pub content_type: Option<String>,
    /// Absolute outbound links, not yet filtered by origin
    pub links: Vec<String>,
    pub metadata: PageMetadata,
    pub duration: Duration,
    /// Retries spent inside the lightweight fetcher
    pub transport_retries: u32,
}

impl FetchedPage {
    fn from_lightweight(requested_url: &Url, page: HttpPage, parsed: ParsedPage) -> Self {
        Self {
            requested_url: requested_url.clone(),
            final_url: page.final_url,
            method: FetchMethod::Lightweight,
            status: Some(page.status),
            content_type: page.content_type,
            links: parsed.links,
            metadata: parsed.metadata,
            duration: page.duration,
            transport_retries: page.retries,
        }
    }

    fn from_rendered(requested_url: &Url, page: RenderedPage) -> Self {
        Self {
            requested_url: requested_url.clone(),
            final_url: page.final_url,
            method: FetchMethod::Render,
            status: None,
            content_type: None,
            links: page.links,
            metadata: page.metadata,
            duration: page.duration,
            transport_retries: 0,
        }
    }
}

/// A browser-backed page retrieval strategy
pub trait RenderFetch: Send + Sync {
    /// Session shared across renders of one run
    type Handle: Send + Sync;

    fn launch(&self) -> impl Future<Output = Result<Self::Handle, FetchError>> + Send;

    fn render(
        &self,
        url: &Url,
        shared: Option<&Self::Handle>,
    ) -> impl Future<Output = Result<RenderedPage, FetchError>> + Send;

    fn close(&self, handle: Self::Handle) -> impl Future<Output = Result<(), FetchError>> + Send;
}

impl RenderFetch for RenderFetcher {
    type Handle = BrowserHandle;

    async fn launch(&self) -> Result<BrowserHandle, FetchError> {
        RenderFetcher::launch(self).await
    }

    async fn render(
        &self,
        url: &Url,
        shared: Option<&BrowserHandle>,
    ) -> Result<RenderedPage, FetchError> {
        RenderFetcher::render(self, url, shared).await
    }

    async fn close(&self, handle: BrowserHandle) -> Result<(), FetchError> {
        handle.close().await
    }
}

/// Anything the crawl engine can ask for a page
pub trait PageFetcher: Send {
    fn fetch_page(&mut self, url: &Url) -> impl Future<Output = Result<FetchedPage, FetchError>> + Send;

    /// Releases shared resources; called once when the run ends
    fn shutdown(&mut self) -> impl Future<Output = ()> + Send;
}

/// Picks the fetch strategy for each page and owns the run's browser session
pub struct FetchDispatcher<R: RenderFetch = RenderFetcher> {
    http: HttpFetcher,
    renderer: R,
    mode: RenderMode,
    min_content_chars: usize,
    browser: Option<R::Handle>,
    /// Set once launching the browser failed; later renders fail fast
    browser_unavailable: Option<String>,
}

impl FetchDispatcher<RenderFetcher> {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_renderer(
            HttpFetcher::new(config)?,
            RenderFetcher::new(config),
            config,
        ))
    }
}

impl<R: RenderFetch> FetchDispatcher<R> {
    pub fn with_renderer(http: HttpFetcher, renderer: R, config: &FetchConfig) -> Self {
        Self {
            http,
            renderer,
            mode: config.render_mode,
            min_content_chars: config.min_content_chars,
            browser: None,
            browser_unavailable: None,
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Lightweight first, browser only when the page needs it
    async fn fetch_auto(&mut self, url: &Url) -> Result<FetchedPage, FetchError> {
        let page = match self.http.fetch(url).await {
            Ok(page) => page,
            Err(err) if err.is_render_recoverable() => {
                debug!("Lightweight fetch of {} failed ({}), rendering instead", url, err);
                return match self.render(url).await {
                    Ok(rendered) => Ok(FetchedPage::from_rendered(url, rendered)),
                    Err(FetchError::BrowserUnavailable(reason)) => {
                        warn!("Browser unavailable for fallback on {}: {}", url, reason);
                        Err(err)
                    }
                    Err(render_err) => Err(render_err),
                };
            }
            Err(err) => return Err(err),
        };

        if !page.is_html() {
            return Ok(Self::non_html(url, page));
        }

        let parsed = parse_html(&page.body, &page.final_url);
        let Some(reason) = self.render_reason(&parsed) else {
            return Ok(FetchedPage::from_lightweight(url, page, parsed));
        };

        debug!("Rendering {}: {}", url, reason);
        match self.render(url).await {
            Ok(rendered) => {
                let mut fetched = FetchedPage::from_rendered(url, rendered);
                fetched.status = Some(page.status);
                fetched.content_type = page.content_type;
                fetched.transport_retries = page.retries;
                Ok(fetched)
            }
            Err(FetchError::BrowserUnavailable(reason)) => {
                warn!(
                    "Browser unavailable, keeping static extraction for {}: {}",
                    url, reason
                );
                Ok(FetchedPage::from_lightweight(url, page, parsed))
            }
            Err(err) => Err(err),
        }
    }

    async fn fetch_lightweight(&mut self, url: &Url) -> Result<FetchedPage, FetchError> {
        let page = self.http.fetch(url).await?;
        if !page.is_html() {
            return Ok(Self::non_html(url, page));
        }
        let parsed = parse_html(&page.body, &page.final_url);
        Ok(FetchedPage::from_lightweight(url, page, parsed))
    }

    async fn fetch_rendered(&mut self, url: &Url) -> Result<FetchedPage, FetchError> {
        let rendered = self.render(url).await?;
        Ok(FetchedPage::from_rendered(url, rendered))
    }

    /// Why a successful lightweight HTML page still needs a browser, if it does
    fn render_reason(&self, parsed: &ParsedPage) -> Option<String> {
        if parsed.framework_markers {
            return Some("client-side framework markers".to_string());
        }
        if parsed.visible_text_len < self.min_content_chars {
            return Some(format!(
                "only {} visible characters (minimum {})",
                parsed.visible_text_len, self.min_content_chars
            ));
        }
        None
    }

    fn non_html(url: &Url, page: HttpPage) -> FetchedPage {
        FetchedPage::from_lightweight(url, page, ParsedPage::default())
    }

    /// Renders through the shared session, launching it on first use
    async fn render(&mut self, url: &Url) -> Result<RenderedPage, FetchError> {
        if let Some(reason) = &self.browser_unavailable {
            return Err(FetchError::BrowserUnavailable(reason.clone()));
        }

        if self.browser.is_none() {
            match self.renderer.launch().await {
                Ok(handle) => {
                    info!("Browser session started");
                    self.browser = Some(handle);
                }
                Err(err) => {
                    if let FetchError::BrowserUnavailable(reason) = &err {
                        self.browser_unavailable = Some(reason.clone());
                    }
                    return Err(err);
                }
            }
        }

        self.renderer.render(url, self.browser.as_ref()).await
    }
}

impl<R: RenderFetch> PageFetcher for FetchDispatcher<R> {
    async fn fetch_page(&mut self, url: &Url) -> Result<FetchedPage, FetchError> {
        match self.mode {
            RenderMode::Auto => self.fetch_auto(url).await,
            RenderMode::Never => self.fetch_lightweight(url).await,
            RenderMode::Always => self.fetch_rendered(url).await,
        }
    }

    async fn shutdown(&mut self) {
        if let Some(handle) = self.browser.take() {
            match self.renderer.close(handle).await {
                Ok(()) => info!("Browser session closed"),
                Err(e) => warn!("Failed to close browser session: {}", e),
            }
        }
    }
}
