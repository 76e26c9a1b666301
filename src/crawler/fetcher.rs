//! Lightweight HTTP fetcher
//!
//! This module handles the plain HTTP strategy for the crawler, including:
//! - Building the HTTP client with a browser-like identity
//! - GET requests with bounded redirects and strict TLS
//! - Error classification
//! - In-fetch retry with exponential backoff

use crate::config::{FetchConfig, MAX_REDIRECTS};
use crate::crawler::error::{classify_reqwest_error, FetchError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{redirect::Policy, Client};
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use url::Url;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9";

/// A page retrieved over plain HTTP
#[derive(Debug, Clone)]
pub struct HttpPage {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value
    pub content_type: Option<String>,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body, lossily decoded as UTF-8
    pub body: String,
    /// Time spent on the successful attempt
    pub duration: Duration,
    /// Number of in-fetch retries before this result
    pub retries: u32,
}

impl HttpPage {
    /// Returns true if the body should be parsed as HTML
    ///
    /// A missing Content-Type counts as HTML when the body looks like markup.
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(ct) => {
                let ct = ct.to_ascii_lowercase();
                ct.contains("text/html") || ct.contains("application/xhtml")
            }
            None => self.body.trim_start().starts_with('<'),
        }
    }
}

/// Retry settings for the lightweight fetcher
///
/// Independent of the frontier's own retries; defaults to no in-fetch retries.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_retries: config.transport_retries,
            base_delay: Duration::from_millis(config.transport_retry_base_ms),
        }
    }

    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt - 1)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetch configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sitegrove::config::FetchConfig;
/// use sitegrove::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(config.request_timeout())
        .connect_timeout(config.request_timeout().min(Duration::from_secs(10)))
        .redirect(Policy::limited(config.max_redirects.min(MAX_REDIRECTS)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Plain HTTP fetch strategy
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            retry: RetryPolicy::from_config(config),
        })
    }

    /// Fetches a URL with error classification and retry
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 2xx/3xx/other 4xx | Returned as a page |
    /// | HTTP 400/401/403/404/410 | Immediate error |
    /// | HTTP 5xx | Retry with backoff, then error |
    /// | Timeout / connection / network | Retry with backoff, then error |
    /// | DNS / malformed URL / TLS / redirects | Immediate error |
    pub async fn fetch(&self, url: &Url) -> Result<HttpPage, FetchError> {
        let mut attempt = 0;

        loop {
            match self.fetch_once(url).await {
                Ok(mut page) => {
                    page.retries = attempt;
                    return Ok(page);
                }
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.delay_for(attempt);
                    debug!(
                        "Transport retry {}/{} for {} in {:?}: {}",
                        attempt, self.retry.max_retries, url, delay, err
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fetch_once(&self, url: &Url) -> Result<HttpPage, FetchError> {
        let started = Instant::now();

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status().as_u16();
        if let Some(err) = FetchError::from_status(status) {
            return Err(err);
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        trace!("Fetched {} ({} bytes, status {})", final_url, body.len(), status);

        Ok(HttpPage {
            final_url,
            status,
            content_type,
            headers,
            body,
            duration: started.elapsed(),
            retries: 0,
        })
    }
}
