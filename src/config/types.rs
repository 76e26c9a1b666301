use serde::Deserialize;
use std::time::Duration;

/// Realistic desktop browser user agent sent by the lightweight fetcher
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Main configuration structure for Sitegrove
///
/// Every key has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub fetch: FetchConfig,
    pub output: OutputConfig,
}

/// Traversal budget configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum depth to crawl from the seed URL (seed is depth 0)
    pub max_depth: u32,

    /// Maximum number of distinct pages dispatched in one run
    pub max_pages: u32,

    /// Upper bound for one page dispatch, including fallback rendering (milliseconds)
    pub page_timeout_ms: u64,

    /// Frontier-level retries for transient failures
    pub max_retries: u32,

    /// Minimum time between two consecutive dispatches (milliseconds)
    pub politeness_delay_ms: u64,

    /// Base delay for exponential backoff between frontier retries (milliseconds)
    pub retry_base_delay_ms: u64,

    /// Maximum number of links enqueued from a single page
    pub max_children_per_page: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 100,
            page_timeout_ms: 60_000,
            max_retries: 2,
            politeness_delay_ms: 1_500,
            retry_base_delay_ms: 1_000,
            max_children_per_page: 10,
        }
    }
}

/// Which fetch strategy the dispatcher may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Lightweight first, render only when the page looks client-rendered
    #[default]
    Auto,
    /// Lightweight fetch only; no browser is ever launched
    Never,
    /// Every page through the browser
    Always,
}

/// Page fetch configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// User agent sent with lightweight requests
    pub user_agent: String,

    /// Timeout for one HTTP request (milliseconds)
    pub request_timeout_ms: u64,

    /// Maximum redirects followed by the lightweight fetcher (at most 5)
    pub max_redirects: usize,

    /// Retries inside the lightweight fetcher, on top of frontier retries
    pub transport_retries: u32,

    /// Base delay for the lightweight fetcher's exponential backoff (milliseconds)
    pub transport_retry_base_ms: u64,

    /// Strategy selection mode
    pub render_mode: RenderMode,

    /// WebDriver endpoint used for rendering
    pub webdriver_url: String,

    /// Ask the WebDriver browser to run headless
    pub headless: bool,

    /// WebDriver page-load timeout for one navigation (milliseconds)
    pub page_load_timeout_ms: u64,

    /// Maximum wait for `document.readyState == "complete"` (milliseconds)
    pub ready_timeout_ms: u64,

    /// Fixed delay after the document is ready, for late scripts (milliseconds)
    pub settle_delay_ms: u64,

    /// Visible body text below this many characters triggers a render
    pub min_content_chars: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_ms: 15_000,
            max_redirects: 5,
            transport_retries: 0,
            transport_retry_base_ms: 500,
            render_mode: RenderMode::Auto,
            webdriver_url: "http://localhost:4444".to_string(),
            headless: true,
            page_load_timeout_ms: 30_000,
            ready_timeout_ms: 10_000,
            settle_delay_ms: 1_000,
            min_content_chars: 200,
        }
    }
}

impl FetchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Worst-case time one page can spend across a lightweight fetch and a render
    pub fn worst_case_page_ms(&self) -> u64 {
        self.request_timeout_ms
            .saturating_add(self.page_load_timeout_ms)
            .saturating_add(self.ready_timeout_ms)
            .saturating_add(self.settle_delay_ms)
    }
}

/// Sitemap serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SitemapFormat {
    /// sitemaps.org XML urlset
    #[default]
    Xml,
    /// Nested HTML list
    Html,
    /// Hierarchical JSON tree for visualization
    Tree,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Path the sitemap is written to
    pub sitemap_path: String,

    /// Sitemap format
    pub format: SitemapFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "./sitegrove.db".to_string(),
            sitemap_path: "./sitemap.xml".to_string(),
            format: SitemapFormat::Xml,
        }
    }
}
