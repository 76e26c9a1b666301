use crate::crawler::{CrawlTarget, FetchError, FetchMethod, FetchedPage, PageMetadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Result of attempting one crawl target
///
/// Created once per dispatched target, after its last attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageOutcome {
    /// URL as dispatched
    pub url: String,

    /// Normalized dedup key
    pub key: String,

    /// URL after redirects, when the page was fetched
    pub final_url: Option<String>,

    pub depth: u32,
    pub parent: Option<String>,
    pub success: bool,
    pub status: Option<u16>,
    pub method: Option<FetchMethod>,

    /// Duration of the last attempt in milliseconds
    pub duration_ms: u64,

    /// Frontier-level retries before this outcome
    pub retry_count: u32,

    /// Outbound links found on the page (absolute, any origin)
    pub links: Vec<String>,

    pub metadata: PageMetadata,

    /// Stable classification such as `http_404` or `timeout`
    pub error_class: Option<String>,

    /// Human-readable error message
    pub error: Option<String>,
}

impl PageOutcome {
    pub fn success(target: &CrawlTarget, page: FetchedPage) -> Self {
        Self {
            url: target.url.to_string(),
            key: target.key.clone(),
            final_url: Some(page.final_url.to_string()),
            depth: target.depth,
            parent: target.parent.clone(),
            success: true,
            status: page.status,
            method: Some(page.method),
            duration_ms: duration_ms(page.duration),
            retry_count: target.retry_count,
            links: page.links,
            metadata: page.metadata,
            error_class: None,
            error: None,
        }
    }

    pub fn failure(target: &CrawlTarget, error: &FetchError, duration: Duration) -> Self {
        Self {
            url: target.url.to_string(),
            key: target.key.clone(),
            final_url: None,
            depth: target.depth,
            parent: target.parent.clone(),
            success: false,
            status: error.status(),
            method: None,
            duration_ms: duration_ms(duration),
            retry_count: target.retry_count,
            links: Vec::new(),
            metadata: PageMetadata::default(),
            error_class: Some(error.class().to_string()),
            error: Some(error.to_string()),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// The terminal artifact of one crawl run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    /// Seed URL as given
    pub seed_url: String,

    /// Serialized origin every page shares
    pub base_url: String,

    pub started_at: DateTime<Utc>,

    /// Wall-clock duration of the run in milliseconds
    pub total_duration_ms: u64,

    /// Outcomes in dispatch order
    pub pages: Vec<PageOutcome>,

    pub total: usize,
    pub successful: usize,
    pub failed: usize,

    /// Deepest depth among recorded outcomes
    pub max_depth_reached: u32,

    /// Mean duration of successful pages in milliseconds
    pub average_load_ms: f64,
}

impl CrawlReport {
    /// URLs of successfully fetched pages, in dispatch order
    ///
    /// Fragments are dropped; the query string is kept.
    pub fn successful_urls(&self) -> Vec<String> {
        self.pages
            .iter()
            .filter(|page| page.success)
            .map(|page| without_fragment(&page.url))
            .collect()
    }

    pub fn failed_pages(&self) -> impl Iterator<Item = &PageOutcome> {
        self.pages.iter().filter(|page| !page.success)
    }

    /// Percentage of outcomes that succeeded
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.successful as f64 / self.total as f64) * 100.0
        }
    }

    /// Failure counts per error class, sorted by class
    pub fn error_breakdown(&self) -> BTreeMap<String, usize> {
        let mut breakdown = BTreeMap::new();
        for page in self.failed_pages() {
            let class = page
                .error_class
                .clone()
                .unwrap_or_else(|| "unknown".to_string());
            *breakdown.entry(class).or_insert(0) += 1;
        }
        breakdown
    }

    /// Number of pages that went through the browser
    pub fn rendered_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|page| page.method == Some(FetchMethod::Render))
            .count()
    }
}

fn without_fragment(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => raw.split('#').next().unwrap_or(raw).to_string(),
    }
}
