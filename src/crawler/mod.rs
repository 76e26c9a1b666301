//! Crawler module for page fetching and traversal
//!
//! This module contains the core crawling logic, including:
//! - Lightweight HTTP fetching with transport retries
//! - Browser rendering through WebDriver
//! - Per-page strategy selection between the two
//! - HTML parsing and link extraction
//! - The depth-first frontier and the crawl loop

mod dispatch;
mod engine;
mod error;
mod fetcher;
mod frontier;
mod parser;
mod render;

pub use dispatch::{FetchDispatcher, FetchMethod, FetchedPage, PageFetcher, RenderFetch};
pub use engine::{crawl, CrawlEngine, CrawlSession};
pub use error::{classify_reqwest_error, ErrorClass, FetchError, TlsIssue, TERMINAL_STATUSES};
pub use fetcher::{build_http_client, HttpFetcher, HttpPage, RetryPolicy};
pub use frontier::{CrawlBudget, CrawlTarget, Frontier, VisitedSet};
pub use parser::{has_framework_markers, parse_html, visible_text, PageMetadata, ParsedPage};
pub use render::{BrowserHandle, RenderFetcher, RenderedPage};
