//! Storage module for persisting crawl history
//!
//! This module handles all database operations for finished crawls, including:
//! - SQLite database initialization and schema management
//! - Mapping a crawl report to a stored record
//! - Listing and loading past crawls

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::crawler::FetchMethod;
use crate::output::{CrawlReport, PageOutcome};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> crate::Result<SqliteStorage> {
    SqliteStorage::new(path)
}

/// A finished crawl as stored in the database
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlRecord {
    /// Assigned on save
    pub id: Option<i64>,
    pub start_url: String,
    pub base_url: String,
    pub created_at: DateTime<Utc>,
    pub total_duration_ms: u64,
    pub total_pages: usize,
    pub successful_pages: usize,
    pub failed_pages: usize,
    pub average_load_ms: f64,
    pub max_depth_reached: u32,

    /// Size of the written sitemap in bytes (0 when nothing was written)
    pub output_size_bytes: u64,

    /// SHA-256 of the configuration the crawl ran with
    pub config_hash: String,

    pub pages: Vec<PageEntry>,
}

/// One page of a stored crawl
#[derive(Debug, Clone, PartialEq)]
pub struct PageEntry {
    pub url: String,
    pub depth: u32,
    pub method: Option<FetchMethod>,
    pub success: bool,
    pub status_code: Option<u16>,
    pub load_time_ms: u64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub h1: Option<String>,
    pub canonical: Option<String>,
    pub word_count: Option<usize>,
    pub error_class: Option<String>,
}

/// Listing row for crawl history
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlSummaryRow {
    pub id: i64,
    pub start_url: String,
    pub created_at: DateTime<Utc>,
    pub total_pages: usize,
    pub successful_pages: usize,
    pub failed_pages: usize,
    pub total_duration_ms: u64,
}

impl CrawlRecord {
    pub fn from_report(report: &CrawlReport, config_hash: &str, output_size_bytes: u64) -> Self {
        Self {
            id: None,
            start_url: report.seed_url.clone(),
            base_url: report.base_url.clone(),
            created_at: report.started_at,
            total_duration_ms: report.total_duration_ms,
            total_pages: report.total,
            successful_pages: report.successful,
            failed_pages: report.failed,
            average_load_ms: report.average_load_ms,
            max_depth_reached: report.max_depth_reached,
            output_size_bytes,
            config_hash: config_hash.to_string(),
            pages: report.pages.iter().map(PageEntry::from_outcome).collect(),
        }
    }
}

impl PageEntry {
    pub fn from_outcome(outcome: &PageOutcome) -> Self {
        Self {
            url: outcome.url.clone(),
            depth: outcome.depth,
            method: outcome.method,
            success: outcome.success,
            status_code: outcome.status,
            load_time_ms: outcome.duration_ms,
            title: outcome.metadata.title.clone(),
            description: outcome.metadata.description.clone(),
            h1: outcome.metadata.h1.clone(),
            canonical: outcome.metadata.canonical.clone(),
            word_count: outcome.metadata.word_count,
            error_class: outcome.error_class.clone(),
        }
    }
}

/// Stores a finished crawl, logging instead of failing
///
/// Persistence never affects the crawl result, so errors are reported with
/// `warn!` and swallowed.
pub fn persist_report(
    storage: &mut dyn Storage,
    report: &CrawlReport,
    config_hash: &str,
    output_size_bytes: u64,
) -> Option<i64> {
    let record = CrawlRecord::from_report(report, config_hash, output_size_bytes);
    match storage.save_crawl(&record) {
        Ok(id) => {
            tracing::info!("Saved crawl {} ({} pages)", id, record.pages.len());
            Some(id)
        }
        Err(e) => {
            tracing::warn!("Failed to persist crawl of {}: {}", report.seed_url, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::PageMetadata;

    /// Backend that rejects every write
    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn save_crawl(&mut self, _record: &CrawlRecord) -> StorageResult<i64> {
            Err(StorageError::InvalidValue("read-only".to_string()))
        }

        fn list_crawls(&self, _limit: usize) -> StorageResult<Vec<CrawlSummaryRow>> {
            Ok(Vec::new())
        }

        fn get_crawl(&self, id: i64) -> StorageResult<CrawlRecord> {
            Err(StorageError::CrawlNotFound(id))
        }
    }

    pub(crate) fn sample_report() -> CrawlReport {
        let page = PageOutcome {
            url: "https://a.com/".to_string(),
            key: "https://a.com".to_string(),
            final_url: Some("https://a.com/".to_string()),
            depth: 0,
            parent: None,
            success: true,
            status: Some(200),
            method: Some(FetchMethod::Render),
            duration_ms: 120,
            retry_count: 0,
            links: vec!["https://a.com/about".to_string()],
            metadata: PageMetadata {
                title: Some("Home".to_string()),
                description: None,
                h1: Some("Welcome".to_string()),
                canonical: Some("https://a.com/".to_string()),
                word_count: Some(42),
            },
            error_class: None,
            error: None,
        };
        let failed = PageOutcome {
            url: "https://a.com/gone".to_string(),
            key: "https://a.com/gone".to_string(),
            final_url: None,
            depth: 1,
            parent: Some("https://a.com/".to_string()),
            success: false,
            status: Some(404),
            method: None,
            duration_ms: 8,
            retry_count: 0,
            links: Vec::new(),
            metadata: PageMetadata::default(),
            error_class: Some("http_404".to_string()),
            error: Some("HTTP 404".to_string()),
        };

        CrawlReport {
            seed_url: "https://a.com/".to_string(),
            base_url: "https://a.com".to_string(),
            started_at: Utc::now(),
            total_duration_ms: 1_500,
            pages: vec![page, failed],
            total: 2,
            successful: 1,
            failed: 1,
            max_depth_reached: 1,
            average_load_ms: 120.0,
        }
    }

    #[test]
    fn test_record_from_report() {
        let record = CrawlRecord::from_report(&sample_report(), "abc123", 2048);

        assert_eq!(record.id, None);
        assert_eq!(record.start_url, "https://a.com/");
        assert_eq!(record.total_pages, 2);
        assert_eq!(record.output_size_bytes, 2048);
        assert_eq!(record.config_hash, "abc123");
        assert_eq!(record.pages[0].method, Some(FetchMethod::Render));
        assert_eq!(record.pages[0].title.as_deref(), Some("Home"));
        assert_eq!(record.pages[0].word_count, Some(42));
        assert_eq!(record.pages[1].error_class.as_deref(), Some("http_404"));
    }

    #[test]
    fn test_persist_report_swallows_errors() {
        let mut storage = BrokenStorage;
        assert_eq!(persist_report(&mut storage, &sample_report(), "h", 0), None);
    }

    #[test]
    fn test_persist_report_returns_id() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = persist_report(&mut storage, &sample_report(), "h", 10);
        assert!(id.is_some());
    }
}
