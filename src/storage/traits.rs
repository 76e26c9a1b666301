//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{CrawlRecord, CrawlSummaryRow};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Crawl not found: {0}")]
    CrawlNotFound(i64),

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for crawl history backends
pub trait Storage {
    /// Stores a finished crawl and its page entries
    ///
    /// # Returns
    ///
    /// The id assigned to the crawl
    fn save_crawl(&mut self, record: &CrawlRecord) -> StorageResult<i64>;

    /// Lists stored crawls, newest first
    fn list_crawls(&self, limit: usize) -> StorageResult<Vec<CrawlSummaryRow>>;

    /// Loads one crawl with all of its page entries
    fn get_crawl(&self, id: i64) -> StorageResult<CrawlRecord>;
}
