//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::FetchMethod;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{CrawlRecord, CrawlSummaryRow, PageEntry};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SitegroveError)` - Failed to open database
    pub fn new(path: &Path) -> crate::Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> crate::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn load_pages(&self, crawl_id: i64) -> StorageResult<Vec<PageEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, depth, method, success, status_code, load_time_ms, title,
                    description, h1, canonical, word_count, error_class
             FROM crawl_pages WHERE crawl_id = ?1 ORDER BY position",
        )?;

        let rows = stmt.query_map(params![crawl_id], |row| {
            Ok((
                PageEntry {
                    url: row.get(0)?,
                    depth: row.get(1)?,
                    method: None,
                    success: row.get(3)?,
                    status_code: row.get(4)?,
                    load_time_ms: row.get::<_, i64>(5)? as u64,
                    title: row.get(6)?,
                    description: row.get(7)?,
                    h1: row.get(8)?,
                    canonical: row.get(9)?,
                    word_count: row.get::<_, Option<i64>>(10)?.map(|n| n as usize),
                    error_class: row.get(11)?,
                },
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        let mut pages = Vec::new();
        for row in rows {
            let (mut page, method) = row?;
            page.method = match method {
                Some(m) => Some(
                    FetchMethod::from_db_string(&m)
                        .ok_or_else(|| StorageError::InvalidValue(format!("fetch method {}", m)))?,
                ),
                None => None,
            };
            pages.push(page);
        }
        Ok(pages)
    }
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidValue(format!("timestamp {}: {}", raw, e)))
}

impl Storage for SqliteStorage {
    fn save_crawl(&mut self, record: &CrawlRecord) -> StorageResult<i64> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO crawls (start_url, base_url, created_at, total_duration_ms,
                total_pages, successful_pages, failed_pages, average_load_ms,
                max_depth_reached, output_size_bytes, config_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.start_url,
                record.base_url,
                record.created_at.to_rfc3339(),
                record.total_duration_ms as i64,
                record.total_pages as i64,
                record.successful_pages as i64,
                record.failed_pages as i64,
                record.average_load_ms,
                record.max_depth_reached,
                record.output_size_bytes as i64,
                record.config_hash,
            ],
        )?;
        let crawl_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO crawl_pages (crawl_id, position, url, depth, method, success,
                    status_code, load_time_ms, title, description, h1, canonical,
                    word_count, error_class)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )?;

            for (position, page) in record.pages.iter().enumerate() {
                stmt.execute(params![
                    crawl_id,
                    position as i64,
                    page.url,
                    page.depth,
                    page.method.map(|m| m.as_str()),
                    page.success,
                    page.status_code,
                    page.load_time_ms as i64,
                    page.title,
                    page.description,
                    page.h1,
                    page.canonical,
                    page.word_count.map(|n| n as i64),
                    page.error_class,
                ])?;
            }
        }

        tx.commit()?;
        tracing::debug!("Stored crawl {} with {} pages", crawl_id, record.pages.len());
        Ok(crawl_id)
    }

    fn list_crawls(&self, limit: usize) -> StorageResult<Vec<CrawlSummaryRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, start_url, created_at, total_pages, successful_pages, failed_pages,
                    total_duration_ms
             FROM crawls ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
            ))
        })?;

        let mut crawls = Vec::new();
        for row in rows {
            let (id, start_url, created_at, total, successful, failed, duration) = row?;
            crawls.push(CrawlSummaryRow {
                id,
                start_url,
                created_at: parse_timestamp(&created_at)?,
                total_pages: total as usize,
                successful_pages: successful as usize,
                failed_pages: failed as usize,
                total_duration_ms: duration as u64,
            });
        }
        Ok(crawls)
    }

    fn get_crawl(&self, id: i64) -> StorageResult<CrawlRecord> {
        let row = self
            .conn
            .query_row(
                "SELECT start_url, base_url, created_at, total_duration_ms, total_pages,
                        successful_pages, failed_pages, average_load_ms, max_depth_reached,
                        output_size_bytes, config_hash
                 FROM crawls WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, i64>(6)?,
                        row.get::<_, f64>(7)?,
                        row.get::<_, u32>(8)?,
                        row.get::<_, i64>(9)?,
                        row.get::<_, String>(10)?,
                    ))
                },
            )
            .optional()?
            .ok_or(StorageError::CrawlNotFound(id))?;

        let (
            start_url,
            base_url,
            created_at,
            total_duration_ms,
            total_pages,
            successful_pages,
            failed_pages,
            average_load_ms,
            max_depth_reached,
            output_size_bytes,
            config_hash,
        ) = row;

        Ok(CrawlRecord {
            id: Some(id),
            start_url,
            base_url,
            created_at: parse_timestamp(&created_at)?,
            total_duration_ms: total_duration_ms as u64,
            total_pages: total_pages as usize,
            successful_pages: successful_pages as usize,
            failed_pages: failed_pages as usize,
            average_load_ms,
            max_depth_reached,
            output_size_bytes: output_size_bytes as u64,
            config_hash,
            pages: self.load_pages(id)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::sample_report;
    use tempfile::TempDir;

    #[test]
    fn test_create_in_memory() {
        let storage = SqliteStorage::new_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_save_and_load_crawl() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let record = CrawlRecord::from_report(&sample_report(), "cfg-hash", 512);

        let id = storage.save_crawl(&record).unwrap();
        let loaded = storage.get_crawl(id).unwrap();

        assert_eq!(loaded.id, Some(id));
        assert_eq!(loaded.start_url, record.start_url);
        assert_eq!(loaded.config_hash, "cfg-hash");
        assert_eq!(loaded.output_size_bytes, 512);
        assert_eq!(loaded.pages, record.pages);
        // RFC 3339 keeps sub-second precision
        assert_eq!(loaded.created_at, record.created_at);
    }

    #[test]
    fn test_get_missing_crawl() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.get_crawl(99),
            Err(StorageError::CrawlNotFound(99))
        ));
    }

    #[test]
    fn test_list_crawls_newest_first() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        let mut older = CrawlRecord::from_report(&sample_report(), "h", 0);
        older.created_at = "2026-01-01T00:00:00Z".parse().unwrap();
        older.start_url = "https://old.com/".to_string();
        let mut newer = CrawlRecord::from_report(&sample_report(), "h", 0);
        newer.created_at = "2026-06-01T00:00:00Z".parse().unwrap();

        storage.save_crawl(&older).unwrap();
        storage.save_crawl(&newer).unwrap();

        let crawls = storage.list_crawls(10).unwrap();
        assert_eq!(crawls.len(), 2);
        assert_eq!(crawls[0].start_url, "https://a.com/");
        assert_eq!(crawls[1].start_url, "https://old.com/");
        assert_eq!(crawls[0].total_pages, 2);

        assert_eq!(storage.list_crawls(1).unwrap().len(), 1);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.db");

        let id = {
            let mut storage = SqliteStorage::new(&path).unwrap();
            storage
                .save_crawl(&CrawlRecord::from_report(&sample_report(), "h", 0))
                .unwrap()
        };

        let reopened = SqliteStorage::new(&path).unwrap();
        assert_eq!(reopened.get_crawl(id).unwrap().pages.len(), 2);
    }
}
