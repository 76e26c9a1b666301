//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Sitegrove crawl history.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per finished crawl
CREATE TABLE IF NOT EXISTS crawls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    start_url TEXT NOT NULL,
    base_url TEXT NOT NULL,
    created_at TEXT NOT NULL,
    total_duration_ms INTEGER NOT NULL,
    total_pages INTEGER NOT NULL,
    successful_pages INTEGER NOT NULL,
    failed_pages INTEGER NOT NULL,
    average_load_ms REAL NOT NULL,
    max_depth_reached INTEGER NOT NULL,
    output_size_bytes INTEGER NOT NULL,
    config_hash TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawls_created ON crawls(created_at);

-- Per-page entries of a crawl, in dispatch order
CREATE TABLE IF NOT EXISTS crawl_pages (
    crawl_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    url TEXT NOT NULL,
    depth INTEGER NOT NULL,
    method TEXT,
    success INTEGER NOT NULL,
    status_code INTEGER,
    load_time_ms INTEGER NOT NULL,
    title TEXT,
    description TEXT,
    h1 TEXT,
    canonical TEXT,
    word_count INTEGER,
    error_class TEXT,
    PRIMARY KEY (crawl_id, position),
    FOREIGN KEY (crawl_id) REFERENCES crawls(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_crawl_pages_url ON crawl_pages(url);
"#;

/// Initializes the database schema
///
/// Safe to call on an existing database.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
