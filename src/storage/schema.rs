//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Polite-Crawl database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per ingested URL; written once, never updated
CREATE TABLE IF NOT EXISTS visited_urls (
    url TEXT PRIMARY KEY,
    created_at INTEGER NOT NULL,
    robots_txt TEXT NOT NULL,
    crawl_delay_ms INTEGER NOT NULL,
    disallow_all INTEGER NOT NULL DEFAULT 0
);

-- Append-only extraction results, several per URL over time
CREATE TABLE IF NOT EXISTS extracted_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    payload TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_extracted_url_created ON extracted_data(url, created_at);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
