//! Storage module for persisting pipeline state
//!
//! This module handles the two durable stores the pipeline writes:
//! - The visited-URL store, keyed by normalized URL (dedup boundary)
//! - The extracted-data store, an append-only log keyed by (url, created_at)
//!
//! `SqliteStorage` backs both with one SQLite database; `MemoryStorage` is an
//! in-process substitute for tests and throwaway runs.

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
pub use traits::{ExtractedStore, StorageError, StorageResult, VisitedStore};

use crate::render::CookieCapture;
use crate::robots::PolicySnapshot;
use crate::url::NormalizedUrl;

use std::path::Path;

/// Opens (or creates) the SQLite database at `path`
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Current time as stored in `created_at` columns (Unix milliseconds)
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Represents an ingested URL in the visited store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitedRecord {
    pub url: NormalizedUrl,
    pub created_at: i64,
    pub politeness: PolicySnapshot,
}

impl VisitedRecord {
    /// Creates a record stamped with the current time
    pub fn new(url: NormalizedUrl, politeness: PolicySnapshot) -> Self {
        Self {
            url,
            created_at: now_millis(),
            politeness,
        }
    }
}

/// Represents one scrape result in the extracted-data store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRecord {
    pub url: String,
    pub created_at: i64,
    pub payload: CookieCapture,
}

impl ExtractedRecord {
    /// Creates a record stamped with the current time
    pub fn new(url: impl Into<String>, payload: CookieCapture) -> Self {
        Self {
            url: url.into(),
            created_at: now_millis(),
            payload,
        }
    }
}
