//! Storage traits and error types
//!
//! This module defines the trait interfaces for the two durable stores and
//! their associated error types. Both stores are insert-only, so neither
//! needs application-level locking across pipeline workers.

use crate::storage::{ExtractedRecord, VisitedRecord};
use crate::url::NormalizedUrl;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("URL already visited: {0}")]
    AlreadyExists(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable set of ingested URLs, keyed by normalized URL
///
/// Records are written once and never updated. `exists` followed by `insert`
/// is not atomic; a concurrent duplicate insert is rejected with
/// [`StorageError::AlreadyExists`].
pub trait VisitedStore: Send + Sync {
    /// Checks if a URL has already been ingested
    fn exists(&self, url: &NormalizedUrl) -> StorageResult<bool>;

    /// Inserts a new record
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Record written
    /// * `Err(StorageError::AlreadyExists)` - A record for this URL exists
    fn insert(&self, record: &VisitedRecord) -> StorageResult<()>;

    /// Gets the record for a URL
    fn get(&self, url: &NormalizedUrl) -> StorageResult<Option<VisitedRecord>>;

    /// Counts ingested URLs
    fn count_visited(&self) -> StorageResult<u64>;
}

/// Durable append-only log of extraction results, keyed by (url, created_at)
pub trait ExtractedStore: Send + Sync {
    /// Appends a record; duplicates for the same URL are allowed
    fn append(&self, record: &ExtractedRecord) -> StorageResult<()>;

    /// Gets all records for a URL, oldest first
    fn records_for(&self, url: &str) -> StorageResult<Vec<ExtractedRecord>>;

    /// Counts stored records
    fn count_extracted(&self) -> StorageResult<u64>;
}
