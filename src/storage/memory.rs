//! In-memory storage implementation
//!
//! Same semantics as the SQLite backend without durability. Used by tests
//! and by runs that do not need to keep their state.

use crate::storage::traits::{ExtractedStore, StorageError, StorageResult, VisitedStore};
use crate::storage::{ExtractedRecord, VisitedRecord};
use crate::url::NormalizedUrl;
use std::collections::HashMap;
use std::sync::Mutex;

/// Process-local visited and extracted stores
#[derive(Debug, Default)]
pub struct MemoryStorage {
    visited: Mutex<HashMap<NormalizedUrl, VisitedRecord>>,
    extracted: Mutex<Vec<ExtractedRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every extracted record in insertion order
    pub fn extracted_records(&self) -> StorageResult<Vec<ExtractedRecord>> {
        Ok(self
            .extracted
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?
            .clone())
    }
}

impl VisitedStore for MemoryStorage {
    fn exists(&self, url: &NormalizedUrl) -> StorageResult<bool> {
        let visited = self.visited.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(visited.contains_key(url))
    }

    fn insert(&self, record: &VisitedRecord) -> StorageResult<()> {
        let mut visited = self.visited.lock().map_err(|_| StorageError::LockPoisoned)?;
        if visited.contains_key(&record.url) {
            return Err(StorageError::AlreadyExists(record.url.to_string()));
        }
        visited.insert(record.url.clone(), record.clone());
        Ok(())
    }

    fn get(&self, url: &NormalizedUrl) -> StorageResult<Option<VisitedRecord>> {
        let visited = self.visited.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(visited.get(url).cloned())
    }

    fn count_visited(&self) -> StorageResult<u64> {
        let visited = self.visited.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(visited.len() as u64)
    }
}

impl ExtractedStore for MemoryStorage {
    fn append(&self, record: &ExtractedRecord) -> StorageResult<()> {
        self.extracted
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?
            .push(record.clone());
        Ok(())
    }

    fn records_for(&self, url: &str) -> StorageResult<Vec<ExtractedRecord>> {
        let extracted = self.extracted.lock().map_err(|_| StorageError::LockPoisoned)?;
        let mut records: Vec<ExtractedRecord> = extracted
            .iter()
            .filter(|r| r.url == url)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    fn count_extracted(&self) -> StorageResult<u64> {
        let extracted = self.extracted.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(extracted.len() as u64)
    }
}
