//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the store traits.

use crate::render::CookieCapture;
use crate::robots::PolicySnapshot;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ExtractedStore, StorageError, StorageResult, VisitedStore};
use crate::storage::{ExtractedRecord, VisitedRecord};
use crate::url::NormalizedUrl;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
///
/// The connection sits behind a mutex so the store can be shared between
/// worker tasks; each operation is a single statement.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
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
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl VisitedStore for SqliteStorage {
    fn exists(&self, url: &NormalizedUrl) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn()?
            .query_row(
                "SELECT 1 FROM visited_urls WHERE url = ?1",
                params![url.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert(&self, record: &VisitedRecord) -> StorageResult<()> {
        let delay = i64::try_from(record.politeness.crawl_delay_ms).unwrap_or(i64::MAX);
        let result = self.conn()?.execute(
            "INSERT INTO visited_urls (url, created_at, robots_txt, crawl_delay_ms, disallow_all)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.url.as_str(),
                record.created_at,
                record.politeness.raw_policy_text,
                delay,
                record.politeness.disallow_all,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StorageError::AlreadyExists(record.url.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, url: &NormalizedUrl) -> StorageResult<Option<VisitedRecord>> {
        let record = self
            .conn()?
            .query_row(
                "SELECT url, created_at, robots_txt, crawl_delay_ms, disallow_all
                 FROM visited_urls WHERE url = ?1",
                params![url.as_str()],
                |row| {
                    let delay: i64 = row.get(3)?;
                    Ok(VisitedRecord {
                        url: NormalizedUrl::from_normalized(row.get(0)?),
                        created_at: row.get(1)?,
                        politeness: PolicySnapshot {
                            raw_policy_text: row.get(2)?,
                            crawl_delay_ms: u64::try_from(delay).unwrap_or(0),
                            disallow_all: row.get(4)?,
                        },
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn count_visited(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM visited_urls", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl ExtractedStore for SqliteStorage {
    fn append(&self, record: &ExtractedRecord) -> StorageResult<()> {
        let payload = serde_json::to_string(&record.payload)?;
        self.conn()?.execute(
            "INSERT INTO extracted_data (url, created_at, payload) VALUES (?1, ?2, ?3)",
            params![record.url, record.created_at, payload],
        )?;
        Ok(())
    }

    fn records_for(&self, url: &str) -> StorageResult<Vec<ExtractedRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT url, created_at, payload FROM extracted_data
             WHERE url = ?1 ORDER BY created_at, id",
        )?;

        let rows = stmt
            .query_map(params![url], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(url, created_at, payload)| -> StorageResult<ExtractedRecord> {
                let payload: CookieCapture = serde_json::from_str(&payload)?;
                Ok(ExtractedRecord {
                    url,
                    created_at,
                    payload,
                })
            })
            .collect()
    }

    fn count_extracted(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM extracted_data", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
