//! Pipeline statistics
//!
//! Stages bump shared atomic counters as tasks complete; the CLI combines a
//! snapshot of them with store-level counts when a run finishes.

use crate::storage::{ExtractedStore, StorageResult, VisitedStore};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every worker of a pipeline
#[derive(Debug, Default)]
pub struct PipelineStats {
    submitted: AtomicU64,
    ingested: AtomicU64,
    duplicates: AtomicU64,
    disallowed: AtomicU64,
    invalid: AtomicU64,
    crawled: AtomicU64,
    links_discovered: AtomicU64,
    scraped: AtomicU64,
    retries: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub ingested: u64,
    pub duplicates: u64,
    pub disallowed: u64,
    pub invalid: u64,
    pub crawled: u64,
    pub links_discovered: u64,
    pub scraped: u64,
    pub retries: u64,
    pub failures: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ingested(&self) {
        self.ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disallowed(&self) {
        self.disallowed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid(&self) {
        self.invalid.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a fetched page and the links found on it
    pub fn record_crawled(&self, links: usize) {
        self.crawled.fetch_add(1, Ordering::Relaxed);
        self.links_discovered
            .fetch_add(links as u64, Ordering::Relaxed);
    }

    pub fn record_scraped(&self) {
        self.scraped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            ingested: self.ingested.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            disallowed: self.disallowed.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            crawled: self.crawled.load(Ordering::Relaxed),
            links_discovered: self.links_discovered.load(Ordering::Relaxed),
            scraped: self.scraped.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Record counts of the durable stores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreSummary {
    pub visited_urls: u64,
    pub extracted_records: u64,
}

/// Loads record counts from the stores
///
/// # Arguments
///
/// * `visited` - The visited-URL store
/// * `extracted` - The extracted-data store
pub fn load_store_summary(
    visited: &dyn VisitedStore,
    extracted: &dyn ExtractedStore,
) -> StorageResult<StoreSummary> {
    Ok(StoreSummary {
        visited_urls: visited.count_visited()?,
        extracted_records: extracted.count_extracted()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// The run section is omitted when `run` is `None` (store-only report).
pub fn print_statistics(run: Option<&StatsSnapshot>, stores: &StoreSummary) {
    println!("=== Pipeline Statistics ===\n");

    if let Some(run) = run {
        println!("Ingestion:");
        println!("  Submitted: {}", run.submitted);
        println!("  Ingested: {}", run.ingested);
        println!("  Already visited: {}", run.duplicates);
        println!("  Disallowed by robots policy: {}", run.disallowed);
        println!("  Invalid URLs: {}", run.invalid);
        println!();

        println!("Crawl / Scrape:");
        println!("  Pages crawled: {}", run.crawled);
        println!("  Links discovered: {}", run.links_discovered);
        println!("  Pages scraped: {}", run.scraped);
        println!();

        if run.retries > 0 || run.failures > 0 {
            println!("Errors:");
            println!("  Redeliveries: {}", run.retries);
            println!("  Dropped tasks: {}", run.failures);
            println!();
        }
    }

    println!("Stores:");
    println!("  Visited URLs: {}", stores.visited_urls);
    println!("  Extracted records: {}", stores.extracted_records);
}
