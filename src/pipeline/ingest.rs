//! Ingestion stage
//!
//! Turns a raw submission into a crawl target: normalize, deduplicate against
//! the visited store, resolve the site's politeness policy and hand the URL to
//! the crawl and scrape queues.
//!
//! Tasks are emitted before the visited record is written. A crash between
//! the two leaves the URL unrecorded, so the redelivered submission emits the
//! tasks again instead of losing them; downstream stages tolerate duplicates.

use crate::output::PipelineStats;
use crate::queue::{CrawlTask, ScrapeTask, TaskMessage, TaskQueue};
use crate::robots::PolitenessResolver;
use crate::storage::{StorageError, VisitedRecord, VisitedStore};
use crate::url::{normalize, NormalizedUrl};
use crate::{CrawlError, Result};
use std::sync::Arc;

/// What happened to a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Crawl and scrape tasks were emitted and the URL recorded
    Queued { url: NormalizedUrl, delay_ms: u64 },

    /// The URL was ingested before; nothing was done
    AlreadyVisited { url: NormalizedUrl },

    /// The site's policy forbids crawling; nothing was written
    Disallowed { url: NormalizedUrl },
}

impl IngestOutcome {
    pub fn url(&self) -> &NormalizedUrl {
        match self {
            Self::Queued { url, .. } | Self::AlreadyVisited { url } | Self::Disallowed { url } => {
                url
            }
        }
    }
}

/// Ingestion stage handler
#[derive(Clone)]
pub struct IngestionStage {
    visited: Arc<dyn VisitedStore>,
    resolver: PolitenessResolver,
    crawl_queue: Arc<dyn TaskQueue>,
    scrape_queue: Arc<dyn TaskQueue>,
    stats: Arc<PipelineStats>,
}

impl IngestionStage {
    /// Creates the stage
    ///
    /// # Arguments
    ///
    /// * `visited` - Visited-URL store used for deduplication
    /// * `resolver` - Politeness resolver
    /// * `crawl_queue` - Receives one `CrawlTask` per new URL
    /// * `scrape_queue` - Receives one `ScrapeTask` per new URL
    /// * `stats` - Shared pipeline counters
    pub fn new(
        visited: Arc<dyn VisitedStore>,
        resolver: PolitenessResolver,
        crawl_queue: Arc<dyn TaskQueue>,
        scrape_queue: Arc<dyn TaskQueue>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            visited,
            resolver,
            crawl_queue,
            scrape_queue,
            stats,
        }
    }

    /// Ingests one raw URL submission
    ///
    /// # Returns
    ///
    /// * `Ok(IngestOutcome)` - The submission was handled
    /// * `Err(CrawlError::InvalidUrl)` - The submission cannot be normalized
    /// * `Err(_)` - A store or queue call failed; the submission may be retried
    pub async fn ingest(&self, raw: &str) -> Result<IngestOutcome> {
        let url = match normalize(raw) {
            Ok(url) => url,
            Err(e) => {
                self.stats.record_invalid();
                return Err(e.into());
            }
        };

        if self.visited.exists(&url)? {
            tracing::debug!("Already visited: {}", url);
            self.stats.record_duplicate();
            return Ok(IngestOutcome::AlreadyVisited { url });
        }

        let policy = self.resolver.resolve(&url).await;

        if policy.disallow_all {
            tracing::info!("Robots policy disallows crawling {}", url);
            self.stats.record_disallowed();
            return Ok(IngestOutcome::Disallowed { url });
        }

        let delay_ms = policy.crawl_delay_ms;

        self.crawl_queue.send(&TaskMessage::Crawl(CrawlTask {
            url: url.clone(),
            delay_ms,
        }))?;
        self.scrape_queue.send(&TaskMessage::Scrape(ScrapeTask {
            url: url.to_string(),
        }))?;

        match self.visited.insert(&VisitedRecord::new(url.clone(), policy)) {
            Ok(()) => {}
            Err(StorageError::AlreadyExists(_)) => {
                // A concurrent delivery of the same URL won the insert
                tracing::debug!("Visited record for {} already written", url);
            }
            Err(e) => return Err(CrawlError::PersistFailed(e)),
        }

        tracing::info!("Ingested {} (crawl delay {} ms)", url, delay_ms);
        self.stats.record_ingested();

        Ok(IngestOutcome::Queued { url, delay_ms })
    }
}
