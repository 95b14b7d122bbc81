//! Crawl stage
//!
//! Waits out the site's crawl delay, fetches the page and forwards every
//! discovered link. Links go straight to the scrape queue, or back through
//! ingestion when `link-routing = "ingest"`.

use crate::config::LinkRouting;
use crate::output::PipelineStats;
use crate::pipeline::{extract_links, PageFetcher};
use crate::queue::{CrawlTask, QueueError, ScrapeTask, SubmitTask, TaskMessage, TaskQueue};
use crate::{CrawlError, Result};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Crawl stage handler
#[derive(Clone)]
pub struct CrawlStage {
    fetcher: Arc<dyn PageFetcher>,
    link_queue: Arc<dyn TaskQueue>,
    routing: LinkRouting,
    stats: Arc<PipelineStats>,
}

impl CrawlStage {
    /// Creates the stage
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Fetch capability for pages
    /// * `link_queue` - Scrape queue, or ingest queue when routing is `Ingest`
    /// * `routing` - How discovered links are forwarded
    /// * `stats` - Shared pipeline counters
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        link_queue: Arc<dyn TaskQueue>,
        routing: LinkRouting,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            fetcher,
            link_queue,
            routing,
            stats,
        }
    }

    /// Crawls one page
    ///
    /// A fetch failure fails the task before any link is emitted. A failure
    /// to emit one link does not stop the others; the task fails after all of
    /// them were attempted.
    ///
    /// # Returns
    ///
    /// The number of links emitted
    pub async fn crawl(&self, task: &CrawlTask) -> Result<usize> {
        if task.delay_ms > 0 {
            tracing::debug!("Waiting {} ms before fetching {}", task.delay_ms, task.url);
            tokio::time::sleep(Duration::from_millis(task.delay_ms)).await;
        }

        let page = self.fetcher.fetch(task.url.as_str()).await.map_err(|e| {
            tracing::error!("Failed to fetch {}: {}", task.url, e);
            CrawlError::DownstreamFetchFailed(e)
        })?;

        let base_url = Url::parse(&page.final_url)
            .or_else(|_| Url::parse(task.url.as_str()))
            .map_err(|e| CrawlError::MalformedTask(format!("{}: {}", task.url, e)))?;
        let links = extract_links(&page.body, &base_url);

        let mut first_error: Option<QueueError> = None;
        let mut failed = 0usize;

        for link in &links {
            tracing::debug!("Discovered link {} on {}", link, task.url);
            if let Err(e) = self.link_queue.send(&self.route(link)) {
                tracing::error!("Failed to emit {} from {}: {}", link, task.url, e);
                failed += 1;
                first_error.get_or_insert(e);
            }
        }

        if let Some(e) = first_error {
            tracing::error!(
                "{} of {} links from {} were not emitted",
                failed,
                links.len(),
                task.url
            );
            return Err(e.into());
        }

        self.stats.record_crawled(links.len());
        tracing::info!("Crawled {} ({} links)", task.url, links.len());
        Ok(links.len())
    }

    fn route(&self, link: &str) -> TaskMessage {
        match self.routing {
            LinkRouting::Scrape => TaskMessage::Scrape(ScrapeTask {
                url: link.to_string(),
            }),
            LinkRouting::Ingest => TaskMessage::Submit(SubmitTask {
                url: link.to_string(),
            }),
        }
    }
}
