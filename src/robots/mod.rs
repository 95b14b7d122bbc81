//! Robots policy handling module
//!
//! This module resolves a site's politeness policy (crawl delay and a
//! disallow-all rule) from its robots.txt. Resolution never fails: an
//! unreachable or missing policy yields a permissive default.

mod parser;

pub use parser::{PolicySnapshot, DEFAULT_CRAWL_DELAY_MS};

use crate::config::PolitenessConfig;
use crate::pipeline::PageFetcher;
use crate::url::NormalizedUrl;
use std::sync::Arc;

/// Resolves politeness policies over an injected fetch capability
#[derive(Clone)]
pub struct PolitenessResolver {
    fetcher: Arc<dyn PageFetcher>,
    rules: PolitenessConfig,
}

impl PolitenessResolver {
    /// Creates a resolver
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Fetch capability used for the robots.txt GET
    /// * `config` - Default and maximum crawl delays, and the `Crawl-delay` unit
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &PolitenessConfig) -> Self {
        Self {
            fetcher,
            rules: config.clone(),
        }
    }

    /// Fetches and parses the robots policy for a URL
    ///
    /// Performs exactly one GET of `<url>robots.txt`. A network failure or a
    /// non-success response is logged and answered with the permissive default
    /// snapshot.
    pub async fn resolve(&self, url: &NormalizedUrl) -> PolicySnapshot {
        let robots_url = url.robots_url();

        match self.fetcher.fetch(&robots_url).await {
            Ok(page) => {
                tracing::debug!("Fetched robots policy from {}", robots_url);
                PolicySnapshot::from_content(&page.body, &self.rules)
            }
            Err(e) => {
                tracing::warn!("Robots policy unavailable, using default: {}", e);
                PolicySnapshot::permissive(self.rules.default_crawl_delay_ms)
            }
        }
    }
}
