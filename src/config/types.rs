use serde::Deserialize;

/// Main configuration structure for Polite-Crawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Raw URLs submitted to the ingest stage at start-up
    #[serde(default)]
    pub seeds: Vec<String>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub politeness: PolitenessConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    pub storage: StorageConfig,
}

/// Worker pool and delivery configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PipelineConfig {
    /// Concurrent ingest tasks
    pub ingest_workers: usize,

    /// Concurrent crawl tasks
    pub crawl_workers: usize,

    /// Concurrent scrape tasks
    pub scrape_workers: usize,

    /// Deliveries of a task before it is dropped
    pub max_attempts: u32,

    /// Pause before a failed task is redelivered (milliseconds)
    pub retry_backoff_ms: u64,

    /// Execution budget after which a task is abandoned and redelivered
    pub task_timeout_secs: Option<u64>,

    /// Timeout for page and robots fetches
    pub fetch_timeout_secs: u64,

    /// Where links discovered by the crawl stage are sent
    pub link_routing: LinkRouting,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ingest_workers: 2,
            crawl_workers: 4,
            scrape_workers: 2,
            max_attempts: 3,
            retry_backoff_ms: 500,
            task_timeout_secs: None,
            fetch_timeout_secs: 30,
            link_routing: LinkRouting::default(),
        }
    }
}

/// Destination of links discovered on crawled pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkRouting {
    /// Straight to the scrape queue, raw and without dedup
    #[default]
    Scrape,
    /// Back through ingestion for dedup and politeness checks
    Ingest,
}

/// Politeness defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PolitenessConfig {
    /// Delay used when a site sets no Crawl-delay (milliseconds)
    pub default_crawl_delay_ms: u64,

    /// Upper bound on a parsed Crawl-delay (milliseconds)
    pub max_crawl_delay_ms: u64,

    /// Unit of the number in a `Crawl-delay` line
    pub crawl_delay_unit: CrawlDelayUnit,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            default_crawl_delay_ms: crate::robots::DEFAULT_CRAWL_DELAY_MS,
            max_crawl_delay_ms: 60_000,
            crawl_delay_unit: CrawlDelayUnit::default(),
        }
    }
}

/// How the value of a `Crawl-delay` line is read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlDelayUnit {
    /// The value is used as milliseconds unchanged
    #[default]
    Millis,
    /// The value is seconds, as most robots files intend
    Seconds,
}

impl CrawlDelayUnit {
    /// Converts a parsed `Crawl-delay` value to milliseconds
    pub fn to_millis(self, value: u64) -> u64 {
        match self {
            Self::Millis => value,
            Self::Seconds => value.saturating_mul(1000),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Scrape stage rendering configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RendererConfig {
    pub kind: RendererKind,

    /// Timeout for each navigation or reload
    pub navigation_timeout_secs: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            kind: RendererKind::default(),
            navigation_timeout_secs: 30,
        }
    }
}

/// Rendering backend used by the scrape stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Plain HTTP session with a cookie jar
    #[default]
    Http,
    /// Headless Chromium (requires the `chromium` feature)
    Chromium,
}

/// Durable store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}
