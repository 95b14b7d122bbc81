//! Polite-Crawl: a politeness-aware crawl pipeline
//!
//! This crate implements a three-stage crawl pipeline (ingest, crawl, scrape)
//! that deduplicates submitted URLs, respects per-site robots policies, discovers
//! outbound links and captures per-page cookie state into durable stores.

pub mod config;
pub mod output;
pub mod pipeline;
pub mod queue;
pub mod render;
pub mod robots;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for pipeline operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("Fetch failed: {0}")]
    DownstreamFetchFailed(#[from] pipeline::FetchError),

    #[error("Persist failed: {0}")]
    PersistFailed(#[from] storage::StorageError),

    #[error("Render failed for {url}: {source}")]
    RenderFailed {
        url: String,
        source: render::RenderError,
    },

    #[error("Malformed task payload: {0}")]
    MalformedTask(String),

    #[error("Task for {url} exceeded its {secs}s budget")]
    TaskTimeout { url: String, secs: u64 },

    #[error("Queue error: {0}")]
    Queue(#[from] queue::QueueError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlError {
    /// Returns true if redelivering the task could succeed
    ///
    /// Invalid input and malformed payloads fail the same way on every attempt
    /// and are dropped instead of redelivered.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::InvalidUrl(_) | Self::MalformedTask(_) | Self::Config(_)
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL '{input}': {message}")]
    Parse { input: String, message: String },

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use pipeline::{CrawlStage, IngestOutcome, IngestionStage, Pipeline, ScrapeStage};
pub use url::{normalize, NormalizedUrl};
