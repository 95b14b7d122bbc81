//! Pipeline module
//!
//! This module contains the three stages and the runtime that drives them:
//! - Ingestion: normalize, deduplicate, resolve politeness, emit tasks
//! - Crawl: wait out the crawl delay, fetch, forward discovered links
//! - Scrape: render, capture cookies around a reload, persist
//!
//! Stages receive their collaborators as trait objects, so each one can be
//! driven directly with in-memory fakes.

mod crawl;
mod fetcher;
mod ingest;
mod parser;
mod runtime;
mod scrape;

pub use crawl::CrawlStage;
pub use fetcher::{
    build_http_client, user_agent_string, FetchError, FetchedPage, HttpFetcher, PageFetcher,
};
pub use ingest::{IngestOutcome, IngestionStage};
pub use parser::extract_links;
pub use runtime::{Pipeline, PipelineDeps};
pub use scrape::ScrapeStage;
