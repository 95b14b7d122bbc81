//! Output module for run statistics
//!
//! This module handles:
//! - Counting stage outcomes while the pipeline runs
//! - Summarizing the durable stores
//! - Printing both as a report

pub mod stats;

pub use stats::{
    load_store_summary, print_statistics, PipelineStats, StatsSnapshot, StoreSummary,
};
