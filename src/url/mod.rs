//! URL handling module for Polite-Crawl
//!
//! This module provides URL normalization and the `NormalizedUrl` type used as
//! the deduplication key throughout the pipeline.

mod normalize;

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export main functions
pub use normalize::normalize;

/// Canonical string form of a URL
///
/// Two submissions that normalize to the same `NormalizedUrl` are the same
/// crawl target. Values are only produced by [`normalize`] or read back from
/// storage, so the invariants documented there hold for every instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    /// Wraps a string that is already in normalized form
    ///
    /// Used when reading records back from a store, where the key was written
    /// by the pipeline itself.
    pub(crate) fn from_normalized(url: String) -> Self {
        Self(url)
    }

    /// Returns the URL as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the URL of the site's robots policy
    ///
    /// This is plain concatenation onto the normalized URL, so a URL with a
    /// path yields a policy URL under that path.
    pub fn robots_url(&self) -> String {
        format!("{}robots.txt", self.0)
    }

    /// Consumes the wrapper and returns the inner string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
