//! Page rendering module
//!
//! The scrape stage drives a rendering session through navigate, capture,
//! reload, capture, close. This module defines that contract, the cookie
//! snapshot types it produces and the available backends:
//! - [`HttpRenderer`]: one reqwest client with its own cookie jar per session
//! - `ChromiumRenderer`: headless Chromium (`chromium` feature)

#[cfg(feature = "chromium")]
mod chromium;
mod http;

#[cfg(feature = "chromium")]
pub use chromium::ChromiumRenderer;
pub use http::HttpRenderer;

use crate::config::{Config, RendererKind};
use crate::pipeline::user_agent_string;
use crate::CrawlError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a rendering backend
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to open rendering session: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("navigation to {url} timed out")]
    Timeout { url: String },

    #[error("session has not navigated to a page")]
    NotNavigated,

    #[error("session error: {0}")]
    Session(String),
}

/// A single cookie as observed by the rendering session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
}

impl CookieRecord {
    /// Creates a cookie with only a name and value
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            secure: None,
            http_only: None,
        }
    }
}

/// Cookie state captured before and after a full reload
///
/// Serialized as a two-element array `[before, after]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[Vec<CookieRecord>; 2]", into = "[Vec<CookieRecord>; 2]")]
pub struct CookieCapture {
    pub before_reload: Vec<CookieRecord>,
    pub after_reload: Vec<CookieRecord>,
}

impl From<[Vec<CookieRecord>; 2]> for CookieCapture {
    fn from([before_reload, after_reload]: [Vec<CookieRecord>; 2]) -> Self {
        Self {
            before_reload,
            after_reload,
        }
    }
}

impl From<CookieCapture> for [Vec<CookieRecord>; 2] {
    fn from(capture: CookieCapture) -> Self {
        [capture.before_reload, capture.after_reload]
    }
}

/// Factory for isolated rendering sessions
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Opens a fresh session sharing no state with other sessions
    async fn open(&self) -> Result<Box<dyn RenderSession>, RenderError>;
}

/// One isolated rendering session
///
/// Callers must call [`RenderSession::close`] on every path once the session
/// is open, including after a failed navigation.
#[async_trait]
pub trait RenderSession: Send {
    /// Navigates to `url` and waits for the page to load
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError>;

    /// Returns the cookies currently visible to the page
    async fn cookies(&mut self) -> Result<Vec<CookieRecord>, RenderError>;

    /// Reloads the current page and waits for it to settle
    async fn reload(&mut self) -> Result<(), RenderError>;

    /// Releases the session's resources
    async fn close(&mut self) -> Result<(), RenderError>;
}

/// Builds the renderer selected in the configuration
pub fn build_renderer(config: &Config) -> Result<Arc<dyn Renderer>, CrawlError> {
    let timeout = Duration::from_secs(config.renderer.navigation_timeout_secs);

    match config.renderer.kind {
        RendererKind::Http => Ok(Arc::new(HttpRenderer::new(
            user_agent_string(&config.user_agent),
            timeout,
        ))),
        #[cfg(feature = "chromium")]
        RendererKind::Chromium => Ok(Arc::new(ChromiumRenderer::new(timeout))),
        #[cfg(not(feature = "chromium"))]
        RendererKind::Chromium => Err(crate::ConfigError::Validation(
            "renderer kind \"chromium\" requires building with the `chromium` feature"
                .to_string(),
        )
        .into()),
    }
}
