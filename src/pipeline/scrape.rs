//! Scrape stage
//!
//! Renders a page in a fresh session and records its cookies before and after
//! a full reload. The session is closed on every path once it is open,
//! including when the scrape future is dropped mid-render.

use crate::output::PipelineStats;
use crate::queue::ScrapeTask;
use crate::render::{CookieCapture, RenderError, RenderSession, Renderer};
use crate::storage::{ExtractedRecord, ExtractedStore};
use crate::{CrawlError, Result};
use std::sync::Arc;

/// Scrape stage handler
#[derive(Clone)]
pub struct ScrapeStage {
    renderer: Arc<dyn Renderer>,
    extracted: Arc<dyn ExtractedStore>,
    stats: Arc<PipelineStats>,
}

impl ScrapeStage {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        extracted: Arc<dyn ExtractedStore>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            renderer,
            extracted,
            stats,
        }
    }

    /// Scrapes one page and appends the result to the extracted-data store
    pub async fn scrape(&self, task: &ScrapeTask) -> Result<ExtractedRecord> {
        let render_failed = |source: RenderError| CrawlError::RenderFailed {
            url: task.url.clone(),
            source,
        };

        let session = self.renderer.open().await.map_err(render_failed)?;
        let mut session = SessionGuard::new(session, &task.url);
        let captured = session.capture().await;
        session.close().await;

        let payload = captured.map_err(|e| {
            tracing::error!("Failed to render {}: {}", task.url, e);
            render_failed(e)
        })?;

        let record = ExtractedRecord::new(task.url.as_str(), payload);
        self.extracted.append(&record)?;

        tracing::info!(
            "Scraped {} ({} cookies before reload, {} after)",
            task.url,
            record.payload.before_reload.len(),
            record.payload.after_reload.len()
        );
        self.stats.record_scraped();

        Ok(record)
    }
}

/// Owns an open rendering session until it is closed
///
/// Dropping the guard with the session still open (a timed-out or cancelled
/// scrape) hands the close to a spawned task on the current runtime.
struct SessionGuard {
    session: Option<Box<dyn RenderSession>>,
    url: String,
}

impl SessionGuard {
    fn new(session: Box<dyn RenderSession>, url: &str) -> Self {
        Self {
            session: Some(session),
            url: url.to_string(),
        }
    }

    async fn capture(&mut self) -> std::result::Result<CookieCapture, RenderError> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| RenderError::Session("session already closed".to_string()))?;

        session.navigate(&self.url).await?;
        let before_reload = session.cookies().await?;
        session.reload().await?;
        let after_reload = session.cookies().await?;

        Ok(CookieCapture {
            before_reload,
            after_reload,
        })
    }

    async fn close(mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                tracing::warn!("Failed to close rendering session for {}: {}", self.url, e);
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        let url = std::mem::take(&mut self.url);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("Closing abandoned rendering session for {}", url);
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        tracing::warn!("Failed to close rendering session for {}: {}", url, e);
                    }
                });
            }
            Err(_) => {
                tracing::warn!("No runtime left to close rendering session for {}", url);
            }
        }
    }
}
