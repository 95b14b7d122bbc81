//! Headless Chromium renderer
//!
//! Every session launches its own browser process so cookie state is never
//! shared between sessions. The CDP handler runs on a spawned task for the
//! lifetime of the session. Navigation and reload both settle on the page's
//! `networkIdle` lifecycle event before returning.

use crate::render::{CookieRecord, RenderError, RenderSession, Renderer};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::EventLifecycleEvent;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::{Stream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Lifecycle event fired once a document has had no network activity for 500ms
const NETWORK_IDLE: &str = "networkIdle";

/// Renderer backed by a headless Chromium instance per session
#[derive(Debug, Clone)]
pub struct ChromiumRenderer {
    timeout: Duration,
}

impl ChromiumRenderer {
    /// Creates a renderer whose navigations time out after `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn open(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        let config = BrowserConfig::builder()
            .request_timeout(self.timeout)
            .arg("--no-sandbox")
            .build()
            .map_err(RenderError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            page: None,
            handler_task,
            timeout: self.timeout,
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
    timeout: Duration,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, RenderError> {
        self.page.as_ref().ok_or(RenderError::NotNavigated)
    }

    async fn with_timeout<T, F>(&self, url: &str, fut: F) -> Result<T, RenderError>
    where
        F: Future<Output = Result<T, CdpError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(RenderError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(RenderError::Timeout {
                url: url.to_string(),
            }),
        }
    }
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        if self.page.is_none() {
            let page = self
                .browser
                .new_page("about:blank")
                .await
                .map_err(|e| RenderError::Session(e.to_string()))?;
            self.page = Some(page);
        }

        let page = self.page()?;
        self.with_timeout(url, async {
            let mut events = page.event_listener::<EventLifecycleEvent>().await?;
            page.goto(url).await?;
            wait_for_network_idle(&mut events).await;
            Ok::<(), CdpError>(())
        })
        .await
    }

    async fn cookies(&mut self) -> Result<Vec<CookieRecord>, RenderError> {
        let cookies = self
            .page()?
            .get_cookies()
            .await
            .map_err(|e| RenderError::Session(e.to_string()))?;

        Ok(cookies
            .into_iter()
            .map(|c| CookieRecord {
                domain: Some(c.domain),
                path: Some(c.path),
                secure: Some(c.secure),
                http_only: Some(c.http_only),
                ..CookieRecord::new(c.name, c.value)
            })
            .collect())
    }

    async fn reload(&mut self) -> Result<(), RenderError> {
        let page = self.page()?;
        let url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| "about:blank".to_string());
        self.with_timeout(&url, async {
            let mut events = page.event_listener::<EventLifecycleEvent>().await?;
            page.reload().await?;
            wait_for_network_idle(&mut events).await;
            Ok::<(), CdpError>(())
        })
        .await
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                tracing::warn!("Failed to close page: {}", e);
            }
        }

        let result = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| RenderError::Session(e.to_string()));
        if let Err(e) = self.browser.wait().await {
            tracing::warn!("Browser process did not exit cleanly: {}", e);
        }
        self.handler_task.abort();

        result
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        // `Browser` kills its own process on drop
        self.handler_task.abort();
    }
}

/// Waits for `networkIdle` on the first document loaded after subscribing
///
/// Events from documents that were already loading are skipped by matching
/// on the loader id of the first `init` event. A closed stream ends the wait.
async fn wait_for_network_idle<S>(events: &mut S)
where
    S: Stream<Item = Arc<EventLifecycleEvent>> + Unpin,
{
    let mut loader = None;
    while let Some(event) = events.next().await {
        match event.name.as_str() {
            "init" if loader.is_none() => loader = Some(event.loader_id.clone()),
            NETWORK_IDLE if loader.as_ref() == Some(&event.loader_id) => return,
            _ => {}
        }
    }
}
