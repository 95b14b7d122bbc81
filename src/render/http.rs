//! HTTP session renderer
//!
//! Each session owns a fresh reqwest client and cookie jar, so sessions never
//! share cookie state. Navigation and reload are GET requests whose bodies are
//! read to completion; the page is settled once the body has arrived.

use crate::render::{CookieRecord, RenderError, RenderSession, Renderer};
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Renderer backed by plain HTTP requests
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    user_agent: String,
    timeout: Duration,
}

impl HttpRenderer {
    /// Creates a renderer
    ///
    /// # Arguments
    ///
    /// * `user_agent` - User agent sent with every request
    /// * `timeout` - Timeout for each navigation or reload
    pub fn new(user_agent: String, timeout: Duration) -> Self {
        Self {
            user_agent,
            timeout,
        }
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn open(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .user_agent(self.user_agent.as_str())
            .cookie_provider(Arc::clone(&jar))
            .timeout(self.timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        Ok(Box::new(HttpSession {
            client: Some(client),
            jar,
            current: None,
        }))
    }
}

/// One cookie-isolated HTTP session
struct HttpSession {
    client: Option<Client>,
    jar: Arc<Jar>,
    current: Option<Url>,
}

impl HttpSession {
    async fn load(&self, url: &Url) -> Result<(), RenderError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| RenderError::Session("session already closed".to_string()))?;

        let response = client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                RenderError::Timeout {
                    url: url.to_string(),
                }
            } else {
                RenderError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        // Drain the body so every Set-Cookie on the way has been applied
        response
            .bytes()
            .await
            .map_err(|e| RenderError::Navigation {
                url: url.to_string(),
                message: format!("failed to read body: {}", e),
            })?;

        Ok(())
    }
}

#[async_trait]
impl RenderSession for HttpSession {
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        let parsed = Url::parse(url).map_err(|e| RenderError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        self.load(&parsed).await?;
        self.current = Some(parsed);
        Ok(())
    }

    async fn cookies(&mut self) -> Result<Vec<CookieRecord>, RenderError> {
        let url = self.current.as_ref().ok_or(RenderError::NotNavigated)?;
        Ok(parse_cookie_header(&self.jar, url))
    }

    async fn reload(&mut self) -> Result<(), RenderError> {
        let url = self.current.clone().ok_or(RenderError::NotNavigated)?;
        self.load(&url).await
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        // Dropping the client releases its connection pool
        self.client = None;
        self.current = None;
        Ok(())
    }
}

/// Reads the cookies the jar would send to `url`
fn parse_cookie_header(jar: &Jar, url: &Url) -> Vec<CookieRecord> {
    let header = match jar.cookies(url) {
        Some(header) => header,
        None => return Vec::new(),
    };

    let Ok(header) = header.to_str() else {
        return Vec::new();
    };

    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some(CookieRecord {
                domain: url.host_str().map(str::to_string),
                ..CookieRecord::new(name, value)
            })
        })
        .collect()
}
