//! Queue message types
//!
//! Every body on a queue is a JSON object tagged with its variant:
//!
//! ```json
//! {"type": "submit", "url": "example.com"}
//! {"type": "crawl", "url": "https://www.example.com/", "delay": 1000}
//! {"type": "scrape", "url": "https://www.example.com/about"}
//! ```
//!
//! Bodies are validated on decode so a malformed payload fails before any
//! stage logic runs.

use crate::queue::QueueError;
use crate::url::{normalize, NormalizedUrl};
use serde::{Deserialize, Serialize};

/// Raw URL submission waiting for ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitTask {
    pub url: String,
}

/// Instruction to fetch a page and discover its links
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlTask {
    pub url: NormalizedUrl,

    /// Crawl delay frozen at ingestion (milliseconds)
    #[serde(rename = "delay")]
    pub delay_ms: u64,
}

/// Instruction to render a page and capture its cookies
///
/// The URL is not normalized: discovered links are carried as found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeTask {
    pub url: String,
}

/// A message body on any pipeline queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskMessage {
    Submit(SubmitTask),
    Crawl(CrawlTask),
    Scrape(ScrapeTask),
}

impl TaskMessage {
    /// The URL the message refers to
    pub fn url(&self) -> &str {
        match self {
            Self::Submit(task) => &task.url,
            Self::Crawl(task) => task.url.as_str(),
            Self::Scrape(task) => &task.url,
        }
    }

    /// Short name of the variant, as used in the `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Submit(_) => "submit",
            Self::Crawl(_) => "crawl",
            Self::Scrape(_) => "scrape",
        }
    }

    /// Checks the payload invariants that serde cannot express
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.url().trim().is_empty() {
            return Err(QueueError::Malformed(format!(
                "{} task has an empty url",
                self.kind()
            )));
        }

        match self {
            Self::Submit(_) => Ok(()),
            Self::Crawl(task) => match normalize(task.url.as_str()) {
                Ok(normalized) if normalized == task.url => Ok(()),
                Ok(normalized) => Err(QueueError::Malformed(format!(
                    "crawl task url '{}' is not normalized (expected '{}')",
                    task.url, normalized
                ))),
                Err(e) => Err(QueueError::Malformed(e.to_string())),
            },
            Self::Scrape(task) => url::Url::parse(&task.url)
                .map(|_| ())
                .map_err(|e| {
                    QueueError::Malformed(format!("scrape task url '{}': {}", task.url, e))
                }),
        }
    }
}

impl From<SubmitTask> for TaskMessage {
    fn from(task: SubmitTask) -> Self {
        Self::Submit(task)
    }
}

impl From<CrawlTask> for TaskMessage {
    fn from(task: CrawlTask) -> Self {
        Self::Crawl(task)
    }
}

impl From<ScrapeTask> for TaskMessage {
    fn from(task: ScrapeTask) -> Self {
        Self::Scrape(task)
    }
}

/// Serializes a message into a queue body
pub fn encode(message: &TaskMessage) -> Result<String, QueueError> {
    message.validate()?;
    Ok(serde_json::to_string(message)?)
}

/// Parses and validates a queue body
pub fn decode(body: &str) -> Result<TaskMessage, QueueError> {
    let message: TaskMessage =
        serde_json::from_str(body).map_err(|e| QueueError::Malformed(e.to_string()))?;
    message.validate()?;
    Ok(message)
}
