//! Task queue module
//!
//! Stages hand work to each other through queues of JSON message bodies with
//! at-least-once delivery. This module provides:
//! - The tagged message types and their wire encoding
//! - The [`TaskQueue`] send capability the stages depend on
//! - [`ChannelQueue`], the in-process queue driven by the local runtime
//! - [`MemoryQueue`], a recording queue for tests and dry runs

mod channel;
mod message;

pub use channel::{ChannelQueue, Delivery, DeliveryReceiver, InFlight};
pub use message::{decode, encode, CrawlTask, ScrapeTask, SubmitTask, TaskMessage};

use std::sync::Mutex;
use thiserror::Error;

/// Errors raised at the queue boundary
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("queue '{0}' is closed")]
    Closed(String),
}

/// Capability to enqueue a message
pub trait TaskQueue: Send + Sync {
    fn send(&self, message: &TaskMessage) -> Result<(), QueueError>;
}

/// Queue that records every message it is sent
///
/// Messages are validated and round-tripped through the wire encoding so a
/// test sees exactly what a real consumer would.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    messages: Mutex<Vec<TaskMessage>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded messages in send order
    pub fn messages(&self) -> Vec<TaskMessage> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// Removes and returns the recorded messages
    pub fn drain(&self) -> Vec<TaskMessage> {
        self.messages
            .lock()
            .map(|mut messages| std::mem::take(&mut *messages))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TaskQueue for MemoryQueue {
    fn send(&self, message: &TaskMessage) -> Result<(), QueueError> {
        let body = encode(message)?;
        let decoded = decode(&body)?;
        self.messages
            .lock()
            .map_err(|_| QueueError::Closed("memory".to_string()))?
            .push(decoded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_queue_records_in_order() {
        let queue = MemoryQueue::new();
        for path in ["a", "b"] {
            let message = TaskMessage::Scrape(ScrapeTask {
                url: format!("https://example.com/{}", path),
            });
            queue.send(&message).unwrap();
        }

        assert_eq!(queue.len(), 2);
        let drained = queue.drain();
        assert_eq!(drained[0].url(), "https://example.com/a");
        assert_eq!(drained[1].url(), "https://example.com/b");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_memory_queue_rejects_invalid_message() {
        let queue = MemoryQueue::new();
        let message = TaskMessage::Scrape(ScrapeTask { url: String::new() });
        assert!(matches!(queue.send(&message), Err(QueueError::Malformed(_))));
        assert!(queue.is_empty());
    }
}
