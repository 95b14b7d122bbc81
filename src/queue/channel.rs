//! In-process channel queue
//!
//! Bodies travel over an unbounded tokio channel shared by a stage's workers.
//! Every queue of a pipeline reports to one [`InFlight`] counter: a body counts
//! from the moment it is sent until its consumer calls
//! [`ChannelQueue::complete`], so a redelivery is counted before the original
//! delivery is released and the counter only reaches zero once all work is done.

use crate::queue::{encode, QueueError, TaskMessage, TaskQueue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify};

/// One delivery of a queue body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub body: String,
    /// Starts at 1 and grows with every redelivery
    pub attempt: u32,
}

/// Receiving end shared by the workers of one stage
pub type DeliveryReceiver = Arc<Mutex<mpsc::UnboundedReceiver<Delivery>>>;

/// Count of deliveries that are queued or being processed
#[derive(Debug, Default)]
pub struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    fn acquire(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Waits until no delivery is queued or in progress
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Unbounded in-process queue with at-least-once redelivery
#[derive(Debug, Clone)]
pub struct ChannelQueue {
    name: String,
    sender: mpsc::UnboundedSender<Delivery>,
    in_flight: Arc<InFlight>,
}

impl ChannelQueue {
    /// Creates a queue and the receiver its consumers share
    pub fn new(name: impl Into<String>, in_flight: Arc<InFlight>) -> (Self, DeliveryReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let queue = Self {
            name: name.into(),
            sender,
            in_flight,
        };
        (queue, Arc::new(Mutex::new(receiver)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn push(&self, delivery: Delivery) -> Result<(), QueueError> {
        self.in_flight.acquire();
        self.sender.send(delivery).map_err(|_| {
            self.in_flight.release();
            QueueError::Closed(self.name.clone())
        })
    }

    /// Marks a received delivery as finished
    ///
    /// Must be called exactly once per delivery taken off the receiver.
    pub fn complete(&self) {
        self.in_flight.release();
    }

    /// Puts a failed delivery back on the queue after `backoff`
    ///
    /// The redelivery is counted as in flight immediately, so the caller may
    /// [`complete`](Self::complete) the original delivery right away.
    pub fn redeliver(&self, delivery: &Delivery, backoff: Duration) {
        let retry = Delivery {
            body: delivery.body.clone(),
            attempt: delivery.attempt + 1,
        };

        self.in_flight.acquire();
        let queue = self.clone();
        tokio::spawn(async move {
            if !backoff.is_zero() {
                tokio::time::sleep(backoff).await;
            }
            if queue.push(retry).is_err() {
                tracing::warn!("Queue '{}' closed before redelivery", queue.name);
            }
            queue.in_flight.release();
        });
    }
}

impl TaskQueue for ChannelQueue {
    fn send(&self, message: &TaskMessage) -> Result<(), QueueError> {
        let body = encode(message)?;
        self.push(Delivery { body, attempt: 1 })
    }
}
