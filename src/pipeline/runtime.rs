//! Local pipeline runtime
//!
//! Runs the three stages in-process: one channel queue per stage, a pool of
//! tokio workers per queue and at-least-once redelivery of failed tasks.
//!
//! Workers dispatch on the message variant, so a body always reaches the
//! stage that owns its type regardless of the queue it was read from.

use crate::config::{Config, LinkRouting};
use crate::output::{PipelineStats, StatsSnapshot};
use crate::pipeline::{CrawlStage, IngestionStage, PageFetcher, ScrapeStage};
use crate::queue::{
    decode, ChannelQueue, Delivery, DeliveryReceiver, InFlight, QueueError, SubmitTask,
    TaskMessage, TaskQueue,
};
use crate::render::Renderer;
use crate::robots::PolitenessResolver;
use crate::storage::{ExtractedStore, VisitedStore};
use crate::{CrawlError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// External collaborators the pipeline runs against
#[derive(Clone)]
pub struct PipelineDeps {
    pub fetcher: Arc<dyn PageFetcher>,
    pub renderer: Arc<dyn Renderer>,
    pub visited: Arc<dyn VisitedStore>,
    pub extracted: Arc<dyn ExtractedStore>,
}

/// The three stage handlers
#[derive(Clone)]
struct Stages {
    ingestion: IngestionStage,
    crawl: CrawlStage,
    scrape: ScrapeStage,
}

impl Stages {
    async fn handle(&self, message: &TaskMessage) -> Result<()> {
        match message {
            TaskMessage::Submit(task) => self.ingestion.ingest(&task.url).await.map(|_| ()),
            TaskMessage::Crawl(task) => self.crawl.crawl(task).await.map(|_| ()),
            TaskMessage::Scrape(task) => self.scrape.scrape(task).await.map(|_| ()),
        }
    }
}

/// Delivery policy shared by every worker
#[derive(Debug, Clone, Copy)]
struct DeliveryPolicy {
    max_attempts: u32,
    retry_backoff: Duration,
    task_timeout: Option<Duration>,
}

/// A running pipeline
pub struct Pipeline {
    ingest_queue: ChannelQueue,
    in_flight: Arc<InFlight>,
    stats: Arc<PipelineStats>,
    shutdown: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Builds the stages and spawns their worker pools
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &Config, deps: PipelineDeps) -> Self {
        let settings = &config.pipeline;
        let in_flight = Arc::new(InFlight::new());
        let stats = Arc::new(PipelineStats::new());

        let (ingest_queue, ingest_rx) = ChannelQueue::new("ingest", Arc::clone(&in_flight));
        let (crawl_queue, crawl_rx) = ChannelQueue::new("crawl", Arc::clone(&in_flight));
        let (scrape_queue, scrape_rx) = ChannelQueue::new("scrape", Arc::clone(&in_flight));

        let resolver = PolitenessResolver::new(Arc::clone(&deps.fetcher), &config.politeness);
        let link_queue: Arc<dyn TaskQueue> = match settings.link_routing {
            LinkRouting::Scrape => Arc::new(scrape_queue.clone()),
            LinkRouting::Ingest => Arc::new(ingest_queue.clone()),
        };

        let stages = Arc::new(Stages {
            ingestion: IngestionStage::new(
                deps.visited,
                resolver,
                Arc::new(crawl_queue.clone()),
                Arc::new(scrape_queue.clone()),
                Arc::clone(&stats),
            ),
            crawl: CrawlStage::new(
                deps.fetcher,
                link_queue,
                settings.link_routing,
                Arc::clone(&stats),
            ),
            scrape: ScrapeStage::new(deps.renderer, deps.extracted, Arc::clone(&stats)),
        });

        let policy = DeliveryPolicy {
            max_attempts: settings.max_attempts.max(1),
            retry_backoff: Duration::from_millis(settings.retry_backoff_ms),
            task_timeout: settings.task_timeout_secs.map(Duration::from_secs),
        };

        let (shutdown, shutdown_rx) = watch::channel(false);
        let mut workers = Vec::new();

        for (queue, receiver, count) in [
            (ingest_queue.clone(), ingest_rx, settings.ingest_workers),
            (crawl_queue, crawl_rx, settings.crawl_workers),
            (scrape_queue, scrape_rx, settings.scrape_workers),
        ] {
            for _ in 0..count.max(1) {
                workers.push(tokio::spawn(worker_loop(
                    queue.clone(),
                    Arc::clone(&receiver),
                    Arc::clone(&stages),
                    Arc::clone(&stats),
                    policy,
                    shutdown_rx.clone(),
                )));
            }
        }

        tracing::info!(
            "Pipeline started ({} ingest, {} crawl, {} scrape workers)",
            settings.ingest_workers,
            settings.crawl_workers,
            settings.scrape_workers
        );

        Self {
            ingest_queue,
            in_flight,
            stats,
            shutdown,
            workers,
        }
    }

    /// Submits a raw URL to the ingest queue
    pub fn submit(&self, raw: &str) -> Result<()> {
        self.ingest_queue
            .send(&TaskMessage::Submit(SubmitTask {
                url: raw.to_string(),
            }))
            .map_err(|e| rejected_submission(&self.stats, e))?;
        self.stats.record_submitted();
        Ok(())
    }

    /// Current counter values
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Waits until every queue is drained and no task is running, then stops
    /// the workers
    pub async fn run_until_idle(self) -> StatsSnapshot {
        self.in_flight.wait_idle().await;
        tracing::info!("All queues drained");
        self.shutdown().await
    }

    /// Stops the workers without waiting for queued work
    pub async fn shutdown(self) -> StatsSnapshot {
        // Receivers only disappear when every worker has already exited
        let _ = self.shutdown.send(true);

        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!("Pipeline worker panicked: {}", e);
            }
        }

        self.stats.snapshot()
    }
}

/// Counts a rejected submission as invalid only when the URL itself was malformed
fn rejected_submission(stats: &PipelineStats, e: QueueError) -> CrawlError {
    if matches!(e, QueueError::Malformed(_)) {
        stats.record_invalid();
    }
    CrawlError::from(e)
}

async fn worker_loop(
    queue: ChannelQueue,
    receiver: DeliveryReceiver,
    stages: Arc<Stages>,
    stats: Arc<PipelineStats>,
    policy: DeliveryPolicy,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let delivery = {
            let mut receiver = receiver.lock().await;
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                delivery = receiver.recv() => delivery,
                _ = shutdown.changed() => None,
            }
        };

        let Some(delivery) = delivery else {
            break;
        };

        process(&queue, &stages, &stats, policy, &delivery).await;
        queue.complete();
    }
}

async fn process(
    queue: &ChannelQueue,
    stages: &Stages,
    stats: &PipelineStats,
    policy: DeliveryPolicy,
    delivery: &Delivery,
) {
    let message = match decode(&delivery.body) {
        Ok(message) => message,
        Err(e) => {
            tracing::error!("Dropping malformed message on '{}' queue: {}", queue.name(), e);
            stats.record_failure();
            return;
        }
    };

    let result = match policy.task_timeout {
        Some(limit) => match tokio::time::timeout(limit, stages.handle(&message)).await {
            Ok(result) => result,
            Err(_) => Err(CrawlError::TaskTimeout {
                url: message.url().to_string(),
                secs: limit.as_secs(),
            }),
        },
        None => stages.handle(&message).await,
    };

    let Err(e) = result else {
        return;
    };

    if e.is_retryable() && delivery.attempt < policy.max_attempts {
        tracing::warn!(
            "{} task for {} failed (attempt {}/{}), redelivering: {}",
            message.kind(),
            message.url(),
            delivery.attempt,
            policy.max_attempts,
            e
        );
        stats.record_retry();
        queue.redeliver(delivery, policy.retry_backoff);
    } else {
        tracing::error!(
            "Dropping {} task for {} after {} attempt(s): {}",
            message.kind(),
            message.url(),
            delivery.attempt,
            e
        );
        stats.record_failure();
    }
}
