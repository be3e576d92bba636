//! # Worker
//!
//! A worker drains the work queue one job at a time: decode, validate and run
//! the command, then push the response for the router to deliver. Workers share
//! nothing with each other or with the router except the queue and the
//! read-only [`CommandRegistry`].
//!
//! A failing or panicking command never stops a worker; its failure becomes the
//! job's response. The only error that ends [`Worker::run`] is a response write
//! that exhausted its retries.

pub mod pool;

use crate::config::BrokerConfig;
use crate::error::BrokerResult;
use crate::logging::{log_error, log_job_operation};
use crate::messaging::{CommandResponse, Job, JobId, ResponseRecord, WorkRecord};
use crate::queue::{JobQueue, QueueResult, RetryPolicy};
use crate::registry::{CommandContext, CommandRegistry};
use crate::shutdown::ShutdownSignal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub use pool::WorkerPool;

/// What one worker iteration did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerTick {
    /// Work queue was empty
    Idle,
    /// A response was queued for this job
    Processed(JobId),
    /// A record was popped that could not be turned into a job
    Discarded,
    /// The queue could not be read
    Backoff,
}

/// Counters shared by all workers of a pool
#[derive(Debug, Default)]
pub struct WorkerStats {
    pub processed: AtomicU64,
    pub failed: AtomicU64,
    pub discarded: AtomicU64,
}

impl WorkerStats {
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

/// Queue names and pacing for one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    pub work_queue: String,
    pub response_queue: String,
    pub response_ttl: Duration,
    pub idle_backoff: Duration,
    pub error_backoff: Duration,
}

impl WorkerSettings {
    pub fn from_config(config: &BrokerConfig) -> Self {
        Self {
            work_queue: config.queue.work_queue.clone(),
            response_queue: config.queue.response_queue.clone(),
            response_ttl: config.queue.response_ttl(),
            idle_backoff: config.workers.idle_backoff(),
            error_backoff: config.workers.error_backoff(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Worker {
    worker_id: String,
    queue: Arc<dyn JobQueue>,
    registry: Arc<CommandRegistry>,
    retry: RetryPolicy,
    settings: WorkerSettings,
    stats: Arc<WorkerStats>,
}

impl Worker {
    pub fn new(
        worker_id: impl Into<String>,
        queue: Arc<dyn JobQueue>,
        registry: Arc<CommandRegistry>,
        retry: RetryPolicy,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            queue,
            registry,
            retry,
            settings,
            stats: Arc::new(WorkerStats::default()),
        }
    }

    /// Share counters with other workers
    pub fn with_stats(mut self, stats: Arc<WorkerStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn stats(&self) -> &Arc<WorkerStats> {
        &self.stats
    }

    /// Pop and fully handle at most one job
    pub async fn process_next(&self) -> BrokerResult<WorkerTick> {
        let record = match self.queue.pop(&self.settings.work_queue).await {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(WorkerTick::Idle),
            Err(e) => {
                log_error("worker", "pop", &e.to_string(), Some(&self.worker_id));
                return Ok(WorkerTick::Backoff);
            }
        };

        let job = match WorkRecord::from_record(&record).and_then(WorkRecord::into_job) {
            Ok(job) => job,
            Err(e) => {
                warn!(worker_id = %self.worker_id, error = %e, "Discarding undecodable work record");
                self.stats.discarded.fetch_add(1, Ordering::Relaxed);
                return Ok(WorkerTick::Discarded);
            }
        };

        let response = self.execute(&job).await;
        if response.is_success() {
            self.stats.processed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
        }

        let record = ResponseRecord::new(&job, &response).to_record()?;
        if let Err(e) = self.put_response(&record).await {
            error!(
                worker_id = %self.worker_id,
                job_id = %job.job_id,
                error = %e,
                "💥 Response queue unreachable, giving up"
            );
            return Err(e.into());
        }

        Ok(WorkerTick::Processed(job.job_id))
    }

    async fn execute(&self, job: &Job) -> CommandResponse {
        let request = match job.request() {
            Ok(request) => request,
            Err(e) => {
                warn!(worker_id = %self.worker_id, job_id = %job.job_id, error = %e, "Malformed job payload");
                return CommandResponse::from(e);
            }
        };

        log_job_operation(
            "execute",
            job.job_id.as_str(),
            Some(&request.command),
            Some(&self.worker_id),
            "started",
            None,
        );

        let ctx = CommandContext::new(job.job_id.clone(), self.worker_id.clone());
        self.registry.dispatch(&request, &ctx).await
    }

    async fn put_response(&self, record: &str) -> QueueResult<()> {
        let queue = &self.queue;
        let name = self.settings.response_queue.as_str();
        let ttl = self.settings.response_ttl;

        self.retry
            .run(name, "push", move || async move { queue.push(name, record).await })
            .await?;

        // the response is already queued for egress
        if let Err(e) = self
            .retry
            .run(name, "expire", move || async move { queue.expire(name, ttl).await })
            .await
        {
            warn!(
                worker_id = %self.worker_id,
                queue = %name,
                error = %e,
                "Response queue expiry not refreshed"
            );
        }
        Ok(())
    }

    /// Process jobs until shutdown or a fatal queue failure
    pub async fn run(self, shutdown: ShutdownSignal) -> BrokerResult<()> {
        info!(worker_id = %self.worker_id, "🚀 Worker started");

        while !shutdown.is_triggered() {
            match self.process_next().await? {
                WorkerTick::Idle => tokio::time::sleep(self.settings.idle_backoff).await,
                WorkerTick::Backoff => tokio::time::sleep(self.settings.error_backoff).await,
                WorkerTick::Processed(_) | WorkerTick::Discarded => {
                    tokio::task::yield_now().await
                }
            }
        }

        debug!(worker_id = %self.worker_id, "Worker stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::register_builtin_commands;
    use crate::messaging::ClientEnvelope;
    use crate::queue::InMemoryQueue;

    fn worker(queue: Arc<InMemoryQueue>) -> Worker {
        let mut registry = CommandRegistry::new();
        register_builtin_commands(&mut registry);
        Worker::new(
            "worker-0",
            queue,
            Arc::new(registry),
            RetryPolicy::default(),
            WorkerSettings::from_config(&BrokerConfig::default()),
        )
    }

    async fn push_job(queue: &InMemoryQueue, payload: &str) -> JobId {
        let job_id = JobId::generate();
        let record = WorkRecord::new(&job_id, &ClientEnvelope::new(b"peer".to_vec(), None), payload.as_bytes())
            .to_record()
            .unwrap();
        queue.push("job_queue", &record).await.unwrap();
        job_id
    }

    async fn pop_response(queue: &InMemoryQueue) -> (ResponseRecord, CommandResponse) {
        let record = queue.pop("response_queue").await.unwrap().unwrap();
        let record = ResponseRecord::from_record(&record).unwrap();
        let response = CommandResponse::from_bytes(&record.payload().unwrap()).unwrap();
        (record, response)
    }

    #[tokio::test]
    async fn test_idle_on_empty_queue() {
        let worker = worker(Arc::new(InMemoryQueue::new()));
        assert_eq!(worker.process_next().await.unwrap(), WorkerTick::Idle);
    }

    #[tokio::test]
    async fn test_response_keeps_job_id_and_client() {
        let queue = Arc::new(InMemoryQueue::new());
        let worker = worker(queue.clone());
        let job_id = push_job(&queue, r#"{"command":"dnd_dice_roll","params":{"rolls":["1d20"]}}"#).await;

        assert_eq!(
            worker.process_next().await.unwrap(),
            WorkerTick::Processed(job_id.clone())
        );

        let (record, response) = pop_response(&queue).await;
        assert_eq!(record.job_id, job_id);
        assert_eq!(record.client, hex::encode(b"peer"));
        assert!(response.is_success());
        assert_eq!(worker.stats().processed(), 1);
    }

    #[tokio::test]
    async fn test_unknown_command_still_gets_a_response() {
        let queue = Arc::new(InMemoryQueue::new());
        let worker = worker(queue.clone());
        push_job(&queue, r#"{"command":"nope","params":{}}"#).await;

        worker.process_next().await.unwrap();
        let (_, response) = pop_response(&queue).await;
        assert!(!response.is_success());
        assert_eq!(worker.stats().failed(), 1);
    }

    #[tokio::test]
    async fn test_garbage_record_is_discarded() {
        let queue = Arc::new(InMemoryQueue::new());
        let worker = worker(queue.clone());
        queue.push("job_queue", "garbage").await.unwrap();

        assert_eq!(worker.process_next().await.unwrap(), WorkerTick::Discarded);
        assert_eq!(queue.len("response_queue").await.unwrap(), 0);
        assert_eq!(worker.stats().discarded(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let worker = worker(Arc::new(InMemoryQueue::new()));
        let shutdown = ShutdownSignal::new();
        let handle = tokio::spawn(worker.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.trigger();
        assert!(handle.await.unwrap().is_ok());
    }
}
