//! # Worker Pool
//!
//! Spawns `workers.count` independent [`Worker`]s onto a caller-owned `JoinSet`.
//! Workers are named `worker-<n>` so every log line can be traced to one of them.

use super::{Worker, WorkerSettings, WorkerStats};
use crate::config::BrokerConfig;
use crate::error::BrokerResult;
use crate::queue::{JobQueue, RetryPolicy};
use crate::registry::CommandRegistry;
use crate::shutdown::ShutdownSignal;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::info;

/// Named result of a finished background task
pub type TaskExit = (String, BrokerResult<()>);

#[derive(Debug)]
pub struct WorkerPool {
    workers: Vec<Worker>,
    stats: Arc<WorkerStats>,
}

impl WorkerPool {
    pub fn new(
        config: &BrokerConfig,
        queue: Arc<dyn JobQueue>,
        registry: Arc<CommandRegistry>,
    ) -> Self {
        let stats = Arc::new(WorkerStats::default());
        let retry = RetryPolicy::from_config(&config.queue);
        let settings = WorkerSettings::from_config(config);

        let workers = (0..config.workers.count)
            .map(|index| {
                Worker::new(
                    format!("worker-{index}"),
                    Arc::clone(&queue),
                    Arc::clone(&registry),
                    retry,
                    settings.clone(),
                )
                .with_stats(Arc::clone(&stats))
            })
            .collect();

        Self { workers, stats }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Spawn every worker; each reports `(worker_id, result)` when it stops
    pub fn spawn(self, tasks: &mut JoinSet<TaskExit>, shutdown: &ShutdownSignal) {
        info!(workers = self.workers.len(), "🚀 Starting worker pool");
        for worker in self.workers {
            let shutdown = shutdown.clone();
            tasks.spawn(async move {
                let worker_id = worker.worker_id().to_string();
                (worker_id, worker.run(shutdown).await)
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::InMemoryQueue;

    #[tokio::test]
    async fn test_spawns_configured_number_of_workers() {
        let mut config = BrokerConfig::default();
        config.workers.count = 3;
        let pool = WorkerPool::new(
            &config,
            Arc::new(InMemoryQueue::new()),
            Arc::new(CommandRegistry::new()),
        );
        assert_eq!(pool.size(), 3);

        let shutdown = ShutdownSignal::new();
        let mut tasks = JoinSet::new();
        pool.spawn(&mut tasks, &shutdown);
        shutdown.trigger();

        let mut names = Vec::new();
        while let Some(exit) = tasks.join_next().await {
            let (name, result) = exit.unwrap();
            assert!(result.is_ok());
            names.push(name);
        }
        names.sort();
        assert_eq!(names, vec!["worker-0", "worker-1", "worker-2"]);
    }
}
