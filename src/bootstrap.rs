//! # Broker Bootstrap
//!
//! Wires configuration, queue, transport and registry into a running broker and
//! supervises its background tasks.
//!
//! ## Tasks
//!
//! ```text
//! BrokerSystem
//! ├── ingress            (socket -> work queue)
//! ├── egress             (response queue -> socket)
//! ├── worker-0..N        (work queue -> command -> response queue)
//! ├── correlation_sweep  (purges expired correlation entries and timers)
//! └── heartbeat          (periodic liveness line with live counts)
//! ```
//!
//! The first task to exit with an error is fatal: every other task is told to
//! stop and [`BrokerSystem::run_until_shutdown`] returns that error.

use crate::config::{BrokerConfig, QueueBackend, QueueConfig};
use crate::error::{BrokerError, BrokerResult};
use crate::logging::log_error;
use crate::queue::{InMemoryQueue, JobQueue};
use crate::registry::CommandRegistry;
use crate::router::Router;
use crate::shutdown::ShutdownSignal;
use crate::transport::{FrameTransport, ZmqRouterTransport};
use crate::worker::pool::TaskExit;
use crate::worker::{WorkerPool, WorkerStats};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

pub struct BrokerSystem {
    router: Arc<Router>,
    pool: Option<WorkerPool>,
    stats: Arc<WorkerStats>,
    registry: Arc<CommandRegistry>,
    shutdown: ShutdownSignal,
    tasks: JoinSet<TaskExit>,
    sweep_interval: Duration,
    heartbeat_interval: Duration,
}

impl std::fmt::Debug for BrokerSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerSystem")
            .field("router", &self.router)
            .field("commands", &self.registry.names())
            .field("running_tasks", &self.tasks.len())
            .finish()
    }
}

impl BrokerSystem {
    /// Assemble a broker from already-built parts without starting anything
    pub fn new(
        config: &BrokerConfig,
        transport: Arc<dyn FrameTransport>,
        queue: Arc<dyn JobQueue>,
        registry: CommandRegistry,
    ) -> Self {
        let registry = Arc::new(registry);
        let router = Arc::new(Router::new(transport, Arc::clone(&queue), config));
        let pool = WorkerPool::new(config, queue, Arc::clone(&registry));
        let stats = pool.stats();

        Self {
            router,
            pool: Some(pool),
            stats,
            registry,
            shutdown: ShutdownSignal::new(),
            tasks: JoinSet::new(),
            sweep_interval: config.correlation.sweep_interval(),
            heartbeat_interval: config.heartbeat.interval(),
        }
    }

    /// Bind the ROUTER socket, connect the configured queue and start every task
    pub async fn start(config: &BrokerConfig, registry: CommandRegistry) -> BrokerResult<Self> {
        config.validate()?;
        info!(
            commands = ?registry.names(),
            workers = config.workers.count,
            "🚀 Starting dispatch broker"
        );

        let queue = connect_queue(&config.queue).await?;
        let transport: Arc<dyn FrameTransport> = Arc::new(ZmqRouterTransport::bind(&config.router)?);

        let mut system = Self::new(config, transport, queue, registry);
        system.spawn();
        Ok(system)
    }

    /// Start every background task. Calling it again does nothing.
    pub fn spawn(&mut self) {
        let Some(pool) = self.pool.take() else {
            warn!("Broker tasks already started");
            return;
        };

        let router = Arc::clone(&self.router);
        let shutdown = self.shutdown.clone();
        self.tasks.spawn(async move {
            ("ingress".to_string(), router.run_ingress(shutdown).await)
        });

        let router = Arc::clone(&self.router);
        let shutdown = self.shutdown.clone();
        self.tasks.spawn(async move {
            ("egress".to_string(), router.run_egress(shutdown).await)
        });

        pool.spawn(&mut self.tasks, &self.shutdown);

        let router = Arc::clone(&self.router);
        let shutdown = self.shutdown.clone();
        let interval = self.sweep_interval;
        self.tasks.spawn(async move {
            run_correlation_sweep(&router, interval, &shutdown).await;
            ("correlation_sweep".to_string(), Ok(()))
        });

        let router = Arc::clone(&self.router);
        let stats = Arc::clone(&self.stats);
        let shutdown = self.shutdown.clone();
        let interval = self.heartbeat_interval;
        self.tasks.spawn(async move {
            run_heartbeat(&router, &stats, interval, &shutdown).await;
            ("heartbeat".to_string(), Ok(()))
        });

        info!(tasks = self.tasks.len(), "✅ Dispatch broker running");
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn worker_stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Wait for every task to stop, returning the first fatal error
    pub async fn run_until_shutdown(mut self) -> BrokerResult<()> {
        let mut first_error: Option<BrokerError> = None;

        while let Some(exit) = self.tasks.join_next().await {
            let (task, result) = match exit {
                Ok(exit) => exit,
                Err(join_error) => (
                    "unknown".to_string(),
                    Err(BrokerError::task_failed("unknown", join_error.to_string())),
                ),
            };

            match result {
                Ok(()) => info!(task = %task, "Task stopped"),
                Err(e) => {
                    log_error("bootstrap", &task, &e.to_string(), Some("fatal"));
                    if first_error.is_none() {
                        error!(task = %task, "💥 Fatal task failure, shutting down broker");
                        self.shutdown.trigger();
                        first_error = Some(e);
                    }
                }
            }
        }

        info!("🛑 Dispatch broker stopped");
        first_error.map_or(Ok(()), Err)
    }
}

/// Build the Durable Queue adapter named by configuration
pub async fn connect_queue(config: &QueueConfig) -> BrokerResult<Arc<dyn JobQueue>> {
    match config.backend {
        QueueBackend::Memory => {
            info!("Using in-memory job queue");
            Ok(Arc::new(InMemoryQueue::new()))
        }
        #[cfg(feature = "postgres")]
        QueueBackend::Pgmq => {
            let database_url = config.database_url.as_deref().ok_or_else(|| {
                crate::config::ConfigurationError::missing_required_field(
                    "queue.database_url",
                    "pgmq queue backend",
                )
            })?;
            let queue = crate::queue::PgmqJobQueue::connect(
                database_url,
                &[config.work_queue.as_str(), config.response_queue.as_str()],
            )
            .await?;
            Ok(Arc::new(queue))
        }
        #[cfg(not(feature = "postgres"))]
        QueueBackend::Pgmq => Err(crate::config::ConfigurationError::invalid_value(
            "queue.backend",
            "pgmq",
            "built without the postgres feature",
        )
        .into()),
    }
}

async fn run_correlation_sweep(router: &Router, interval: Duration, shutdown: &ShutdownSignal) {
    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        let correlations = router.correlation().sweep();
        let timers = router.timer().sweep();
        if correlations > 0 || timers > 0 {
            info!(
                expired_correlations = correlations,
                expired_timers = timers,
                "🧹 Swept expired correlation entries"
            );
        }
    }
}

async fn run_heartbeat(
    router: &Router,
    stats: &WorkerStats,
    interval: Duration,
    shutdown: &ShutdownSignal,
) {
    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        info!(
            pending_correlations = router.correlation().pending(),
            running_timers = router.timer().active(),
            jobs_processed = stats.processed(),
            jobs_failed = stats.failed(),
            jobs_discarded = stats.discarded(),
            "💓 Heartbeat"
        );
    }
}
