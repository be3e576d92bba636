//! # Router
//!
//! Owns the client-facing socket and the correlation state. Two loops run over
//! one shared [`Router`]:
//!
//! ```text
//! client ──frames──▶ ingress ──WorkRecord──▶ work queue ──▶ workers
//! client ◀─frames─── egress  ◀─ResponseRecord── response queue ◀──┘
//! ```
//!
//! Ingress registers `job_id -> client envelope` before a job becomes visible to
//! workers; egress takes the entry back out to address the reply. A response
//! whose entry has expired is dropped.

pub mod egress;
pub mod ingress;

use crate::config::BrokerConfig;
use crate::correlation::CorrelationCache;
use crate::queue::{JobQueue, RetryPolicy};
use crate::timing::LatencyTimer;
use crate::transport::FrameTransport;
use std::sync::Arc;
use std::time::Duration;

pub use egress::Delivery;
pub use ingress::IngressOutcome;

/// Queue names and pacing the router loops need
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterSettings {
    pub work_queue: String,
    pub response_queue: String,
    pub work_ttl: Duration,
    pub poll_interval: Duration,
}

impl RouterSettings {
    pub fn from_config(config: &BrokerConfig) -> Self {
        Self {
            work_queue: config.queue.work_queue.clone(),
            response_queue: config.queue.response_queue.clone(),
            work_ttl: config.queue.work_ttl(),
            poll_interval: config.router.poll_interval(),
        }
    }
}

#[derive(Debug)]
pub struct Router {
    transport: Arc<dyn FrameTransport>,
    queue: Arc<dyn JobQueue>,
    correlation: Arc<CorrelationCache>,
    timer: Arc<LatencyTimer>,
    retry: RetryPolicy,
    settings: RouterSettings,
}

impl Router {
    pub fn new(
        transport: Arc<dyn FrameTransport>,
        queue: Arc<dyn JobQueue>,
        config: &BrokerConfig,
    ) -> Self {
        Self {
            transport,
            queue,
            correlation: Arc::new(CorrelationCache::from_config(&config.correlation)),
            timer: Arc::new(LatencyTimer::new(
                config.correlation.ttl(),
                config.correlation.max_entries,
            )),
            retry: RetryPolicy::from_config(&config.queue),
            settings: RouterSettings::from_config(config),
        }
    }

    pub fn correlation(&self) -> &Arc<CorrelationCache> {
        &self.correlation
    }

    pub fn timer(&self) -> &Arc<LatencyTimer> {
        &self.timer
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.transport_name()
    }
}
