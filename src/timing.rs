//! # Latency Timer
//!
//! Observability-only record of when each job was accepted. Stopping a timer
//! yields the elapsed time and clears it; timers that are never stopped (lost or
//! undeliverable jobs) expire under the same window as correlation entries.

use crate::correlation::expiring_cache;
use crate::messaging::JobId;
use moka::sync::Cache;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct LatencyTimer {
    started: Cache<String, Instant>,
    expired: Arc<AtomicUsize>,
}

impl LatencyTimer {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        let expired = Arc::new(AtomicUsize::new(0));
        Self {
            started: expiring_cache("latency_timer", ttl, max_entries, Arc::clone(&expired)),
            expired,
        }
    }

    pub fn start(&self, job_id: &JobId) {
        self.started.insert(job_id.as_str().to_string(), Instant::now());
    }

    /// Elapsed time since `start`, or `None` if the timer is unknown or expired
    pub fn stop(&self, job_id: &JobId) -> Option<Duration> {
        let key = job_id.as_str();
        self.started.get(key)?;
        self.started.remove(key).map(|started| started.elapsed())
    }

    pub fn discard(&self, job_id: &JobId) {
        self.started.invalidate(job_id.as_str());
    }

    pub fn active(&self) -> usize {
        self.started.run_pending_tasks();
        self.started.entry_count() as usize
    }

    pub fn sweep(&self) -> usize {
        self.started.run_pending_tasks();
        self.expired.swap(0, Ordering::Relaxed)
    }
}
