//! # Correlation Cache
//!
//! Time-bounded map from `job_id` to the [`ClientEnvelope`] a reply must be sent
//! to. Owned by the router: ingress registers, egress takes.
//!
//! Backed by a moka cache with a cache-wide time to live and a capacity bound.
//! An expired entry is never returned, even before moka reclaims it; the
//! background sweep drives moka's maintenance so memory is reclaimed for
//! entries nobody asks about again.

use crate::config::CorrelationConfig;
use crate::messaging::{ClientEnvelope, JobId};
use moka::notification::RemovalCause;
use moka::sync::Cache;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Build a string-keyed cache whose expirations are tallied into `expired`
pub(crate) fn expiring_cache<V>(
    name: &'static str,
    ttl: Duration,
    max_entries: usize,
    expired: Arc<AtomicUsize>,
) -> Cache<String, V>
where
    V: Clone + Send + Sync + 'static,
{
    Cache::builder()
        .name(name)
        .max_capacity(max_entries.max(1) as u64)
        .time_to_live(ttl)
        .eviction_listener(move |key: Arc<String>, _value, cause| match cause {
            RemovalCause::Expired => {
                expired.fetch_add(1, Ordering::Relaxed);
            }
            RemovalCause::Size => {
                debug!(cache = name, key = %key, "Evicting entry from full cache");
            }
            _ => {}
        })
        .build()
}

pub struct CorrelationCache {
    entries: Cache<String, ClientEnvelope>,
    expired: Arc<AtomicUsize>,
    ttl: Duration,
}

impl std::fmt::Debug for CorrelationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationCache")
            .field("max_capacity", &self.entries.policy().max_capacity())
            .field("entry_count", &self.entries.entry_count())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl CorrelationCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        let expired = Arc::new(AtomicUsize::new(0));
        Self {
            entries: expiring_cache("correlation", ttl, max_entries, Arc::clone(&expired)),
            expired,
            ttl,
        }
    }

    pub fn from_config(config: &CorrelationConfig) -> Self {
        Self::new(config.ttl(), config.max_entries)
    }

    /// Remember where the reply for `job_id` must go
    pub fn register(&self, job_id: &JobId, envelope: ClientEnvelope) {
        self.entries.insert(job_id.as_str().to_string(), envelope);
    }

    /// Remove and return the live envelope for `job_id`
    ///
    /// Only one caller can win the removal, and an entry past its window is
    /// absent even if it has not been reclaimed yet.
    pub fn take(&self, job_id: &JobId) -> Option<ClientEnvelope> {
        let key = job_id.as_str();
        self.entries.get(key)?;
        self.entries.remove(key)
    }

    /// Drop the entry for a job that never made it onto the queue
    pub fn forget(&self, job_id: &JobId) {
        self.entries.invalidate(job_id.as_str());
    }

    pub fn is_pending(&self, job_id: &JobId) -> bool {
        self.entries.contains_key(job_id.as_str())
    }

    /// Number of live entries
    pub fn pending(&self) -> usize {
        self.entries.run_pending_tasks();
        self.entries.entry_count() as usize
    }

    /// Reclaim expired entries, returning how many expired since the last sweep
    pub fn sweep(&self) -> usize {
        self.entries.run_pending_tasks();
        self.expired.swap(0, Ordering::Relaxed)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> ClientEnvelope {
        ClientEnvelope::new(b"peer".to_vec(), Some(Vec::new()))
    }

    #[test]
    fn test_take_removes_entry() {
        let cache = CorrelationCache::new(Duration::from_secs(60), 10);
        let job_id = JobId::generate();

        cache.register(&job_id, envelope());
        assert!(cache.is_pending(&job_id));
        assert_eq!(cache.take(&job_id), Some(envelope()));
        assert_eq!(cache.take(&job_id), None);
        assert_eq!(cache.pending(), 0);
    }

    #[test]
    fn test_forget_drops_entry() {
        let cache = CorrelationCache::new(Duration::from_secs(60), 10);
        let job_id = JobId::generate();
        cache.register(&job_id, envelope());

        cache.forget(&job_id);
        assert!(!cache.is_pending(&job_id));
        assert_eq!(cache.take(&job_id), None);
    }

    #[test]
    fn test_expired_entry_is_unroutable() {
        let cache = CorrelationCache::new(Duration::from_millis(100), 10);
        let job_id = JobId::generate();
        cache.register(&job_id, envelope());

        std::thread::sleep(Duration::from_millis(250));
        assert!(!cache.is_pending(&job_id));
        assert_eq!(cache.take(&job_id), None);
    }

    #[test]
    fn test_sweep_counts_expired() {
        let cache = CorrelationCache::new(Duration::from_millis(100), 10);
        for _ in 0..3 {
            cache.register(&JobId::generate(), envelope());
        }
        std::thread::sleep(Duration::from_millis(250));
        let live = JobId::generate();
        cache.register(&live, envelope());

        assert_eq!(cache.sweep(), 3);
        assert_eq!(cache.pending(), 1);
        assert!(cache.is_pending(&live));
        assert_eq!(cache.sweep(), 0);
    }

    #[test]
    fn test_capacity_is_bounded() {
        let cache = CorrelationCache::new(Duration::from_secs(60), 8);
        for _ in 0..100 {
            cache.register(&JobId::generate(), envelope());
        }
        assert!(cache.pending() <= 8);
    }
}
