//! # In-Memory Queue
//!
//! Process-local implementation of [`JobQueue`] with list-with-expiry semantics:
//! a key whose lifetime elapses disappears together with every record it holds,
//! and pushing to a key keeps its existing expiry.
//!
//! Suitable for tests and single-process deployments where router and workers
//! share one runtime.

use super::errors::QueueResult;
use super::JobQueue;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Default)]
struct QueueSlot {
    records: VecDeque<String>,
    expires_at: Option<Instant>,
}

impl QueueSlot {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Process-local FIFO lists keyed by queue name
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    slots: Mutex<HashMap<String, QueueSlot>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the named key if its lifetime has elapsed
    fn evict_if_expired(slots: &mut HashMap<String, QueueSlot>, queue: &str) {
        let now = Instant::now();
        if slots.get(queue).is_some_and(|slot| slot.is_expired(now)) {
            if let Some(slot) = slots.remove(queue) {
                debug!(
                    queue = %queue,
                    discarded = slot.records.len(),
                    "Queue key expired"
                );
            }
        }
    }

    /// Snapshot of the records in `queue`, head first
    pub fn records(&self, queue: &str) -> Vec<String> {
        let mut slots = self.slots.lock();
        Self::evict_if_expired(&mut slots, queue);
        slots
            .get(queue)
            .map(|slot| slot.records.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl JobQueue for InMemoryQueue {
    async fn push(&self, queue: &str, record: &str) -> QueueResult<()> {
        let mut slots = self.slots.lock();
        Self::evict_if_expired(&mut slots, queue);
        slots
            .entry(queue.to_string())
            .or_default()
            .records
            .push_back(record.to_string());
        Ok(())
    }

    async fn pop(&self, queue: &str) -> QueueResult<Option<String>> {
        let mut slots = self.slots.lock();
        Self::evict_if_expired(&mut slots, queue);
        let Some(slot) = slots.get_mut(queue) else {
            return Ok(None);
        };
        let record = slot.records.pop_front();
        if slot.records.is_empty() {
            // an emptied list no longer exists, so neither does its expiry
            slots.remove(queue);
        }
        Ok(record)
    }

    async fn expire(&self, queue: &str, ttl: Duration) -> QueueResult<()> {
        let mut slots = self.slots.lock();
        Self::evict_if_expired(&mut slots, queue);
        if let Some(slot) = slots.get_mut(queue) {
            slot.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn len(&self, queue: &str) -> QueueResult<usize> {
        let mut slots = self.slots.lock();
        Self::evict_if_expired(&mut slots, queue);
        Ok(slots.get(queue).map_or(0, |slot| slot.records.len()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
