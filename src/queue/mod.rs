//! # Durable Queue
//!
//! The broker hands work between the router and the workers exclusively through
//! a shared FIFO store. This module defines the contract the core needs from that
//! store and ships two adapters for it.
//!
//! ## Contract
//!
//! - `push` appends a text record to the tail of a named list.
//! - `pop` removes and returns the head record, or `None` when the list is empty.
//!   It never blocks and is atomic: a record is handed to exactly one caller.
//! - `expire` sets or refreshes a bounded lifetime on a list so an unconsumed
//!   backlog cannot outlive the window across restarts.
//!
//! ## Adapters
//!
//! - [`InMemoryQueue`] - process-local lists with whole-key expiry
//! - [`PgmqJobQueue`] - PostgreSQL message queue (feature `postgres`)

pub mod errors;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod pgmq_queue;
pub mod retry;

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

pub use errors::{QueueError, QueueResult};
pub use memory::InMemoryQueue;
#[cfg(feature = "postgres")]
pub use pgmq_queue::PgmqJobQueue;
pub use retry::RetryPolicy;

/// Durable Queue operations consumed by the router and the workers
#[async_trait]
pub trait JobQueue: Send + Sync + Debug {
    /// Append a record to the tail of `queue`
    async fn push(&self, queue: &str, record: &str) -> QueueResult<()>;

    /// Remove and return the head of `queue` without waiting
    async fn pop(&self, queue: &str) -> QueueResult<Option<String>>;

    /// Set or refresh the lifetime of `queue`
    async fn expire(&self, queue: &str, ttl: Duration) -> QueueResult<()>;

    /// Number of records currently held in `queue`
    async fn len(&self, queue: &str) -> QueueResult<usize>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}
