//! # Error Handling
//!
//! Top-level error for the broker's long-running loops. Each layer keeps its own
//! error type; this one only aggregates them.

use crate::config::ConfigurationError;
use crate::messaging::MessagingError;
use crate::queue::QueueError;
use crate::registry::CommandError;
use crate::transport::TransportError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BrokerError {
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A background task ended in a way the broker cannot recover from
    #[error("Task '{task}' failed: {message}")]
    TaskFailed { task: String, message: String },
}

impl BrokerError {
    pub fn task_failed(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TaskFailed {
            task: task.into(),
            message: message.into(),
        }
    }

    /// Whether this error means the Durable Queue rejected a write for good
    pub fn is_queue_exhausted(&self) -> bool {
        matches!(self, Self::Queue(QueueError::RetriesExhausted { .. }))
    }
}

pub type BrokerResult<T> = Result<T, BrokerError>;
