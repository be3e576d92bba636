//! # Queue Error Types
//!
//! Structured errors for Durable Queue operations. Transient failures are retried
//! by [`RetryPolicy`](super::RetryPolicy); once the attempts are exhausted the
//! caller receives [`QueueError::RetriesExhausted`] and must treat it as fatal.

use thiserror::Error;

/// Durable Queue error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueueError {
    #[error("Queue connection error: {message}")]
    Connection { message: String },

    #[error("Queue operation failed: {queue}: {operation}: {message}")]
    Operation {
        queue: String,
        operation: String,
        message: String,
    },

    #[error("Queue record serialization error: {message}")]
    Serialization { message: String },

    #[error(
        "Queue {operation} on {queue} failed after {attempts} attempts: {last_error}"
    )]
    RetriesExhausted {
        queue: String,
        operation: String,
        attempts: u32,
        last_error: String,
    },
}

impl QueueError {
    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create an operation error
    pub fn operation(
        queue: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Operation {
            queue: queue.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Whether another attempt might succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Operation { .. })
    }

    /// Number of attempts made, when this error closes a retry sequence
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::RetriesExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::serialization(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<pgmq::errors::PgmqError> for QueueError {
    fn from(err: pgmq::errors::PgmqError) -> Self {
        QueueError::connection(err.to_string())
    }
}

/// Result type alias for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(QueueError::connection("refused").is_transient());
        assert!(QueueError::operation("job_queue", "push", "timeout").is_transient());
        assert!(!QueueError::serialization("bad json").is_transient());

        let exhausted = QueueError::RetriesExhausted {
            queue: "job_queue".to_string(),
            operation: "push".to_string(),
            attempts: 5,
            last_error: "refused".to_string(),
        };
        assert!(!exhausted.is_transient());
        assert_eq!(exhausted.attempts(), Some(5));
    }

    #[test]
    fn test_error_display() {
        let err = QueueError::operation("response_queue", "pop", "connection reset");
        let display = format!("{err}");
        assert!(display.contains("response_queue"));
        assert!(display.contains("pop"));
        assert!(display.contains("connection reset"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let err: QueueError = json_err.into();
        assert!(matches!(err, QueueError::Serialization { .. }));
    }
}
