//! Transport error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Socket {operation} failed: {message}")]
    Socket { operation: String, message: String },

    #[error("Malformed frame with {parts} part(s)")]
    MalformedFrame { parts: usize },

    #[error("Transport closed")]
    Closed,
}

impl TransportError {
    pub fn socket(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Socket {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl From<zmq::Error> for TransportError {
    fn from(err: zmq::Error) -> Self {
        match err {
            zmq::Error::ETERM | zmq::Error::ENOTSOCK => Self::Closed,
            other => Self::socket("zmq", other.to_string()),
        }
    }
}

pub type TransportResult<T> = Result<T, TransportError>;
