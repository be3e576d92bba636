//! # Messaging Error Types
//!
//! Errors raised while splitting socket frames into envelopes and while decoding
//! queue records back into jobs and responses.

use thiserror::Error;

/// Frame and record decoding errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MessagingError {
    #[error("Malformed frame: {parts} parts: {reason}")]
    MalformedFrame { parts: usize, reason: String },

    #[error("Invalid encoding in field {field}: {message}")]
    InvalidEncoding { field: String, message: String },

    #[error("Invalid queue record: {message}")]
    InvalidRecord { message: String },
}

impl MessagingError {
    /// Create a malformed frame error
    pub fn malformed_frame(parts: usize, reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            parts,
            reason: reason.into(),
        }
    }

    /// Create an invalid encoding error
    pub fn invalid_encoding(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEncoding {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid record error
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        MessagingError::invalid_record(err.to_string())
    }
}

/// Result type alias for messaging operations
pub type MessagingResult<T> = Result<T, MessagingError>;
