//! # Command Error Types
//!
//! Every client-facing command failure. All of them are recovered into a
//! structured failure response so that a client always receives a reply.

use thiserror::Error;

/// Client-facing command failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Request is not `{ "command": <string>, "params": {..} }`
    #[error("Malformed request: {reason}")]
    MalformedRequest { reason: String },

    #[error("Command '{command}' is not recognized")]
    UnknownCommand { command: String },

    #[error("Missing param: {param}")]
    MissingParameter { command: String, param: String },

    /// Handler ran and declined the request (status code 1)
    #[error("{reason}")]
    Rejected { command: String, reason: String },

    /// Handler returned an error or panicked
    #[error("{message}")]
    HandlerFailure {
        command: String,
        message: String,
        trace: String,
    },
}

impl CommandError {
    /// Create a malformed request error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRequest {
            reason: reason.into(),
        }
    }

    /// Create an unknown command error
    pub fn unknown_command(command: impl Into<String>) -> Self {
        Self::UnknownCommand {
            command: command.into(),
        }
    }

    /// Create a missing parameter error
    pub fn missing_parameter(command: impl Into<String>, param: impl Into<String>) -> Self {
        Self::MissingParameter {
            command: command.into(),
            param: param.into(),
        }
    }

    /// Create a rejection
    pub fn rejected(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Create a handler failure from the error a handler returned
    pub fn handler_failure(command: impl Into<String>, error: &anyhow::Error) -> Self {
        Self::HandlerFailure {
            command: command.into(),
            message: error.to_string(),
            trace: format!("{error:?}"),
        }
    }

    /// Diagnostic trace to return to the client, if any
    pub fn trace(&self) -> Option<String> {
        match self {
            Self::HandlerFailure { trace, .. } => Some(trace.clone()),
            _ => None,
        }
    }

    /// Stable short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRequest { .. } => "malformed_request",
            Self::UnknownCommand { .. } => "unknown_command",
            Self::MissingParameter { .. } => "missing_parameter",
            Self::Rejected { .. } => "rejected",
            Self::HandlerFailure { .. } => "handler_failure",
        }
    }
}
