//! # System Constants
//!
//! Core constants that define the operational boundaries of the dispatch broker:
//! queue names, expiry windows, retry defaults and the response code contract
//! shared with clients.

use serde::{Deserialize, Serialize};

/// Queue naming defaults
pub mod queues {
    /// List holding pending job records
    pub const WORK_QUEUE: &str = "job_queue";

    /// List holding completed response records
    pub const RESPONSE_QUEUE: &str = "response_queue";
}

/// Expiry windows, all in seconds
pub mod ttl {
    /// Expiry applied to the work queue key on every enqueue
    pub const WORK_QUEUE_SECS: u64 = 60;

    /// Expiry applied to the response queue key on every put
    pub const RESPONSE_QUEUE_SECS: u64 = 60;

    /// Window during which a response can still be routed to its client
    pub const CORRELATION_SECS: u64 = 60;

    /// Upper bound on live correlation entries and timers
    pub const CORRELATION_MAX_ENTRIES: usize = 1000;
}

/// Queue retry defaults
pub mod retry {
    /// Attempts made for a queue write before it is treated as fatal
    pub const MAX_ATTEMPTS: u32 = 5;

    /// Fixed delay between attempts
    pub const DELAY_MS: u64 = 200;
}

/// Loop pacing defaults, all in milliseconds
pub mod pacing {
    /// Socket receive timeout
    pub const RECV_TIMEOUT_MS: i32 = 500;

    /// Socket send timeout
    pub const SEND_TIMEOUT_MS: i32 = 1000;

    /// Time pending outbound frames may linger after the socket closes
    pub const LINGER_MS: i32 = 1000;

    /// Yield between router loop iterations
    pub const POLL_INTERVAL_MS: u64 = 10;

    /// Yield after a worker finds the queue empty
    pub const WORKER_IDLE_BACKOFF_MS: u64 = 10;

    /// Pause after a worker hits an unexpected error
    pub const WORKER_ERROR_BACKOFF_MS: u64 = 500;
}

/// Frame and payload limits
pub mod frames {
    /// Parts in a frame from a DEALER peer: `[identity, payload]`
    pub const DEALER_PARTS: usize = 2;

    /// Parts in a frame from a REQ peer: `[identity, delimiter, payload]`
    pub const REQ_PARTS: usize = 3;
}

/// Response status code returned to clients
///
/// Serialised as the bare integer (`0` or `1`) in the `code` field of every reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ResponseCode {
    Success,
    Failure,
}

impl ResponseCode {
    pub fn as_u8(self) -> u8 {
        match self {
            ResponseCode::Success => 0,
            ResponseCode::Failure => 1,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ResponseCode::Success)
    }
}

impl From<ResponseCode> for u8 {
    fn from(code: ResponseCode) -> Self {
        code.as_u8()
    }
}

impl TryFrom<u8> for ResponseCode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ResponseCode::Success),
            1 => Ok(ResponseCode::Failure),
            other => Err(format!("unknown response code: {other}")),
        }
    }
}

impl std::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_code_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&ResponseCode::Success).unwrap(), "0");
        assert_eq!(serde_json::to_string(&ResponseCode::Failure).unwrap(), "1");
    }

    #[test]
    fn test_response_code_rejects_unknown_values() {
        assert!(serde_json::from_str::<ResponseCode>("2").is_err());
        assert_eq!(
            serde_json::from_str::<ResponseCode>("1").unwrap(),
            ResponseCode::Failure
        );
    }
}
