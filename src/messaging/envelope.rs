//! # Client Envelope
//!
//! A request arrives on the ROUTER socket as either `[identity, payload]` (DEALER
//! peers) or `[identity, delimiter, payload]` (REQ peers, whose delimiter is empty).
//! The envelope keeps everything needed to address the reply: the identity frame
//! and, when present, the delimiter. Both are echoed back verbatim.

use super::errors::{MessagingError, MessagingResult};
use crate::constants::frames::{DEALER_PARTS, REQ_PARTS};
use serde::{Deserialize, Serialize};

/// Opaque routing information for one client request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientEnvelope {
    /// Transport identity of the peer
    pub identity: Vec<u8>,
    /// Delimiter frame between identity and payload, if the peer sent one
    pub delimiter: Option<Vec<u8>>,
}

impl ClientEnvelope {
    pub fn new(identity: Vec<u8>, delimiter: Option<Vec<u8>>) -> Self {
        Self {
            identity,
            delimiter,
        }
    }

    /// Split a received multi-part frame into its envelope and payload
    pub fn split_frames(mut frames: Vec<Vec<u8>>) -> MessagingResult<(Self, Vec<u8>)> {
        let parts = frames.len();
        match parts {
            DEALER_PARTS => {
                let payload = frames.pop().unwrap_or_default();
                let identity = frames.pop().unwrap_or_default();
                Ok((Self::new(identity, None), payload))
            }
            REQ_PARTS => {
                let payload = frames.pop().unwrap_or_default();
                let delimiter = frames.pop().unwrap_or_default();
                let identity = frames.pop().unwrap_or_default();
                if !delimiter.is_empty() {
                    return Err(MessagingError::malformed_frame(
                        parts,
                        "delimiter frame must be empty",
                    ));
                }
                Ok((Self::new(identity, Some(delimiter)), payload))
            }
            _ => Err(MessagingError::malformed_frame(
                parts,
                "expected [identity, payload] or [identity, delimiter, payload]",
            )),
        }
    }

    /// Identity frame of a frame set that could not be split, if it has one
    pub fn salvage_identity(frames: &[Vec<u8>]) -> Option<Self> {
        match frames {
            [identity, _, ..] if !identity.is_empty() => Some(Self::new(identity.clone(), None)),
            _ => None,
        }
    }

    /// Frames addressing `payload` back to this client
    pub fn reply_frames(&self, payload: Vec<u8>) -> Vec<Vec<u8>> {
        let mut frames = Vec::with_capacity(REQ_PARTS);
        frames.push(self.identity.clone());
        if let Some(delimiter) = &self.delimiter {
            frames.push(delimiter.clone());
        }
        frames.push(payload);
        frames
    }

    /// Short printable form of the identity for logs
    pub fn identity_hex(&self) -> String {
        hex::encode(&self.identity)
    }
}

/// Text-safe rendering of binary frame parts for queue storage
pub fn encode_part(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Inverse of [`encode_part`]
pub fn decode_part(field: &str, text: &str) -> MessagingResult<Vec<u8>> {
    hex::decode(text).map_err(|e| MessagingError::invalid_encoding(field, e.to_string()))
}
