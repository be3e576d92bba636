//! # Client Transport
//!
//! The router talks to clients through a multiplexing socket that delivers
//! multi-part frames and addresses replies by the identity frame it received.
//! [`FrameTransport`] is the non-blocking contract the router loops need from it.
//!
//! ## Adapters
//!
//! - [`ZmqRouterTransport`] - ZeroMQ ROUTER socket
//! - [`MemoryTransport`] - in-process frame buffers for tests and embedding

pub mod errors;
pub mod memory;
pub mod zmq_router;

use std::fmt::Debug;

pub use errors::{TransportError, TransportResult};
pub use memory::MemoryTransport;
pub use zmq_router::ZmqRouterTransport;

/// A received or outgoing multi-part message
pub type Frames = Vec<Vec<u8>>;

/// Non-blocking multi-part socket shared by the ingress and egress loops
pub trait FrameTransport: Send + Sync + Debug {
    /// Next inbound message, or `None` if nothing is waiting
    fn try_recv(&self) -> TransportResult<Option<Frames>>;

    /// Send one message; the first frame addresses the peer
    fn send(&self, frames: Frames) -> TransportResult<()>;

    /// Adapter name for logging
    fn transport_name(&self) -> &'static str;
}
