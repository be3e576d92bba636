//! # Messaging Module
//!
//! Wire and queue formats shared by the router and the workers: the client
//! request and response payloads, the routing envelope captured from socket
//! frames, and the text-safe records that travel through the Durable Queue.

pub mod envelope;
pub mod errors;
pub mod message;

pub use envelope::*;
pub use errors::*;
pub use message::*;
