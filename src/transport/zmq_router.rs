//! # ZeroMQ ROUTER Transport
//!
//! Binds a ROUTER socket and exposes it as a [`FrameTransport`]. ZeroMQ sockets
//! are not thread safe, so the socket sits behind a mutex that ingress and egress
//! take only for the duration of a single non-blocking call.

use super::errors::{TransportError, TransportResult};
use super::{FrameTransport, Frames};
use crate::config::RouterConfig;
use parking_lot::Mutex;
use std::fmt;
use tracing::{debug, info};
use zmq::{Context, Socket, SocketType};

pub struct ZmqRouterTransport {
    /// Kept alive for as long as the socket is
    _context: Context,
    socket: Mutex<Socket>,
    endpoint: String,
}

impl fmt::Debug for ZmqRouterTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZmqRouterTransport")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl ZmqRouterTransport {
    /// Create a ROUTER socket and bind it to `config.bind_address`
    pub fn bind(config: &RouterConfig) -> TransportResult<Self> {
        info!(endpoint = %config.bind_address, "🚀 Binding ROUTER socket");

        let context = Context::new();
        let socket = context.socket(SocketType::ROUTER)?;
        socket.set_rcvtimeo(config.recv_timeout_ms)?;
        socket.set_sndtimeo(config.send_timeout_ms)?;
        socket.set_linger(config.linger_ms)?;
        socket
            .bind(&config.bind_address)
            .map_err(|e| TransportError::socket("bind", format!("{}: {e}", config.bind_address)))?;

        // port 0 / wildcard binds resolve to a concrete endpoint
        let endpoint = socket
            .get_last_endpoint()
            .ok()
            .and_then(Result::ok)
            .unwrap_or_else(|| config.bind_address.clone());

        info!(endpoint = %endpoint, "✅ ROUTER socket bound");
        Ok(Self {
            _context: context,
            socket: Mutex::new(socket),
            endpoint,
        })
    }

    /// Endpoint the socket is actually bound to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl FrameTransport for ZmqRouterTransport {
    fn try_recv(&self) -> TransportResult<Option<Frames>> {
        let socket = self.socket.lock();
        match socket.recv_multipart(zmq::DONTWAIT) {
            Ok(frames) => {
                debug!(parts = frames.len(), "📥 Received frame");
                Ok(Some(frames))
            }
            Err(zmq::Error::EAGAIN) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn send(&self, frames: Frames) -> TransportResult<()> {
        let socket = self.socket.lock();
        socket
            .send_multipart(frames, zmq::DONTWAIT)
            .map_err(|e| match e {
                zmq::Error::EAGAIN => TransportError::socket("send", "peer is not accepting frames"),
                other => other.into(),
            })
    }

    fn transport_name(&self) -> &'static str {
        "zmq_router"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn local_config() -> RouterConfig {
        RouterConfig {
            bind_address: "tcp://127.0.0.1:*".to_string(),
            ..RouterConfig::default()
        }
    }

    #[test]
    fn test_dealer_round_trip() {
        let transport = ZmqRouterTransport::bind(&local_config()).unwrap();

        let context = Context::new();
        let dealer = context.socket(SocketType::DEALER).unwrap();
        dealer.set_identity(b"client-1").unwrap();
        dealer.set_rcvtimeo(2000).unwrap();
        dealer.connect(transport.endpoint()).unwrap();
        dealer.send(&b"ping"[..], 0).unwrap();

        let mut received = None;
        for _ in 0..200 {
            if let Some(frames) = transport.try_recv().unwrap() {
                received = Some(frames);
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        let frames = received.expect("no frame received");
        assert_eq!(frames, vec![b"client-1".to_vec(), b"ping".to_vec()]);

        transport
            .send(vec![b"client-1".to_vec(), b"pong".to_vec()])
            .unwrap();
        assert_eq!(dealer.recv_bytes(0).unwrap(), b"pong".to_vec());
    }

    #[test]
    fn test_empty_socket_yields_none() {
        let transport = ZmqRouterTransport::bind(&local_config()).unwrap();
        assert_eq!(transport.try_recv().unwrap(), None);
    }
}
