//! In-process [`FrameTransport`] backed by two frame buffers.

use super::errors::{TransportError, TransportResult};
use super::{FrameTransport, Frames};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct MemoryTransport {
    inbound: Mutex<VecDeque<Frames>>,
    outbound: Mutex<Vec<Frames>>,
    closed: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message as if a client had sent it
    pub fn inject(&self, frames: Frames) {
        self.inbound.lock().push_back(frames);
    }

    /// Drain every message sent so far
    pub fn take_sent(&self) -> Vec<Frames> {
        std::mem::take(&mut *self.outbound.lock())
    }

    pub fn sent_count(&self) -> usize {
        self.outbound.lock().len()
    }

    pub fn pending_inbound(&self) -> usize {
        self.inbound.lock().len()
    }

    /// Make every later call fail with [`TransportError::Closed`]
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn ensure_open(&self) -> TransportResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}

impl FrameTransport for MemoryTransport {
    fn try_recv(&self) -> TransportResult<Option<Frames>> {
        self.ensure_open()?;
        Ok(self.inbound.lock().pop_front())
    }

    fn send(&self, frames: Frames) -> TransportResult<()> {
        self.ensure_open()?;
        self.outbound.lock().push(frames);
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "memory"
    }
}
