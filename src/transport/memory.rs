//! In-process message channel.
//!
//! [`MemoryChannel`] records every sent frame and lets the owner inject
//! inbound frames, transport errors and completion. It is how the client
//! is exercised without a server.
//!
//! # Example
//!
//! ```ignore
//! let channel = Arc::new(MemoryChannel::new());
//! let client = RealtimeClient::from_channel(channel.clone());
//!
//! let mut replies = client.call_method("getServerInfo", vec![]);
//! channel.push_json(r#"{"msg":"result","id":"...","result":{}}"#);
//! assert_eq!(channel.sent().len(), 1);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::protocol::Frame;

use super::channel::{Inbound, InboundHub, MessageChannel};

// ============================================================================
// Constants
// ============================================================================

/// Default broadcast capacity.
const DEFAULT_CAPACITY: usize = 1024;

// ============================================================================
// MemoryChannel
// ============================================================================

/// [`MessageChannel`] backed by memory instead of a socket.
#[derive(Debug)]
pub struct MemoryChannel {
    hub: InboundHub,
    sent: Mutex<Vec<Frame>>,
    close_calls: AtomicUsize,
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryChannel {
    /// Creates an open channel with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an open channel buffering up to `capacity` inbound items.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            hub: InboundHub::new(capacity),
            sent: Mutex::new(Vec::new()),
            close_calls: AtomicUsize::new(0),
        }
    }

    /// Delivers an inbound frame to current receivers.
    pub fn push(&self, frame: Frame) {
        self.hub.publish(Inbound::Frame(frame));
    }

    /// Decodes and delivers inbound JSON text, as a socket would.
    pub fn push_json(&self, text: &str) {
        self.hub.publish(Inbound::decode(text));
    }

    /// Delivers an in-band transport error.
    pub fn push_error(&self, error: TransportError) {
        self.hub.publish(Inbound::Error(error));
    }

    /// Completes the inbound stream, as a remote close would.
    pub fn complete(&self) {
        if self.hub.complete() {
            debug!("Memory channel completed");
        }
    }

    /// Returns a copy of every frame sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Frame> {
        self.sent.lock().clone()
    }

    /// Returns and clears the sent frames.
    pub fn take_sent(&self) -> Vec<Frame> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Number of times [`MessageChannel::close`] was invoked.
    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageChannel for MemoryChannel {
    fn send(&self, frame: Frame) {
        if self.hub.is_complete() {
            trace!(kind = %frame.kind(), "Dropping frame sent after completion");
            return;
        }
        self.sent.lock().push(frame);
    }

    fn subscribe(&self) -> broadcast::Receiver<Inbound> {
        self.hub.subscribe()
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.complete();
    }

    fn is_closed(&self) -> bool {
        self.hub.is_complete()
    }
}

// ============================================================================
// Tests
// ============================================================================
