//! Message channel contract consumed by the client.
//!
//! A channel is a duplex pipe of [`Frame`]s: `send` is fire-and-forget and
//! inbound traffic is fanned out to any number of receivers through a
//! `tokio::sync::broadcast` channel.
//!
//! # Delivery Semantics
//!
//! - Multicast, no replay: a receiver only sees items broadcast after it
//!   was created.
//! - Transport failures arrive as [`Inbound::Error`] values; they never end
//!   the stream on their own.
//! - Completion is the broadcast closing: every receiver drains what it
//!   has buffered and then observes the end.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{trace, warn};

use crate::error::TransportError;
use crate::protocol::Frame;

// ============================================================================
// Inbound
// ============================================================================

/// One item on the inbound stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A decoded frame.
    Frame(Frame),
    /// A transport failure, delivered in-band.
    Error(TransportError),
}

impl Inbound {
    /// Returns the frame, if this item is one.
    #[inline]
    #[must_use]
    pub fn as_frame(&self) -> Option<&Frame> {
        match self {
            Self::Frame(frame) => Some(frame),
            Self::Error(_) => None,
        }
    }

    /// Converts into the frame, dropping errors.
    #[inline]
    #[must_use]
    pub fn into_frame(self) -> Option<Frame> {
        match self {
            Self::Frame(frame) => Some(frame),
            Self::Error(_) => None,
        }
    }

    /// Returns the transport error, if this item is one.
    #[inline]
    #[must_use]
    pub fn as_error(&self) -> Option<&TransportError> {
        match self {
            Self::Frame(_) => None,
            Self::Error(err) => Some(err),
        }
    }

    /// Decodes one text message from the wire.
    ///
    /// Undecodable text becomes [`TransportError::Decode`].
    #[must_use]
    pub fn decode(text: &str) -> Self {
        match Frame::from_json(text) {
            Ok(frame) => Self::Frame(frame),
            Err(e) => {
                warn!(error = %e, len = text.len(), "Failed to decode inbound frame");
                trace!(text = %text, "Undecodable frame text");
                Self::Error(TransportError::Decode(e.to_string()))
            }
        }
    }
}

// ============================================================================
// MessageChannel
// ============================================================================

/// Generic duplex frame channel.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Queues a frame for the wire.
    ///
    /// Never fails synchronously; write failures surface as
    /// [`Inbound::Error`] on the inbound stream.
    fn send(&self, frame: Frame);

    /// Opens a new receiver on the inbound stream.
    ///
    /// Once the channel has completed, the receiver is already closed.
    fn subscribe(&self) -> broadcast::Receiver<Inbound>;

    /// Tears the channel down and completes the inbound stream.
    async fn close(&self);

    /// Returns `true` once the inbound stream has completed.
    fn is_closed(&self) -> bool;
}

// ============================================================================
// InboundHub
// ============================================================================

/// Broadcast fan-out shared by channel implementations.
///
/// Holds the only broadcast sender; completing the hub drops it, which ends
/// every receiver after it drains.
#[derive(Debug)]
pub(crate) struct InboundHub {
    sender: Mutex<Option<broadcast::Sender<Inbound>>>,
}

impl InboundHub {
    /// Creates an open hub buffering up to `capacity` items per receiver.
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Mutex::new(Some(sender)),
        }
    }

    /// Opens a receiver. Returns an already-closed receiver after completion.
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Inbound> {
        match self.sender.lock().as_ref() {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = broadcast::channel(1);
                drop(sender);
                receiver
            }
        }
    }

    /// Broadcasts an item to all current receivers.
    pub(crate) fn publish(&self, item: Inbound) {
        let guard = self.sender.lock();
        match guard.as_ref() {
            Some(sender) => {
                // No receivers is not an error: nobody is listening yet.
                let receivers = sender.send(item).unwrap_or(0);
                trace!(receivers, "Inbound item published");
            }
            None => trace!("Inbound item dropped after completion"),
        }
    }

    /// Completes the stream. Returns `false` if it was already complete.
    pub(crate) fn complete(&self) -> bool {
        self.sender.lock().take().is_some()
    }

    /// Returns `true` once completed.
    pub(crate) fn is_complete(&self) -> bool {
        self.sender.lock().is_none()
    }
}

// ============================================================================
// Tests
// ============================================================================
