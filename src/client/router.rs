//! Inbound frame routing.
//!
//! The router turns the channel's single inbound broadcast into lazily
//! consumed, filtered sub-streams: by message kind, by id, or by an
//! arbitrary predicate.
//!
//! Every stream subscribes to the broadcast when it is *created*, not when
//! it is first polled. Creating the stream before sending a request is
//! therefore enough to never miss the reply.
//!
//! Transport errors are items of [`FrameRouter::inbound`]. Filtered
//! streams select frames only, so an error passes them by without ending
//! them.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use futures_util::future;
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::error::TransportError;
use crate::protocol::{Frame, MessageKind};
use crate::transport::{Inbound, MessageChannel};

// ============================================================================
// Types
// ============================================================================

/// Inbound items, transport errors included.
pub type InboundStream = BoxStream<'static, Inbound>;

/// Inbound frames selected by some predicate.
pub type FrameStream = BoxStream<'static, Frame>;

// ============================================================================
// Receiver Helpers
// ============================================================================

/// Receives the next inbound item, turning lag into an in-band error.
///
/// Returns `None` once the channel has completed.
pub(crate) async fn recv_inbound(rx: &mut broadcast::Receiver<Inbound>) -> Option<Inbound> {
    match rx.recv().await {
        Ok(item) => Some(item),
        Err(RecvError::Lagged(skipped)) => {
            warn!(skipped, "Inbound receiver lagged");
            Some(Inbound::Error(TransportError::Lagged(skipped)))
        }
        Err(RecvError::Closed) => None,
    }
}

/// Adapts a receiver into a stream of inbound items.
pub(crate) fn inbound_stream(rx: broadcast::Receiver<Inbound>) -> InboundStream {
    stream::unfold(rx, |mut rx| async move {
        recv_inbound(&mut rx).await.map(|item| (item, rx))
    })
    .boxed()
}

/// Adapts a receiver into a stream of frames matching `predicate`.
pub(crate) fn frame_stream<P>(rx: broadcast::Receiver<Inbound>, predicate: P) -> FrameStream
where
    P: Fn(&Frame) -> bool + Send + 'static,
{
    inbound_stream(rx)
        .filter_map(move |item| future::ready(item.into_frame().filter(|frame| predicate(frame))))
        .boxed()
}

// ============================================================================
// FrameRouter
// ============================================================================

/// Produces filtered views of a channel's inbound stream.
#[derive(Clone)]
pub struct FrameRouter {
    channel: Arc<dyn MessageChannel>,
}

impl fmt::Debug for FrameRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameRouter")
            .field("closed", &self.channel.is_closed())
            .finish()
    }
}

impl FrameRouter {
    /// Creates a router over `channel`.
    #[inline]
    #[must_use]
    pub fn new(channel: Arc<dyn MessageChannel>) -> Self {
        Self { channel }
    }

    /// Opens a raw receiver on the inbound broadcast.
    #[inline]
    pub(crate) fn receiver(&self) -> broadcast::Receiver<Inbound> {
        self.channel.subscribe()
    }

    /// Every inbound item, transport errors included.
    #[must_use]
    pub fn inbound(&self) -> InboundStream {
        inbound_stream(self.receiver())
    }

    /// Every inbound frame.
    #[must_use]
    pub fn frames(&self) -> FrameStream {
        frame_stream(self.receiver(), |_| true)
    }

    /// Inbound frames matching `predicate`.
    #[must_use]
    pub fn filtered<P>(&self, predicate: P) -> FrameStream
    where
        P: Fn(&Frame) -> bool + Send + 'static,
    {
        frame_stream(self.receiver(), predicate)
    }

    /// Inbound frames whose `msg` is `kind`.
    #[must_use]
    pub fn by_message_type(&self, kind: MessageKind) -> FrameStream {
        self.filtered(move |frame| frame.kind() == kind)
    }

    /// Inbound frames whose `id` equals `id`.
    #[must_use]
    pub fn by_id(&self, id: impl Into<String>) -> FrameStream {
        let id = id.into();
        self.filtered(move |frame| frame.id() == Some(id.as_str()))
    }
}

// ============================================================================
// Tests
// ============================================================================
