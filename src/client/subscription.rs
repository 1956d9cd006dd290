//! Subscriptions scoped to consumer interest.
//!
//! [`Multiplexed`] is the generic primitive: it sends a `sub`-style frame
//! when first polled, yields inbound frames matching a predicate, and sends
//! the paired `unsub`-style frame when released. [`Subscription`] is the
//! stream-subscription handle built on it.
//!
//! # Lifecycle
//!
//! ```text
//! created ──first poll──► live (sub sent) ──drop / unsubscribe()──► released (unsub sent)
//!    └──────────────────────drop──────────────────────────────────► released (nothing sent)
//! ```
//!
//! A handle sends at most one `sub` and one `unsub`. A released handle
//! yields nothing and never resubscribes; mint a new one instead.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use futures_util::stream::StreamExt;
use serde_json::Value;
use tracing::debug;

use crate::identifiers::CorrelationId;
use crate::protocol::Frame;
use crate::transport::MessageChannel;

use super::router::{FrameStream, frame_stream};

// ============================================================================
// Types
// ============================================================================

/// Predicate selecting the frames a multiplexed stream yields.
pub type FramePredicate = Arc<dyn Fn(&Frame) -> bool + Send + Sync>;

// ============================================================================
// Multiplexed
// ============================================================================

/// Inbound sub-stream with open/close frames tied to consumer interest.
pub struct Multiplexed {
    channel: Arc<dyn MessageChannel>,
    /// Taken on first poll.
    open_frame: Option<Frame>,
    /// Taken on release.
    close_frame: Option<Frame>,
    predicate: FramePredicate,
    /// Present while live.
    inner: Option<FrameStream>,
}

impl fmt::Debug for Multiplexed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multiplexed")
            .field("live", &self.is_live())
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}

impl Multiplexed {
    /// Creates an idle stream; nothing is sent until it is polled.
    #[must_use]
    pub fn new(
        channel: Arc<dyn MessageChannel>,
        open_frame: Frame,
        close_frame: Frame,
        predicate: FramePredicate,
    ) -> Self {
        Self {
            channel,
            open_frame: Some(open_frame),
            close_frame: Some(close_frame),
            predicate,
            inner: None,
        }
    }

    /// Returns `true` while the open frame has been sent and the close
    /// frame has not.
    #[inline]
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.is_some()
    }

    /// Returns `true` once released; a released stream only yields `None`.
    #[inline]
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.open_frame.is_none() && self.inner.is_none()
    }

    /// Sends the open frame and starts listening, if not done already.
    ///
    /// Listening starts before the open frame goes out.
    fn activate(&mut self) {
        if let Some(open_frame) = self.open_frame.take() {
            let predicate = Arc::clone(&self.predicate);
            self.inner = Some(frame_stream(self.channel.subscribe(), move |frame| {
                predicate(frame)
            }));
            debug!(kind = %open_frame.kind(), id = ?open_frame.id(), "Multiplexed stream opened");
            self.channel.send(open_frame);
        }
    }

    /// Stops listening and sends the close frame if the open frame was sent.
    ///
    /// Safe to call any number of times.
    pub fn release(&mut self) {
        self.open_frame = None;
        if self.inner.take().is_some()
            && let Some(close_frame) = self.close_frame.take()
        {
            debug!(kind = %close_frame.kind(), id = ?close_frame.id(), "Multiplexed stream closed");
            self.channel.send(close_frame);
        }
    }
}

impl Stream for Multiplexed {
    type Item = Frame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        let this = &mut *self;
        this.activate();
        match this.inner.as_mut() {
            Some(inner) => inner.poll_next_unpin(cx),
            None => Poll::Ready(None),
        }
    }
}

impl Drop for Multiplexed {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Handle to one named, parameterized stream subscription.
///
/// Yields pushed frames whose `collection` equals the stream name and whose
/// `fields.eventName` equals the stream parameter. That is all the filter
/// checks; it does not look at the subscription id.
pub struct Subscription {
    id: CorrelationId,
    stream_name: String,
    stream_param: String,
    inner: Multiplexed,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("stream_name", &self.stream_name)
            .field("stream_param", &self.stream_param)
            .field("live", &self.inner.is_live())
            .finish()
    }
}

impl Subscription {
    /// Creates an idle subscription handle.
    ///
    /// The `sub` frame is `{msg:"sub", id, name: stream_name, params:[stream_param, add_event]}`.
    pub(crate) fn new(
        channel: Arc<dyn MessageChannel>,
        id: CorrelationId,
        stream_name: impl Into<String>,
        stream_param: impl Into<String>,
        add_event: bool,
    ) -> Self {
        let stream_name = stream_name.into();
        let stream_param = stream_param.into();

        let sub_frame = Frame::sub(
            id.clone(),
            stream_name.clone(),
            vec![Value::String(stream_param.clone()), Value::Bool(add_event)],
        );
        let unsub_frame = Frame::unsub(id.clone());

        let inner = Multiplexed::new(
            channel,
            sub_frame,
            unsub_frame,
            stream_filter(stream_name.clone(), stream_param.clone()),
        );

        Self {
            id,
            stream_name,
            stream_param,
            inner,
        }
    }

    /// Correlation id shared by the `sub` and `unsub` frames.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &CorrelationId {
        &self.id
    }

    /// Stream (publication) name.
    #[inline]
    #[must_use]
    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    /// Stream parameter, matched against `fields.eventName`.
    #[inline]
    #[must_use]
    pub fn stream_param(&self) -> &str {
        &self.stream_param
    }

    /// Returns `true` while subscribed on the server.
    #[inline]
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.is_live()
    }

    /// Releases the subscription now instead of on drop.
    pub fn unsubscribe(mut self) {
        self.inner.release();
    }
}

impl Stream for Subscription {
    type Item = Frame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        self.inner.poll_next_unpin(cx)
    }
}

/// Matches pushed documents of one stream and event name.
fn stream_filter(stream_name: String, stream_param: String) -> FramePredicate {
    Arc::new(move |frame: &Frame| {
        frame.collection() == Some(stream_name.as_str())
            && frame.event_name() == Some(stream_param.as_str())
    })
}

// ============================================================================
// Tests
// ============================================================================
