//! WebSocket message channel and its event loop.
//!
//! # Event Loop
//!
//! The channel spawns one tokio task that handles:
//!
//! - Incoming text messages, decoded into frames and broadcast
//! - Outgoing frames queued by [`WsChannel::send`]
//! - Graceful shutdown on [`WsChannel::close`]
//!
//! When the loop ends for any reason the inbound broadcast completes.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, connect_async};
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::error::{Error, Result, TransportError};
use crate::protocol::Frame;

use super::channel::{Inbound, InboundHub, MessageChannel};

// ============================================================================
// ChannelCommand
// ============================================================================

/// Internal commands for the event loop.
enum ChannelCommand {
    /// Write a frame to the socket.
    Send(Frame),
    /// Close the socket, then acknowledge.
    Shutdown(oneshot::Sender<()>),
}

// ============================================================================
// WsChannel
// ============================================================================

/// [`MessageChannel`] over a WebSocket connection.
///
/// # Thread Safety
///
/// `WsChannel` is `Send + Sync`; share it behind an `Arc`.
pub struct WsChannel {
    /// Commands for the event loop.
    command_tx: mpsc::UnboundedSender<ChannelCommand>,
    /// Inbound fan-out (shared with event loop).
    hub: Arc<InboundHub>,
    /// Set by the first `close`.
    closing: AtomicBool,
}

impl fmt::Debug for WsChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsChannel")
            .field("closing", &self.closing.load(Ordering::Relaxed))
            .field("complete", &self.hub.is_complete())
            .finish_non_exhaustive()
    }
}

impl WsChannel {
    /// Opens a WebSocket connection to `url`.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the handshake does not finish in time
    /// - [`Error::WebSocket`] if the handshake fails
    pub async fn connect(url: &Url, capacity: usize, connect_timeout: Duration) -> Result<Self> {
        debug!(%url, "Opening WebSocket connection");

        let (ws_stream, _response) = timeout(connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| Error::connection_timeout(connect_timeout.as_millis() as u64))??;

        debug!(%url, "WebSocket connection established");

        Ok(Self::from_stream(ws_stream, capacity))
    }

    /// Wraps an already-open WebSocket stream.
    ///
    /// Spawns the event loop task internally, so this must be called from
    /// within a tokio runtime.
    pub fn from_stream<S>(ws_stream: WebSocketStream<S>, capacity: usize) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let hub = Arc::new(InboundHub::new(capacity));

        tokio::spawn(Self::run_event_loop(ws_stream, command_rx, Arc::clone(&hub)));

        Self {
            command_tx,
            hub,
            closing: AtomicBool::new(false),
        }
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop<S>(
        ws_stream: WebSocketStream<S>,
        mut command_rx: mpsc::UnboundedReceiver<ChannelCommand>,
        hub: Arc<InboundHub>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Incoming messages from server
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(len = text.len(), "Inbound text message");
                            hub.publish(Inbound::decode(&text));
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            hub.publish(Inbound::Error(TransportError::WebSocket(e.to_string())));
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong, Frame
                        _ => {}
                    }
                }

                // Commands from the client
                command = command_rx.recv() => {
                    match command {
                        Some(ChannelCommand::Send(frame)) => {
                            Self::handle_send(frame, &mut ws_write, &hub).await;
                        }

                        Some(ChannelCommand::Shutdown(ack)) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            let _ = ack.send(());
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        hub.complete();

        debug!("Event loop terminated");
    }

    /// Serializes and writes one frame.
    async fn handle_send<S>(
        frame: Frame,
        ws_write: &mut SplitSink<WebSocketStream<S>, Message>,
        hub: &InboundHub,
    ) where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let kind = frame.kind();

        let json = match frame.to_json() {
            Ok(j) => j,
            Err(e) => {
                warn!(%kind, error = %e, "Failed to serialize outbound frame");
                hub.publish(Inbound::Error(TransportError::Send(e.to_string())));
                return;
            }
        };

        if let Err(e) = ws_write.send(Message::Text(json.into())).await {
            warn!(%kind, error = %e, "Failed to write outbound frame");
            hub.publish(Inbound::Error(TransportError::Send(e.to_string())));
            return;
        }

        trace!(%kind, id = ?frame.id(), "Frame sent");
    }
}

#[async_trait]
impl MessageChannel for WsChannel {
    fn send(&self, frame: Frame) {
        if self.command_tx.send(ChannelCommand::Send(frame)).is_err() {
            warn!("Send on a terminated WebSocket channel");
            self.hub.publish(Inbound::Error(TransportError::Send(
                "channel terminated".to_string(),
            )));
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<Inbound> {
        self.hub.subscribe()
    }

    async fn close(&self) {
        if self.closing.swap(true, Ordering::SeqCst) {
            trace!("WebSocket channel already closing");
            return;
        }

        let (ack_tx, ack_rx) = oneshot::channel();
        if self.command_tx.send(ChannelCommand::Shutdown(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    fn is_closed(&self) -> bool {
        self.hub.is_complete()
    }
}

// ============================================================================
// Tests
// ============================================================================
