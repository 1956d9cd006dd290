//! DDP realtime client - streams-first access to a Rocket.Chat style
//! realtime API.
//!
//! This library speaks the DDP dialect used by Rocket.Chat's realtime API
//! over a single WebSocket and exposes every inbound frame as an async
//! stream.
//!
//! # Architecture
//!
//! The client is layered over a message channel:
//!
//! - **Channel**: sends frames, fans inbound frames out to every receiver
//! - **Router**: filtered sub-streams by message kind or by id
//! - **Correlator**: method calls with fresh ids, replies selected by id
//! - **Login flow**: merges the login `result` with the pushed `added` frame
//! - **Subscriptions**: `sub` on first poll, `unsub` when dropped
//!
//! Key design principles:
//!
//! - No replay: a stream sees frames that arrive after it was created
//! - Transport errors are values, not stream terminators
//! - Every caller owns its own receiver (no shared cursor)
//!
//! # Quick Start
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use ddp_realtime::{RealtimeClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = RealtimeClient::connect("wss://open.rocket.chat/websocket").await?;
//!
//!     client.connect_to_server().next().await;
//!     let _keep_alive = client.keep_alive();
//!
//!     let mut login = client.login("user@example.com", "secret")?;
//!     while let Some(frame) = login.next().await {
//!         println!("login: {frame:?}");
//!     }
//!
//!     let mut room = client.get_subscription("stream-room-messages", "GENERAL", false);
//!     while let Some(message) = room.next().await {
//!         println!("message: {message:?}");
//!     }
//!
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`RealtimeClient`], builder, router, login, subscriptions |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Correlation ids and id generators |
//! | [`protocol`] | DDP frames and login credentials |
//! | [`transport`] | Message channels (WebSocket, in-memory) |

// ============================================================================
// Modules
// ============================================================================

/// Realtime client: facade, router, correlator, login, subscriptions.
///
/// Use [`RealtimeClient::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Correlation identifiers.
///
/// Newtype wrapper plus the generators that mint fresh ids.
pub mod identifiers;

/// DDP wire protocol types.
pub mod protocol;

/// Message channel layer.
///
/// WebSocket and in-memory implementations of [`MessageChannel`].
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    ClientBuilder, ClientOptions, FrameRouter, FrameStream, InboundStream, LoginMerge,
    LoginState, Multiplexed, RealtimeClient, Subscription,
};

// Error types
pub use error::{Error, Result, TransportError};

// Identifier types
pub use identifiers::{CorrelationId, IdGenerator, SequentialIds, TimeOrderedIds};

// Protocol types
pub use protocol::{Credentials, Frame, MessageKind};

// Transport types
pub use transport::{Inbound, MemoryChannel, MessageChannel, WsChannel};
