//! Realtime client module.
//!
//! This module provides the main entry point for talking to a server.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RealtimeClient`] | Facade over one message channel |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`ClientOptions`] | Timeouts, capacities and protocol versions |
//! | [`FrameRouter`] | Filtered views of the inbound stream |
//! | [`LoginMerge`] | Result/added merge state machine |
//! | [`Subscription`] | Stream subscription tied to consumer interest |
//!
//! # Example
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use ddp_realtime::{RealtimeClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = RealtimeClient::builder()
//!     .url("wss://open.rocket.chat/websocket")
//!     .connect()
//!     .await?;
//!
//! client.connect_to_server().next().await;
//! let rooms = client.call("rooms/get", vec![]).await?;
//! println!("{rooms}");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

/// Login flow and result/added merge.
pub mod login;

/// Client tuning options.
pub mod options;

/// Inbound frame routing.
pub mod router;

/// Stream subscriptions.
pub mod subscription;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{ClientBuilder, parse_ws_url};
pub use core::{CompletionHook, ErrorHook, MessageHook, RealtimeClient};
pub use login::{LOGIN_METHOD, LoginMerge, LoginState};
pub use options::ClientOptions;
pub use router::{FrameRouter, FrameStream, InboundStream};
pub use subscription::{FramePredicate, Multiplexed, Subscription};
