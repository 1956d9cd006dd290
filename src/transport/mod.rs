//! Message channel layer.
//!
//! The client never touches a socket directly; it talks to a
//! [`MessageChannel`], which carries frames out and fans inbound frames out
//! to any number of receivers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐    send(Frame)    ┌──────────────────┐   WebSocket   ┌──────────┐
//! │  RealtimeClient  │──────────────────►│    WsChannel     │◄─────────────►│  Server  │
//! │  (router, login, │◄──────────────────│  (event loop)    │               └──────────┘
//! │   subscriptions) │ broadcast<Inbound>└──────────────────┘
//! └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | [`MessageChannel`] contract and [`Inbound`] items |
//! | `connection` | WebSocket implementation and event loop |
//! | `memory` | In-process implementation |

// ============================================================================
// Submodules
// ============================================================================

/// Channel contract and inbound fan-out.
pub mod channel;

/// WebSocket channel and event loop.
pub mod connection;

/// In-process channel.
pub mod memory;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{Inbound, MessageChannel};
pub use connection::WsChannel;
pub use memory::MemoryChannel;
