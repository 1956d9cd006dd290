//! Wire protocol message types.
//!
//! # Protocol Overview
//!
//! | Kind | Direction | Purpose |
//! |------|-----------|---------|
//! | `connect` / `connected` / `failed` | Out / In / In | Handshake |
//! | `ping` / `pong` | Both | Heartbeat |
//! | `method` / `result` / `updated` | Out / In / In | Correlated method calls |
//! | `sub` / `unsub` / `nosub` / `ready` | Out / Out / In / In | Subscriptions |
//! | `added` / `changed` / `removed` | In | Pushed documents |
//! | `error` | In | Frame rejected by the server |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | [`Frame`] and [`MessageKind`] |
//! | `credentials` | Login payloads |

// ============================================================================
// Submodules
// ============================================================================

/// Login credential payloads.
pub mod credentials;

/// Frame definitions.
pub mod frame;

// ============================================================================
// Re-exports
// ============================================================================

pub use credentials::{Credentials, OAuthCredential, PasswordDigest, UserIdentifier};
pub use frame::{Frame, MessageKind};
