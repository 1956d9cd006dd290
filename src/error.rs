//! Error types for the realtime client.
//!
//! Two error families live here:
//!
//! - [`enum@Error`] is returned by fallible *calls* (construction, the
//!   `call` convenience helper, channel setup).
//! - [`TransportError`] is never returned. It travels *in-band* on the
//!   inbound stream as an ordinary value, so one socket hiccup does not end
//!   every derived sequence.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Construction | [`Error::Config`], [`Error::InvalidUrl`] |
//! | Connection | [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::MethodFailed`] |
//! | Execution | [`Error::RequestTimeout`] |
//! | External | [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use serde_json::Value;
use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::CorrelationId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Construction Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned by the builder when neither a URL nor a channel was given,
    /// or when options are out of range.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// The server URL cannot be used for a WebSocket connection.
    #[error("Invalid server URL '{url}': {reason}")]
    InvalidUrl {
        /// URL as given by the caller.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Connection timeout while opening the socket or awaiting `connected`.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The inbound stream completed before the awaited frame arrived.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// The server answered the handshake with `failed`.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// A `result` frame carried an `error` payload.
    #[error("Method '{method}' failed: {error}")]
    MethodFailed {
        /// Invoked method name.
        method: String,
        /// Server-provided error payload, untouched.
        error: Value,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// No `result` frame arrived for a method call in time.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The correlation id of the unanswered call.
        request_id: CorrelationId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid URL error.
    #[inline]
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a method failure error.
    #[inline]
    pub fn method_failed(method: impl Into<String>, error: Value) -> Self {
        Self::MethodFailed {
            method: method.into(),
            error,
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: CorrelationId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error happened while constructing a client.
    #[inline]
    #[must_use]
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::InvalidUrl { .. }
        )
    }
}

// ============================================================================
// TransportError
// ============================================================================

/// Transport failure delivered as a value on the inbound stream.
///
/// Cloneable so that every receiver of the broadcast sees its own copy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The socket reported an error.
    #[error("WebSocket transport error: {0}")]
    WebSocket(String),

    /// An inbound text message was not a valid frame.
    #[error("Undecodable frame: {0}")]
    Decode(String),

    /// This receiver fell behind and missed frames.
    #[error("Receiver lagged, {0} frames skipped")]
    Lagged(u64),

    /// An outbound frame could not be written.
    #[error("Send failed: {0}")]
    Send(String),
}

// ============================================================================
// Tests
// ============================================================================
