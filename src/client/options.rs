//! Client tuning options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use ddp_realtime::ClientOptions;
//!
//! let options = ClientOptions::new()
//!     .with_channel_capacity(4096)
//!     .with_added_timeout(Duration::from_secs(10));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default inbound broadcast capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Default bound on frames the login merge will buffer or scan.
pub const DEFAULT_LOGIN_BACKLOG_LIMIT: usize = 256;

/// Default timeout for [`call`](crate::RealtimeClient::call) (30s).
pub const DEFAULT_METHOD_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for opening the WebSocket.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Protocol version proposed in `connect`.
pub const DEFAULT_PROTOCOL_VERSION: &str = "1";

/// Versions advertised in `connect`, in preference order.
pub const DEFAULT_SUPPORTED_VERSIONS: &[&str] = &["1", "pre2", "pre1"];

// ============================================================================
// ClientOptions
// ============================================================================

/// Tuning knobs for a [`RealtimeClient`](crate::RealtimeClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Inbound items buffered per receiver before it starts lagging.
    pub channel_capacity: usize,

    /// Version proposed in the `connect` frame.
    pub protocol_version: String,

    /// Versions listed in the `connect` frame's `support` array.
    pub supported_versions: Vec<String>,

    /// Frames the login merge keeps while waiting for `result`, and frames
    /// it scans while waiting for `added`, before giving up.
    pub login_backlog_limit: usize,

    /// Deadline for the `added` frame once the login `result` arrived.
    ///
    /// `None` waits until the backlog limit or stream completion.
    pub added_timeout: Option<Duration>,

    /// Timeout applied by [`call`](crate::RealtimeClient::call).
    pub method_timeout: Duration,

    /// Timeout for the WebSocket handshake when connecting by URL.
    pub connect_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientOptions {
    /// Creates options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            supported_versions: DEFAULT_SUPPORTED_VERSIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
            login_backlog_limit: DEFAULT_LOGIN_BACKLOG_LIMIT,
            added_timeout: None,
            method_timeout: DEFAULT_METHOD_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientOptions {
    /// Sets the inbound broadcast capacity.
    #[inline]
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Sets the protocol version and advertised versions.
    #[must_use]
    pub fn with_protocol(
        mut self,
        version: impl Into<String>,
        supported: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.protocol_version = version.into();
        self.supported_versions = supported.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the login merge backlog bound.
    #[inline]
    #[must_use]
    pub fn with_login_backlog_limit(mut self, limit: usize) -> Self {
        self.login_backlog_limit = limit;
        self
    }

    /// Sets a deadline for the login `added` frame.
    #[inline]
    #[must_use]
    pub fn with_added_timeout(mut self, timeout: Duration) -> Self {
        self.added_timeout = Some(timeout);
        self
    }

    /// Sets the [`call`](crate::RealtimeClient::call) timeout.
    #[inline]
    #[must_use]
    pub fn with_method_timeout(mut self, timeout: Duration) -> Self {
        self.method_timeout = timeout;
        self
    }

    /// Sets the WebSocket handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
