//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`RealtimeClient`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use ddp_realtime::RealtimeClient;
//!
//! # async fn example() -> ddp_realtime::Result<()> {
//! let client = RealtimeClient::builder()
//!     .url("wss://chat.example.com/websocket")
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{IdGenerator, TimeOrderedIds};
use crate::transport::{MessageChannel, WsChannel};

use super::core::RealtimeClient;
use super::options::ClientOptions;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`RealtimeClient`] instance.
///
/// Use [`RealtimeClient::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct ClientBuilder {
    /// Server URL, as given.
    url: Option<String>,
    /// Pre-built channel; takes precedence over opening a socket.
    channel: Option<Arc<dyn MessageChannel>>,
    /// Correlation id source.
    ids: Option<Arc<dyn IdGenerator>>,
    /// Tuning options.
    options: ClientOptions,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("url", &self.url)
            .field("has_channel", &self.channel.is_some())
            .field("has_id_generator", &self.ids.is_some())
            .field("options", &self.options)
            .finish()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server URL.
    ///
    /// `ws://` and `wss://` are used as is; `http://` and `https://` are
    /// rewritten to their WebSocket counterparts.
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Uses an already-open channel instead of connecting by URL.
    #[inline]
    #[must_use]
    pub fn channel(mut self, channel: Arc<dyn MessageChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Sets the correlation id generator.
    #[inline]
    #[must_use]
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Sets the tuning options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds a client over the configured channel.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no channel was set or options are invalid
    /// - [`Error::InvalidUrl`] if a URL was set and is unusable
    pub fn build(self) -> Result<RealtimeClient> {
        self.validate_options()?;
        let url = self.validate_url()?;

        let channel = self.channel.clone().ok_or_else(|| {
            Error::config(
                "A channel is required for build(). Use .channel() or call .connect() with .url().",
            )
        })?;

        Ok(self.finish(url, channel))
    }

    /// Builds a client, opening a WebSocket unless a channel was set.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if neither URL nor channel was set, or options are invalid
    /// - [`Error::InvalidUrl`] if the URL is unusable
    /// - [`Error::ConnectionTimeout`] / [`Error::WebSocket`] if the socket cannot be opened
    pub async fn connect(self) -> Result<RealtimeClient> {
        self.validate_options()?;
        let url = self.validate_url()?;

        let channel: Arc<dyn MessageChannel> = match (&self.channel, &url) {
            (Some(channel), _) => Arc::clone(channel),
            (None, Some(url)) => Arc::new(
                WsChannel::connect(
                    url,
                    self.options.channel_capacity,
                    self.options.connect_timeout,
                )
                .await?,
            ),
            (None, None) => {
                return Err(Error::config(
                    "A server URL or a channel is required. Use .url() or .channel().\n\
                     Example: RealtimeClient::builder().url(\"wss://host/websocket\")",
                ));
            }
        };

        Ok(self.finish(url, channel))
    }

    fn finish(self, url: Option<Url>, channel: Arc<dyn MessageChannel>) -> RealtimeClient {
        let ids = self.ids.unwrap_or_else(|| Arc::new(TimeOrderedIds));
        RealtimeClient::new(url, channel, ids, self.options)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Validates the URL configuration, if any.
    fn validate_url(&self) -> Result<Option<Url>> {
        self.url.as_deref().map(parse_ws_url).transpose()
    }

    /// Validates option ranges.
    fn validate_options(&self) -> Result<()> {
        if self.options.channel_capacity == 0 {
            return Err(Error::config("channel_capacity must be at least 1"));
        }
        if self.options.login_backlog_limit == 0 {
            return Err(Error::config("login_backlog_limit must be at least 1"));
        }
        Ok(())
    }
}

/// Parses a server URL and normalizes it to a WebSocket scheme.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] for unparsable URLs and unsupported schemes.
pub fn parse_ws_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim()).map_err(|e| Error::invalid_url(raw, e.to_string()))?;

    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => {
            return Err(Error::invalid_url(
                raw,
                format!("unsupported scheme '{other}', expected ws(s) or http(s)"),
            ));
        }
    };

    if url.scheme() != scheme {
        url.set_scheme(scheme)
            .map_err(|()| Error::invalid_url(raw, format!("cannot switch scheme to '{scheme}'")))?;
    }

    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================
