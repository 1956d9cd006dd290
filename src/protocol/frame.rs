//! Wire frames exchanged with the server.
//!
//! Every frame is a JSON object discriminated by its `msg` field. Frames are
//! decoded into [`Frame`] once, at the channel boundary; everything above
//! the transport works with typed variants.
//!
//! The one exception is the server banner `{"server_id": "0"}`, sent once
//! before the handshake without a `msg`. It decodes to [`Frame::ServerId`].
//!
//! # Format
//!
//! ```json
//! { "msg": "method", "method": "login", "id": "42", "params": [ ... ] }
//! { "msg": "result", "id": "42", "result": { "id": "user-id", "token": "..." } }
//! { "msg": "added", "collection": "users", "id": "user-id", "fields": { ... } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identifiers::CorrelationId;

// ============================================================================
// Frame
// ============================================================================

/// One message on the wire, keyed by `msg`.
///
/// Opaque payloads (`params`, `result`, `error`, `fields`) are kept as
/// [`Value`]; their meaning belongs to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "lowercase")]
pub enum Frame {
    /// Client handshake.
    Connect {
        /// Proposed protocol version.
        version: String,
        /// Versions the client can speak, in preference order.
        support: Vec<String>,
        /// Session to resume, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<String>,
    },

    /// Handshake accepted.
    Connected {
        /// Server-assigned session identifier.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<String>,
    },

    /// Handshake rejected.
    Failed {
        /// Version the server suggests instead.
        version: String,
    },

    /// Heartbeat request.
    Ping {
        /// Optional token to echo back.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// Heartbeat answer.
    Pong {
        /// Token copied from the ping.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// Remote method invocation.
    Method {
        /// Method name.
        method: String,
        /// Correlation id.
        id: CorrelationId,
        /// Positional arguments.
        #[serde(default)]
        params: Vec<Value>,
    },

    /// Outcome of a method invocation.
    Result {
        /// Correlation id of the invocation.
        id: CorrelationId,
        /// Return value on success.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        /// Failure payload. Presence alone signals failure.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },

    /// Side effects of the listed methods have been delivered.
    Updated {
        /// Correlation ids of the finished methods.
        #[serde(default)]
        methods: Vec<CorrelationId>,
    },

    /// Subscription request.
    Sub {
        /// Correlation id, reused by the matching `unsub`.
        id: CorrelationId,
        /// Publication name.
        name: String,
        /// Publication arguments.
        #[serde(default)]
        params: Vec<Value>,
    },

    /// Subscription cancellation.
    Unsub {
        /// Correlation id of the `sub` being cancelled.
        id: CorrelationId,
    },

    /// Subscription refused or terminated by the server.
    Nosub {
        /// Correlation id of the subscription.
        id: CorrelationId,
        /// Reason, when the server gives one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },

    /// Initial data for the listed subscriptions has been sent.
    Ready {
        /// Correlation ids of the ready subscriptions.
        #[serde(default)]
        subs: Vec<CorrelationId>,
    },

    /// Document added to a collection.
    Added {
        /// Collection (or stream) name.
        collection: String,
        /// Document id. Not a correlation id.
        id: String,
        /// Document body.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fields: Option<Map<String, Value>>,
    },

    /// Document changed in a collection.
    Changed {
        /// Collection (or stream) name.
        collection: String,
        /// Document id.
        id: String,
        /// Updated fields.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fields: Option<Map<String, Value>>,
        /// Removed field names.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cleared: Option<Vec<String>>,
    },

    /// Document removed from a collection.
    Removed {
        /// Collection (or stream) name.
        collection: String,
        /// Document id.
        id: String,
    },

    /// Server could not process a client frame.
    #[serde(rename = "error")]
    ServerError {
        /// Human readable reason.
        reason: String,
        /// The frame that triggered the error.
        #[serde(
            rename = "offendingMessage",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        offending_message: Option<Value>,
    },

    /// Server banner, sent before the handshake. Has no `msg` on the wire.
    #[serde(skip)]
    ServerId {
        /// Opaque server identifier.
        server_id: String,
    },

    /// Any `msg` kind this client does not know.
    #[serde(other)]
    Unknown,
}

// ============================================================================
// Frame - Constructors
// ============================================================================

impl Frame {
    /// Builds a `connect` handshake frame.
    #[must_use]
    pub fn connect(version: impl Into<String>, support: Vec<String>) -> Self {
        Self::Connect {
            version: version.into(),
            support,
            session: None,
        }
    }

    /// Builds a `method` frame.
    #[must_use]
    pub fn method(id: CorrelationId, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self::Method {
            method: method.into(),
            id,
            params,
        }
    }

    /// Builds a `sub` frame.
    #[must_use]
    pub fn sub(id: CorrelationId, name: impl Into<String>, params: Vec<Value>) -> Self {
        Self::Sub {
            id,
            name: name.into(),
            params,
        }
    }

    /// Builds an `unsub` frame.
    #[inline]
    #[must_use]
    pub fn unsub(id: CorrelationId) -> Self {
        Self::Unsub { id }
    }

    /// Builds a `pong`, echoing the ping token.
    #[inline]
    #[must_use]
    pub fn pong(id: Option<String>) -> Self {
        Self::Pong { id }
    }
}

// ============================================================================
// Frame - Accessors
// ============================================================================

impl Frame {
    /// Returns the `msg` discriminator of this frame.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Connect { .. } => MessageKind::Connect,
            Self::Connected { .. } => MessageKind::Connected,
            Self::Failed { .. } => MessageKind::Failed,
            Self::Ping { .. } => MessageKind::Ping,
            Self::Pong { .. } => MessageKind::Pong,
            Self::Method { .. } => MessageKind::Method,
            Self::Result { .. } => MessageKind::Result,
            Self::Updated { .. } => MessageKind::Updated,
            Self::Sub { .. } => MessageKind::Sub,
            Self::Unsub { .. } => MessageKind::Unsub,
            Self::Nosub { .. } => MessageKind::Nosub,
            Self::Ready { .. } => MessageKind::Ready,
            Self::Added { .. } => MessageKind::Added,
            Self::Changed { .. } => MessageKind::Changed,
            Self::Removed { .. } => MessageKind::Removed,
            Self::ServerError { .. } => MessageKind::Error,
            Self::ServerId { .. } => MessageKind::ServerId,
            Self::Unknown => MessageKind::Unknown,
        }
    }

    /// Returns the frame's `id` field, if it has one.
    ///
    /// For request/response kinds this is a correlation id; for document
    /// kinds (`added`, `changed`, `removed`) it is the document id.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Method { id, .. }
            | Self::Result { id, .. }
            | Self::Sub { id, .. }
            | Self::Unsub { id }
            | Self::Nosub { id, .. } => Some(id.as_str()),
            Self::Added { id, .. } | Self::Changed { id, .. } | Self::Removed { id, .. } => {
                Some(id.as_str())
            }
            Self::Ping { id } | Self::Pong { id } => id.as_deref(),
            _ => None,
        }
    }

    /// Returns the collection of a document frame.
    #[must_use]
    pub fn collection(&self) -> Option<&str> {
        match self {
            Self::Added { collection, .. }
            | Self::Changed { collection, .. }
            | Self::Removed { collection, .. } => Some(collection.as_str()),
            _ => None,
        }
    }

    /// Returns the `fields` map of a document frame.
    #[must_use]
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Added { fields, .. } | Self::Changed { fields, .. } => fields.as_ref(),
            _ => None,
        }
    }

    /// Returns `fields.eventName`, the logical stream a pushed document belongs to.
    #[must_use]
    pub fn event_name(&self) -> Option<&str> {
        self.fields()
            .and_then(|fields| fields.get("eventName"))
            .and_then(Value::as_str)
    }

    /// Returns the `error` payload of a `result` or `nosub` frame.
    #[must_use]
    pub fn error(&self) -> Option<&Value> {
        match self {
            Self::Result { error, .. } | Self::Nosub { error, .. } => error.as_ref(),
            _ => None,
        }
    }

    /// Returns `true` for a `result` frame without an `error` payload.
    #[inline]
    #[must_use]
    pub fn is_successful_result(&self) -> bool {
        matches!(self, Self::Result { error: None, .. })
    }

    /// Returns `result.id` of a `result` frame, if it is a string.
    ///
    /// Login results name the freshly created session document this way.
    #[must_use]
    pub fn result_id(&self) -> Option<&str> {
        match self {
            Self::Result {
                result: Some(result),
                ..
            } => result.get("id").and_then(Value::as_str),
            _ => None,
        }
    }
}

// ============================================================================
// Frame - JSON
// ============================================================================

impl Frame {
    /// Decodes a frame from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the text is neither the server banner
    /// nor a JSON object with a string `msg` field and well-typed known
    /// fields.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Decodes a frame from an already parsed JSON value.
    ///
    /// # Errors
    ///
    /// See [`from_json`](Self::from_json).
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        if let Some(object) = value.as_object()
            && !object.contains_key("msg")
            && let Some(server_id) = object.get("server_id").and_then(Value::as_str)
        {
            return Ok(Self::ServerId {
                server_id: server_id.to_string(),
            });
        }
        serde_json::from_value(value)
    }

    /// Encodes the frame as JSON text.
    ///
    /// # Errors
    ///
    /// Returns the serde error if a payload value cannot be serialized.
    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            Self::ServerId { server_id } => {
                serde_json::to_string(&serde_json::json!({ "server_id": server_id }))
            }
            _ => serde_json::to_string(self),
        }
    }
}

// ============================================================================
// MessageKind
// ============================================================================

/// The `msg` discriminator, used to route inbound frames by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// `connect`
    Connect,
    /// `connected`
    Connected,
    /// `failed`
    Failed,
    /// `ping`
    Ping,
    /// `pong`
    Pong,
    /// `method`
    Method,
    /// `result`
    Result,
    /// `updated`
    Updated,
    /// `sub`
    Sub,
    /// `unsub`
    Unsub,
    /// `nosub`
    Nosub,
    /// `ready`
    Ready,
    /// `added`
    Added,
    /// `changed`
    Changed,
    /// `removed`
    Removed,
    /// `error`
    Error,
    /// The `server_id` banner.
    ServerId,
    /// Anything else.
    Unknown,
}

impl MessageKind {
    /// Returns the wire spelling of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Connected => "connected",
            Self::Failed => "failed",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Method => "method",
            Self::Result => "result",
            Self::Updated => "updated",
            Self::Sub => "sub",
            Self::Unsub => "unsub",
            Self::Nosub => "nosub",
            Self::Ready => "ready",
            Self::Added => "added",
            Self::Changed => "changed",
            Self::Removed => "removed",
            Self::Error => "error",
            Self::ServerId => "server_id",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
