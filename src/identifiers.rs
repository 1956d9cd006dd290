//! Correlation identifiers and the generators that mint them.
//!
//! Every outbound `method` and `sub` frame carries a [`CorrelationId`]; the
//! inbound stream is demultiplexed back to its caller by that id alone.
//!
//! Minting is an injected capability ([`IdGenerator`]) so tests can use the
//! deterministic [`SequentialIds`] while production uses [`TimeOrderedIds`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// CorrelationId
// ============================================================================

/// Process-unique token linking an outbound request to its inbound frames.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Wraps an existing token.
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the token as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CorrelationId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for CorrelationId {
    #[inline]
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CorrelationId {
    #[inline]
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl PartialEq<str> for CorrelationId {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for CorrelationId {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// ============================================================================
// IdGenerator
// ============================================================================

/// Capability that mints unique correlation ids.
///
/// Implementations must never hand out the same id twice for the lifetime
/// of a client.
pub trait IdGenerator: Send + Sync {
    /// Mints the next id.
    fn next_id(&self) -> CorrelationId;
}

/// Time-ordered UUIDv7 ids. The default generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeOrderedIds;

impl IdGenerator for TimeOrderedIds {
    #[inline]
    fn next_id(&self) -> CorrelationId {
        CorrelationId(Uuid::now_v7().to_string())
    }
}

/// Deterministic `prefix-N` ids, counting up from 1.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIds {
    /// Creates a generator producing `prefix-1`, `prefix-2`, ...
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> CorrelationId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        CorrelationId(format!("{}-{}", self.prefix, n))
    }
}

// ============================================================================
// Tests
// ============================================================================
