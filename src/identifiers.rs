//! Type-safe identifiers for bridge entities.
//!
//! Newtype wrappers prevent mixing a correlation token with an event name
//! or a listener handle at compile time.
//!
//! | Type | Wraps | Source |
//! |------|-------|--------|
//! | [`CorrelationId`] | opaque string token | [`CorrelationIdGenerator`] |
//! | [`ListenerId`] | `u64` | process-wide counter |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// CorrelationId
// ============================================================================

/// Opaque token linking an invocation to its eventual result.
///
/// The bridge never inspects the contents; it only compares and hashes them.
/// Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    /// Wraps an existing token.
    #[inline]
    #[must_use]
    pub fn new(token: impl AsRef<str>) -> Self {
        Self(Arc::from(token.as_ref()))
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

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<Uuid> for CorrelationId {
    fn from(value: Uuid) -> Self {
        Self::from(value.to_string())
    }
}

// ============================================================================
// CorrelationIdGenerator
// ============================================================================

/// Produces correlation tokens for new invocations.
///
/// Implementations must return a token that is unique among the invocations
/// currently outstanding on the bridge. A collision surfaces from
/// `invoke` as [`Error::DuplicateId`](crate::Error::DuplicateId).
pub trait CorrelationIdGenerator: Send + Sync {
    /// Returns a fresh token.
    fn generate(&self) -> CorrelationId;
}

/// Default generator backed by random (v4) UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl CorrelationIdGenerator for UuidGenerator {
    #[inline]
    fn generate(&self) -> CorrelationId {
        CorrelationId::from(Uuid::new_v4())
    }
}

impl<F> CorrelationIdGenerator for F
where
    F: Fn() -> CorrelationId + Send + Sync,
{
    #[inline]
    fn generate(&self) -> CorrelationId {
        self()
    }
}

// ============================================================================
// ListenerId
// ============================================================================

/// Global counter for listener ids.
static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a single event subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocates the next listener id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use rustc_hash::FxHashSet;

    #[test]
    fn test_uuid_generator_unique() {
        let generator = UuidGenerator;
        let ids: FxHashSet<_> = (0..1000).map(|_| generator.generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_correlation_id_display() {
        let id = CorrelationId::new("req-1");
        assert_eq!(id.to_string(), "req-1");
        assert_eq!(id.as_str(), "req-1");
    }

    #[test]
    fn test_correlation_id_serializes_as_string() {
        let id = CorrelationId::new("req-7");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"req-7\"");

        let back: CorrelationId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn test_closure_generator() {
        let generator = || CorrelationId::new("fixed");
        assert_eq!(generator.generate().as_str(), "fixed");
    }

    #[test]
    fn test_listener_id_increments() {
        let a = ListenerId::next();
        let b = ListenerId::next();
        assert!(b.as_u64() > a.as_u64());
    }
}
