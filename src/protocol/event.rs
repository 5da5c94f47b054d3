//! Event message type.
//!
//! Events are fire-and-forget notifications. Neither side acknowledges them,
//! and an event with no listeners on the receiving side is simply dropped.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// OutboundEvent
// ============================================================================

/// A named event waiting for the counterpart to drain it.
///
/// # Format
///
/// ```json
/// {
///   "event": "theme-changed",
///   "payload": { "dark": true }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEvent {
    /// Event name.
    pub event: String,

    /// Event-specific data.
    #[serde(default)]
    pub payload: Value,
}

impl OutboundEvent {
    /// Creates a new event.
    #[inline]
    #[must_use]
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
