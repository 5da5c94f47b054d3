//! Boundary message types.
//!
//! This module defines the values that cross the host/web-content boundary
//! through the bridge's drain/deliver primitives.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `OutboundInvocation` | Caller → Counterpart | Command request |
//! | `InvocationResponse` | Counterpart → Caller | Command result |
//! | `OutboundEvent` | Either direction | Named broadcast |
//!
//! Payloads are opaque [`serde_json::Value`]s. The types derive serde so a
//! transport can marshal them, but no wire format is imposed here.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Event message type |
//! | `invocation` | Invocation request and response types |

// ============================================================================
// Submodules
// ============================================================================

/// Event message type.
pub mod event;

/// Invocation request and response types.
pub mod invocation;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::OutboundEvent;
pub use invocation::{InvocationResponse, OutboundInvocation, ResponseType};
