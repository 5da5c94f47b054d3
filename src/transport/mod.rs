//! Transports that move messages between two bridges.
//!
//! A bridge never talks to its counterpart directly. A transport drains one
//! side's outbound queues and feeds the other side's inbound path:
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Bridge (web)   │  invocations / events  ───►  │  Bridge (host)  │
//! │                 │                              │                 │
//! │  outbound queues│  ◄───  responses / events    │  outbound queues│
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! | Operation on source | Call on destination |
//! |---------------------|---------------------|
//! | `drain_next_outbound_invocation` | `enqueue_inbound_invocation` |
//! | `drain_next_outbound_response` | `deliver_invocation_response` |
//! | `drain_next_outbound_event` | `enqueue_inbound_event` |
//!
//! [`Link`] does this inside one process. Cross-process transports follow
//! the same table over their own channel, serializing the protocol types as
//! JSON.

// ============================================================================
// Submodules
// ============================================================================

/// In-process loopback link.
pub mod link;

// ============================================================================
// Re-exports
// ============================================================================

pub use link::Link;
