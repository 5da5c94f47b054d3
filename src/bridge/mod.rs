//! Bridge instances and their delivery machinery.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Bridge`] | One side of the boundary: invoke, listen, emit, serve commands |
//! | [`BridgeBuilder`] | Fluent configuration builder |
//! | [`BridgeOptions`] | Side, default timeout, pending cap |
//! | [`InvocationHandle`] | Awaitable result of an invocation |
//! | [`DeliveryLoop`] | Inbound FIFO worker |
//!
//! # Flow
//!
//! ```text
//!   invoke ──► outbound invocations ──► drain (counterpart)
//!                                            │
//!   handle ◄── InvocationRegistry ◄── Invoke item ◄── deliver_invocation_*
//!
//!   emit ────► outbound events ─────► drain (counterpart)
//!   listeners ◄── EventRegistry ◄── Event item ◄── enqueue_inbound_event
//! ```
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use webview_bridge::{Bridge, Result};
//!
//! # async fn example() -> Result<()> {
//! let web = Bridge::builder().web().build()?;
//! let handle = web.invoke("ping", json!({}))?;
//!
//! // A transport moves the request across and brings the answer back.
//! if let Some(request) = web.drain_next_outbound_invocation() {
//!     web.deliver_invocation_result(request.id, json!("pong"))?;
//! }
//!
//! assert_eq!(handle.await?, json!("pong"));
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for bridge configuration.
pub mod builder;

/// Bridge façade.
pub mod core;

/// Inbound delivery loop.
pub mod delivery;

/// Awaitable invocation handle.
pub mod handle;

/// Bridge options.
pub mod options;

/// Outbound queues.
mod outbox;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::BridgeBuilder;
pub use core::Bridge;
pub use delivery::{DeliveryLoop, LoopState, QueueItem};
pub use handle::InvocationHandle;
pub use options::{BridgeOptions, Side};
