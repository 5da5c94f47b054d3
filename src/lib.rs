//! Webview Bridge - Asynchronous message bridge between a host process and
//! its embedded web content.
//!
//! Each side owns a [`Bridge`]. A side can invoke named commands on the
//! other side and await the result, and it can emit named events to the
//! other side's listeners. A transport moves the messages between the two.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐        transport         ┌──────────────────────┐
//! │  Bridge (web)        │  ──── invocations ────►  │  Bridge (host)       │
//! │  InvocationRegistry  │  ◄──── responses ─────   │  CommandRegistry     │
//! │  EventRegistry       │  ◄───── events ──────►   │  EventRegistry       │
//! │  DeliveryLoop        │                          │  DeliveryLoop        │
//! └──────────────────────┘                          └──────────────────────┘
//! ```
//!
//! Key design principles:
//!
//! - Every invocation gets a correlation id; answers match by id, so the
//!   counterpart may answer out of order
//! - Inbound items are delivered one at a time in arrival order by a
//!   persistent worker task
//! - Waiting is event-driven (no polling)
//! - Both sides run the same [`Bridge`] type
//!
//! # Quick Start
//!
//! ```no_run
//! use serde_json::json;
//! use webview_bridge::{Bridge, Link, Result, callback};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let web = Bridge::builder().web().build()?;
//!     let host = Bridge::builder().host().build()?;
//!
//!     host.register_command("greet", |args| {
//!         let name = args.get("name").and_then(|v| v.as_str()).unwrap_or("world");
//!         Ok(json!(format!("Hello, {name}!")))
//!     });
//!
//!     web.listen("theme-changed", callback(|payload| {
//!         println!("theme: {payload}");
//!     }));
//!
//!     let _link = Link::connect(&web, &host);
//!
//!     let greeting = web.invoke("greet", json!({ "name": "Ada" }))?.await?;
//!     println!("{greeting}");
//!
//!     host.emit("theme-changed", json!({ "dark": true }));
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | [`Bridge`], its builder, options and delivery loop |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Correlation and listener ids |
//! | [`protocol`] | Boundary message types |
//! | [`registry`] | Invocation, event and command registries |
//! | [`transport`] | In-process [`Link`] |

// ============================================================================
// Modules
// ============================================================================

/// Bridge instances and their delivery machinery.
///
/// Use [`Bridge::builder()`] to create a configured bridge.
pub mod bridge;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Correlation ids and listener ids.
pub mod identifiers;

/// Boundary message types.
pub mod protocol;

/// Invocation, event and command registries.
pub mod registry;

/// Transports between two bridges.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{
    Bridge, BridgeBuilder, BridgeOptions, DeliveryLoop, InvocationHandle, LoopState, QueueItem,
    Side,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CorrelationId, CorrelationIdGenerator, ListenerId, UuidGenerator};

// Protocol types
pub use protocol::{InvocationResponse, OutboundEvent, OutboundInvocation, ResponseType};

// Registry types
pub use registry::{
    CommandResult, DispatchReport, EventCallback, InvocationState, ListenerHandle, callback,
};

// Transport types
pub use transport::Link;
