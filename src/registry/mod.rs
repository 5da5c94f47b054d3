//! Registries owned by one side of the bridge.
//!
//! | Registry | Keyed by | Holds |
//! |----------|----------|-------|
//! | [`InvocationRegistry`] | correlation id | pending/resolved invocations |
//! | [`EventRegistry`] | event name | ordered listeners |
//! | [`CommandRegistry`] | command name | handlers for inbound invocations |
//!
//! Only the owning bridge and its delivery loop mutate these.

// ============================================================================
// Submodules
// ============================================================================

/// Command handlers for invocations issued by the counterpart.
pub mod commands;

/// Event listeners.
pub mod events;

/// Pending invocation records.
pub mod invocations;

// ============================================================================
// Re-exports
// ============================================================================

pub use commands::{CommandHandler, CommandRegistry, CommandResult};
pub use events::{DispatchReport, EventCallback, EventRegistry, ListenerHandle, callback};
pub use invocations::{InvocationRegistry, InvocationState};

// ============================================================================
// Helpers
// ============================================================================

use std::any::Any;

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    }
}
