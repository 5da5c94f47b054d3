//! Command handlers serving invocations issued by the counterpart.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::protocol::{InvocationResponse, OutboundInvocation};

use super::panic_message;

// ============================================================================
// Types
// ============================================================================

/// Result returned by a command handler. `Err` carries the message sent back
/// to the caller.
pub type CommandResult = std::result::Result<Value, String>;

/// Command handler callback.
pub type CommandHandler = Arc<dyn Fn(Map<String, Value>) -> CommandResult + Send + Sync>;

// ============================================================================
// CommandRegistry
// ============================================================================

/// Mapping from command name to handler.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: RwLock<FxHashMap<String, CommandHandler>>,
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.handlers.read().len())
            .finish()
    }
}

impl CommandRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, replacing any previous handler.
    ///
    /// Returns `true` if a handler was replaced.
    pub fn register<F>(&self, name: impl Into<String>, handler: F) -> bool
    where
        F: Fn(Map<String, Value>) -> CommandResult + Send + Sync + 'static,
    {
        let name = name.into();
        debug!(command = %name, "Command registered");
        self.handlers
            .write()
            .insert(name, Arc::new(handler))
            .is_some()
    }

    /// Registers a handler with typed arguments and result.
    ///
    /// Arguments are deserialized from the invocation's mapping; a mismatch
    /// is answered with an error response.
    pub fn register_typed<A, R, F>(&self, name: impl Into<String>, handler: F) -> bool
    where
        A: DeserializeOwned,
        R: Serialize,
        F: Fn(A) -> std::result::Result<R, String> + Send + Sync + 'static,
    {
        self.register(name, move |arguments| {
            let arguments: A = serde_json::from_value(Value::Object(arguments))
                .map_err(|e| format!("invalid arguments: {e}"))?;
            let result = handler(arguments)?;
            serde_json::to_value(result).map_err(|e| format!("invalid result: {e}"))
        })
    }

    /// Removes the handler for `name`.
    pub fn unregister(&self, name: &str) -> bool {
        self.handlers.write().remove(name).is_some()
    }

    /// Returns `true` if a handler is registered for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.read().contains_key(name)
    }

    /// Runs the handler for `invocation` and builds its response.
    ///
    /// Unknown commands and panicking handlers produce error responses.
    pub fn execute(&self, invocation: OutboundInvocation) -> InvocationResponse {
        let handler = self.handlers.read().get(&invocation.command).cloned();

        let Some(handler) = handler else {
            debug!(command = %invocation.command, id = %invocation.id, "Unknown command");
            return invocation.failure(format!("unknown command: {}", invocation.command));
        };

        let OutboundInvocation {
            id,
            command,
            arguments,
        } = invocation;

        match catch_unwind(AssertUnwindSafe(|| handler(arguments))) {
            Ok(Ok(result)) => InvocationResponse::success(id, result),
            Ok(Err(message)) => {
                debug!(command = %command, id = %id, message = %message, "Command failed");
                InvocationResponse::error(id, message)
            }
            Err(panic) => {
                let message = panic_message(&*panic);
                warn!(command = %command, id = %id, panic = %message, "Command handler panicked");
                InvocationResponse::error(id, format!("command panicked: {message}"))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::CorrelationId;
    use serde::Deserialize;
    use serde_json::json;

    fn invocation(command: &str, arguments: Value) -> OutboundInvocation {
        let Value::Object(arguments) = arguments else {
            panic!("expected object");
        };
        OutboundInvocation::new(CorrelationId::new("req"), command, arguments)
    }

    #[test]
    fn test_execute_success() {
        let registry = CommandRegistry::new();
        registry.register("hello", |_| Ok(json!("Hello from the host!")));

        let response = registry.execute(invocation("hello", json!({})));

        assert!(response.is_success());
        assert_eq!(response.result, Some(json!("Hello from the host!")));
        assert_eq!(response.id.as_str(), "req");
    }

    #[test]
    fn test_execute_unknown_command() {
        let registry = CommandRegistry::new();
        let response = registry.execute(invocation("missing", json!({})));

        assert!(response.is_error());
        assert_eq!(response.message.as_deref(), Some("unknown command: missing"));
    }

    #[test]
    fn test_handler_error_becomes_error_response() {
        let registry = CommandRegistry::new();
        registry.register("fail", |_| Err("nope".to_string()));

        let response = registry.execute(invocation("fail", json!({})));
        assert_eq!(response.message.as_deref(), Some("nope"));
    }

    #[test]
    fn test_handler_panic_is_contained() {
        let registry = CommandRegistry::new();
        registry.register("boom", |_| panic!("exploded"));

        let response = registry.execute(invocation("boom", json!({})));
        assert!(response.is_error());
        assert_eq!(response.message.as_deref(), Some("command panicked: exploded"));
    }

    #[test]
    fn test_register_replaces() {
        let registry = CommandRegistry::new();
        assert!(!registry.register("v", |_| Ok(json!(1))));
        assert!(registry.register("v", |_| Ok(json!(2))));

        let response = registry.execute(invocation("v", json!({})));
        assert_eq!(response.result, Some(json!(2)));
    }

    #[test]
    fn test_unregister() {
        let registry = CommandRegistry::new();
        registry.register("v", |_| Ok(Value::Null));

        assert!(registry.unregister("v"));
        assert!(!registry.contains("v"));
        assert!(!registry.unregister("v"));
    }

    #[derive(Deserialize)]
    struct AddArgs {
        a: i64,
        b: i64,
    }

    #[test]
    fn test_register_typed() {
        let registry = CommandRegistry::new();
        registry.register_typed("add", |args: AddArgs| Ok(args.a + args.b));

        let response = registry.execute(invocation("add", json!({ "a": 2, "b": 3 })));
        assert_eq!(response.result, Some(json!(5)));

        let response = registry.execute(invocation("add", json!({ "a": "two" })));
        assert!(response.is_error());
        assert!(
            response
                .message
                .as_deref()
                .is_some_and(|m| m.starts_with("invalid arguments"))
        );
    }
}
