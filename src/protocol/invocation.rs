//! Invocation request and response types.
//!
//! An [`OutboundInvocation`] is what a caller's bridge hands to the
//! counterpart; an [`InvocationResponse`] is what the counterpart hands back.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::CorrelationId;

// ============================================================================
// OutboundInvocation
// ============================================================================

/// A command request waiting for the counterpart to drain it.
///
/// # Format
///
/// ```json
/// {
///   "id": "uuid",
///   "command": "get_theme",
///   "arguments": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundInvocation {
    /// Correlation token for the eventual response.
    pub id: CorrelationId,

    /// Command name (never empty).
    pub command: String,

    /// Structured argument mapping.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl OutboundInvocation {
    /// Creates a new invocation request.
    #[inline]
    #[must_use]
    pub fn new(
        id: CorrelationId,
        command: impl Into<String>,
        arguments: Map<String, Value>,
    ) -> Self {
        Self {
            id,
            command: command.into(),
            arguments,
        }
    }

    /// Gets an argument by key.
    #[inline]
    #[must_use]
    pub fn argument(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key)
    }

    /// Builds a success response for this request.
    #[inline]
    #[must_use]
    pub fn success(&self, result: Value) -> InvocationResponse {
        InvocationResponse::success(self.id.clone(), result)
    }

    /// Builds an error response for this request.
    #[inline]
    #[must_use]
    pub fn failure(&self, message: impl Into<String>) -> InvocationResponse {
        InvocationResponse::error(self.id.clone(), message)
    }
}

// ============================================================================
// InvocationResponse
// ============================================================================

/// A response from the counterpart to a previously drained invocation.
///
/// # Format
///
/// Success:
/// ```json
/// {
///   "id": "uuid",
///   "type": "success",
///   "result": { ... }
/// }
/// ```
///
/// Error:
/// ```json
/// {
///   "id": "uuid",
///   "type": "error",
///   "message": "error message"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResponse {
    /// Matches the invocation `id`.
    pub id: CorrelationId,

    /// Response type.
    #[serde(rename = "type")]
    pub response_type: ResponseType,

    /// Result data (if success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error message (if error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl InvocationResponse {
    /// Creates a success response.
    #[inline]
    #[must_use]
    pub fn success(id: CorrelationId, result: Value) -> Self {
        Self {
            id,
            response_type: ResponseType::Success,
            result: Some(result),
            message: None,
        }
    }

    /// Creates an error response.
    #[inline]
    #[must_use]
    pub fn error(id: CorrelationId, message: impl Into<String>) -> Self {
        Self {
            id,
            response_type: ResponseType::Error,
            result: None,
            message: Some(message.into()),
        }
    }

    /// Returns `true` if this is a success response.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.response_type == ResponseType::Success
    }

    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.response_type == ResponseType::Error
    }

    /// Extracts the result value, returning error if response was error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandFailed`] if the response was an error.
    pub fn into_result(self, command: &str) -> Result<Value> {
        match self.response_type {
            ResponseType::Success => Ok(self.result.unwrap_or(Value::Null)),
            ResponseType::Error => {
                let message = self
                    .message
                    .unwrap_or_else(|| "unknown error".to_string());
                Err(Error::command_failed(command, message))
            }
        }
    }
}

// ============================================================================
// ResponseType
// ============================================================================

/// Response type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Successful response.
    Success,
    /// Error response.
    Error,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_invocation_serialization() {
        let invocation = OutboundInvocation::new(
            CorrelationId::new("req-1"),
            "read_file",
            args(json!({ "path": "/tmp/a" })),
        );
        let json = serde_json::to_value(&invocation).expect("serialize");

        assert_eq!(json["id"], "req-1");
        assert_eq!(json["command"], "read_file");
        assert_eq!(json["arguments"]["path"], "/tmp/a");
    }

    #[test]
    fn test_invocation_missing_arguments_defaults_empty() {
        let invocation: OutboundInvocation =
            serde_json::from_str(r#"{ "id": "x", "command": "ping" }"#).expect("parse");
        assert!(invocation.arguments.is_empty());
        assert!(invocation.argument("anything").is_none());
    }

    #[test]
    fn test_success_response() {
        let json_str = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "type": "success",
            "result": {"pong": true}
        }"#;

        let response: InvocationResponse = serde_json::from_str(json_str).expect("parse");
        assert!(response.is_success());
        assert!(!response.is_error());
        assert_eq!(
            response.into_result("ping").expect("success"),
            json!({ "pong": true })
        );
    }

    #[test]
    fn test_error_response() {
        let json_str = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "type": "error",
            "message": "no such file"
        }"#;

        let response: InvocationResponse = serde_json::from_str(json_str).expect("parse");
        assert!(response.is_error());

        let err = response.into_result("read_file").unwrap_err();
        assert!(matches!(
            err,
            Error::CommandFailed { ref command, ref message }
                if command == "read_file" && message == "no such file"
        ));
    }

    #[test]
    fn test_success_without_result_is_null() {
        let response: InvocationResponse =
            serde_json::from_str(r#"{ "id": "x", "type": "success" }"#).expect("parse");
        assert_eq!(response.into_result("noop").expect("success"), Value::Null);
    }

    #[test]
    fn test_response_builders_keep_id() {
        let invocation =
            OutboundInvocation::new(CorrelationId::new("req-9"), "ping", Map::new());

        let ok = invocation.success(json!("pong"));
        assert_eq!(ok.id, invocation.id);
        assert!(ok.is_success());

        let failed = invocation.failure("boom");
        assert_eq!(failed.id, invocation.id);
        assert_eq!(failed.message.as_deref(), Some("boom"));
    }
}
