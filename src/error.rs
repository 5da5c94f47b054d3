//! Error types for the bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use webview_bridge::{Bridge, Result};
//! use serde_json::json;
//!
//! async fn example(bridge: &Bridge) -> Result<()> {
//!     let theme = bridge.invoke("get_theme", json!({}))?.await?;
//!     println!("theme: {theme}");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Validation | [`Error::InvalidCommand`], [`Error::InvalidArguments`] |
//! | Registry | [`Error::DuplicateId`], [`Error::TooManyPending`] |
//! | Execution | [`Error::Timeout`], [`Error::CommandFailed`] |
//! | Lifecycle | [`Error::BridgeClosed`], [`Error::Config`] |
//! | External | [`Error::Json`] |
//!
//! Unmatched resolutions and events without listeners are intentionally
//! not errors; they are dropped silently.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::CorrelationId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// `invoke` was called with an empty command name.
    ///
    /// Nothing is enqueued when this is returned.
    #[error("Invalid command: command name must not be empty")]
    InvalidCommand,

    /// `invoke` was called with arguments that are not a mapping.
    ///
    /// Nothing is enqueued when this is returned.
    #[error("Invalid arguments: {message}")]
    InvalidArguments {
        /// Description of the rejected arguments.
        message: String,
    },

    // ========================================================================
    // Registry Errors
    // ========================================================================
    /// The invocation registry already holds a record for this id.
    ///
    /// Signals a correlation id generator that broke its uniqueness contract.
    #[error("Duplicate correlation id: {id}")]
    DuplicateId {
        /// The colliding id.
        id: CorrelationId,
    },

    /// The configured cap on outstanding invocations was reached.
    #[error("Too many pending invocations: {pending}/{max}")]
    TooManyPending {
        /// Invocations currently outstanding.
        pending: usize,
        /// Configured maximum.
        max: usize,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// The counterpart did not answer within the call's timeout.
    ///
    /// The pending record has been evicted when this is returned.
    #[error("Invocation {id} ({command}) timed out after {timeout_ms}ms")]
    Timeout {
        /// Correlation id of the abandoned invocation.
        id: CorrelationId,
        /// Command that was invoked.
        command: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The counterpart answered the invocation with an error.
    #[error("Command {command} failed: {message}")]
    CommandFailed {
        /// Command that was invoked.
        command: String,
        /// Error message reported by the counterpart.
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The bridge was shut down.
    #[error("Bridge closed")]
    BridgeClosed,

    /// Configuration error.
    ///
    /// Returned by the builder when options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates an invalid arguments error.
    #[inline]
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    /// Creates a duplicate id error.
    #[inline]
    pub fn duplicate_id(id: CorrelationId) -> Self {
        Self::DuplicateId { id }
    }

    /// Creates a too many pending error.
    #[inline]
    pub fn too_many_pending(pending: usize, max: usize) -> Self {
        Self::TooManyPending { pending, max }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(id: CorrelationId, command: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            id,
            command: command.into(),
            timeout_ms,
        }
    }

    /// Creates a command failed error.
    #[inline]
    pub fn command_failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if `invoke` rejected its input before enqueueing.
    #[inline]
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::InvalidCommand | Self::InvalidArguments { .. })
    }

    /// Returns `true` if the bridge has shut down.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::BridgeClosed)
    }
}

// ============================================================================
// Tests
// ============================================================================
