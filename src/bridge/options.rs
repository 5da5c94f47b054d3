//! Bridge configuration options.
//!
//! Provides a type-safe interface for the knobs that shape one side of the
//! bridge: which side it is, how long invocations may wait, and how many may
//! be outstanding.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use webview_bridge::BridgeOptions;
//!
//! let options = BridgeOptions::host()
//!     .with_default_timeout(Duration::from_secs(10))
//!     .with_max_pending(256);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Side
// ============================================================================

/// Which end of the boundary a bridge instance serves.
///
/// Both sides run the same code; the label only shows up in logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Side {
    /// The embedded web content.
    #[default]
    Web,
    /// The host process.
    Host,
}

impl Side {
    /// Returns the opposite side.
    #[inline]
    #[must_use]
    pub const fn counterpart(self) -> Self {
        match self {
            Self::Web => Self::Host,
            Self::Host => Self::Web,
        }
    }

    /// Lowercase name used in logs.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Host => "host",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// BridgeOptions
// ============================================================================

/// Configuration for one bridge instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Side of the boundary this bridge serves.
    pub side: Side,

    /// Timeout applied to `invoke` calls that do not set their own.
    ///
    /// `None` waits forever.
    pub default_timeout: Option<Duration>,

    /// Maximum outstanding invocations. `None` is unbounded.
    pub max_pending: Option<usize>,
}

// ============================================================================
// Constructors
// ============================================================================

impl BridgeOptions {
    /// Creates web-side options with no timeout and no cap.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            side: Side::Web,
            default_timeout: None,
            max_pending: None,
        }
    }

    /// Creates options for the web-content side.
    #[inline]
    #[must_use]
    pub const fn web() -> Self {
        Self::new()
    }

    /// Creates options for the host side.
    #[inline]
    #[must_use]
    pub fn host() -> Self {
        Self {
            side: Side::Host,
            ..Default::default()
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl BridgeOptions {
    /// Sets the side.
    #[inline]
    #[must_use]
    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    /// Sets the default invocation timeout.
    #[inline]
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Caps the number of outstanding invocations.
    #[inline]
    #[must_use]
    pub fn with_max_pending(mut self, max: usize) -> Self {
        self.max_pending = Some(max);
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl BridgeOptions {
    /// Checks the options for values that can never work.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero timeout or a zero cap.
    pub fn validate(&self) -> Result<()> {
        if self.default_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::config(
                "default_timeout must be greater than zero; omit it to wait forever",
            ));
        }

        if self.max_pending == Some(0) {
            return Err(Error::config(
                "max_pending must be greater than zero; omit it for no cap",
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
