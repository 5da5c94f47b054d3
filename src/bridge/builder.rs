//! Builder pattern for bridge configuration.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use webview_bridge::Bridge;
//!
//! # fn example() -> webview_bridge::Result<()> {
//! let bridge = Bridge::builder()
//!     .host()
//!     .default_timeout(Duration::from_secs(5))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::identifiers::{CorrelationIdGenerator, UuidGenerator};

use super::core::Bridge;
use super::options::{BridgeOptions, Side};

// ============================================================================
// BridgeBuilder
// ============================================================================

/// Builder for configuring a [`Bridge`] instance.
///
/// Use [`Bridge::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct BridgeBuilder {
    /// Options passed through to the bridge.
    options: BridgeOptions,
    /// Correlation id source. UUID v4 when unset.
    id_generator: Option<Arc<dyn CorrelationIdGenerator>>,
}

impl fmt::Debug for BridgeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeBuilder")
            .field("options", &self.options)
            .field("custom_id_generator", &self.id_generator.is_some())
            .finish()
    }
}

// ============================================================================
// BridgeBuilder Implementation
// ============================================================================

impl BridgeBuilder {
    /// Creates a builder for a web-side bridge with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the side.
    #[inline]
    #[must_use]
    pub fn side(mut self, side: Side) -> Self {
        self.options.side = side;
        self
    }

    /// Shorthand for `.side(Side::Web)`.
    #[inline]
    #[must_use]
    pub fn web(self) -> Self {
        self.side(Side::Web)
    }

    /// Shorthand for `.side(Side::Host)`.
    #[inline]
    #[must_use]
    pub fn host(self) -> Self {
        self.side(Side::Host)
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: BridgeOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the timeout applied to invocations that do not set their own.
    #[inline]
    #[must_use]
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.options.default_timeout = Some(timeout);
        self
    }

    /// Caps the number of outstanding invocations.
    #[inline]
    #[must_use]
    pub fn max_pending(mut self, max: usize) -> Self {
        self.options.max_pending = Some(max);
        self
    }

    /// Uses a custom correlation id source.
    ///
    /// Ids must be unique among pending invocations; a repeat is rejected
    /// with [`Error::DuplicateId`].
    #[must_use]
    pub fn id_generator(mut self, generator: impl CorrelationIdGenerator + 'static) -> Self {
        self.id_generator = Some(Arc::new(generator));
        self
    }

    /// Builds the bridge and spawns its delivery loop.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the options are invalid
    /// - [`Error::Config`] if called outside a tokio runtime
    pub fn build(self) -> Result<Bridge> {
        self.options.validate()?;

        if tokio::runtime::Handle::try_current().is_err() {
            return Err(Error::config(
                "Bridge must be built inside a tokio runtime.\n\
                 Example: call Bridge::builder().build() from a #[tokio::main] function",
            ));
        }

        let id_generator = self
            .id_generator
            .unwrap_or_else(|| Arc::new(UuidGenerator));

        Ok(Bridge::from_parts(self.options, id_generator))
    }
}

// ============================================================================
// Tests
// ============================================================================
