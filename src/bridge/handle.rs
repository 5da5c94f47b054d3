//! Awaitable handle for an issued invocation.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::CorrelationId;
use crate::registry::InvocationRegistry;

// ============================================================================
// InvocationHandle
// ============================================================================

/// A pending invocation.
///
/// The request is already queued outbound when the handle is returned.
/// Await the handle (or call [`wait`](Self::wait)) to get the result.
/// Dropping it without awaiting abandons the call and frees its record.
///
/// # Example
///
/// ```ignore
/// let handle = bridge.invoke("ping", json!({}))?;
/// println!("waiting on {}", handle.id());
/// let pong = handle.await?;
/// ```
pub struct InvocationHandle {
    id: CorrelationId,
    command: String,
    registry: Arc<InvocationRegistry>,
    timeout: Option<Duration>,
    consumed: bool,
}

impl fmt::Debug for InvocationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationHandle")
            .field("id", &self.id)
            .field("command", &self.command)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl InvocationHandle {
    pub(crate) fn new(
        id: CorrelationId,
        command: String,
        registry: Arc<InvocationRegistry>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            id,
            command,
            registry,
            timeout,
            consumed: false,
        }
    }

    /// Correlation id of this invocation.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &CorrelationId {
        &self.id
    }

    /// Command name.
    #[inline]
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Timeout that will apply when awaited.
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Overrides the timeout for this invocation.
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns `true` once the counterpart has answered.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(
            self.registry.state(&self.id),
            Some(crate::registry::InvocationState::Resolved(_))
        )
    }

    /// Waits for the result.
    ///
    /// # Errors
    ///
    /// - [`Error::CommandFailed`](crate::Error::CommandFailed) if the counterpart answered
    ///   with an error
    /// - [`Error::Timeout`](crate::Error::Timeout) if the timeout elapsed
    /// - [`Error::BridgeClosed`](crate::Error::BridgeClosed) if the bridge shut down
    pub async fn wait(mut self) -> Result<Value> {
        let result = self.registry.wait(&self.id, self.timeout).await;
        self.consumed = true;
        result
    }

    /// Waits for the result and deserializes it.
    ///
    /// # Errors
    ///
    /// As [`wait`](Self::wait), plus [`Error::Json`](crate::Error::Json) if
    /// the result does not match `T`.
    pub async fn wait_as<T: DeserializeOwned>(self) -> Result<T> {
        let value = self.wait().await?;
        Ok(serde_json::from_value(value)?)
    }
}

impl IntoFuture for InvocationHandle {
    type Output = Result<Value>;
    type IntoFuture = BoxFuture<'static, Result<Value>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}

impl Drop for InvocationHandle {
    fn drop(&mut self) {
        if !self.consumed {
            self.registry.forget(&self.id);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::InvocationResponse;
    use serde_json::json;

    fn pending(registry: &Arc<InvocationRegistry>, token: &str) -> InvocationHandle {
        let id = CorrelationId::new(token);
        registry.create(id.clone(), "ping").expect("create");
        InvocationHandle::new(id, "ping".to_string(), Arc::clone(registry), None)
    }

    #[tokio::test]
    async fn test_await_handle() {
        let registry = Arc::new(InvocationRegistry::default());
        let handle = pending(&registry, "a");

        registry.resolve(InvocationResponse::success(CorrelationId::new("a"), json!(42)));
        assert!(handle.is_resolved());

        assert_eq!(handle.await.expect("resolved"), json!(42));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_wait_as_typed() {
        let registry = Arc::new(InvocationRegistry::default());
        let handle = pending(&registry, "a");
        registry.resolve(InvocationResponse::success(CorrelationId::new("a"), json!(7)));

        let value: u32 = handle.wait_as().await.expect("typed");
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_with_timeout() {
        let registry = Arc::new(InvocationRegistry::default());
        let handle = pending(&registry, "a").with_timeout(Duration::from_millis(10));

        assert_eq!(handle.timeout(), Some(Duration::from_millis(10)));
        assert!(handle.await.unwrap_err().is_timeout());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_resolve_wakes_waiting_handle() {
        use tokio_test::{assert_pending, assert_ready_ok, task};

        let registry = Arc::new(InvocationRegistry::default());
        let mut waiting = task::spawn(pending(&registry, "a").into_future());

        assert_pending!(waiting.poll());
        assert!(!waiting.is_woken());

        registry.resolve(InvocationResponse::success(CorrelationId::new("a"), json!("pong")));

        assert!(waiting.is_woken());
        assert_eq!(assert_ready_ok!(waiting.poll()), json!("pong"));
    }

    #[test]
    fn test_drop_forgets_record() {
        let registry = Arc::new(InvocationRegistry::default());
        let handle = pending(&registry, "a");
        assert_eq!(handle.command(), "ping");
        assert_eq!(registry.len(), 1);

        drop(handle);
        assert!(registry.is_empty());
    }
}
