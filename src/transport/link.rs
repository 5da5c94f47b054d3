//! In-process link between two mirror bridges.
//!
//! A spawned pump task waits on both bridges' outbound signals and moves
//! each drained item into the other bridge's inbound path.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::bridge::Bridge;

// ============================================================================
// Link
// ============================================================================

/// Pumps messages between two bridges until closed or dropped.
///
/// # Example
///
/// ```no_run
/// use serde_json::json;
/// use webview_bridge::{Bridge, Link, Result};
///
/// # async fn example() -> Result<()> {
/// let web = Bridge::builder().web().build()?;
/// let host = Bridge::builder().host().build()?;
/// host.register_command("ping", |_| Ok(json!("pong")));
///
/// let link = Link::connect(&web, &host);
/// assert_eq!(web.invoke("ping", json!({}))?.await?, json!("pong"));
/// link.close().await;
/// # Ok(())
/// # }
/// ```
pub struct Link {
    stop_tx: Mutex<Option<oneshot::Sender<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    forwarded: Arc<AtomicU64>,
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("running", &self.is_running())
            .field("forwarded", &self.forwarded())
            .finish()
    }
}

impl Link {
    /// Connects `a` and `b` and starts pumping in both directions.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn connect(a: &Bridge, b: &Bridge) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();
        let forwarded = Arc::new(AtomicU64::new(0));

        let task = tokio::spawn(Self::run_pump(
            a.clone(),
            b.clone(),
            stop_rx,
            Arc::clone(&forwarded),
        ));

        debug!(a = %a.side(), b = %b.side(), "Link connected");
        if a.side() != b.side().counterpart() {
            warn!(side = %a.side(), "Link joins two bridges on the same side");
        }

        Self {
            stop_tx: Mutex::new(Some(stop_tx)),
            task: Mutex::new(Some(task)),
            forwarded,
        }
    }

    /// Total items moved across the link.
    #[inline]
    #[must_use]
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    /// Returns `true` until [`close`](Self::close) completes.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stops the pump and waits for it to exit.
    ///
    /// Items still in the outbound queues stay there.
    pub async fn close(&self) {
        if let Some(stop_tx) = self.stop_tx.lock().take() {
            let _ = stop_tx.send(());
        }

        let task = self.task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            debug!(error = %e, "Link task join failed");
        }
    }

    /// Pump body.
    async fn run_pump(
        a: Bridge,
        b: Bridge,
        mut stop_rx: oneshot::Receiver<()>,
        forwarded: Arc<AtomicU64>,
    ) {
        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                () = a.outbound_ready() => {
                    let moved = Self::forward(&a, &b);
                    forwarded.fetch_add(moved, Ordering::Relaxed);
                }
                () = b.outbound_ready() => {
                    let moved = Self::forward(&b, &a);
                    forwarded.fetch_add(moved, Ordering::Relaxed);
                }
            }

            tokio::task::yield_now().await;
        }

        debug!("Link pump stopped");
    }

    /// Moves everything currently queued on `from` into `to`.
    fn forward(from: &Bridge, to: &Bridge) -> u64 {
        let mut moved = 0;

        while let Some(invocation) = from.drain_next_outbound_invocation() {
            trace!(
                from = %from.side(),
                id = %invocation.id,
                command = %invocation.command,
                "Forwarding invocation"
            );
            let id = invocation.id.clone();

            if to.enqueue_inbound_invocation(invocation).is_err() {
                warn!(from = %from.side(), id = %id, "Counterpart closed, failing invocation");
                let _ = from.deliver_invocation_error(id, "counterpart bridge closed");
            }
            moved += 1;
        }

        while let Some(response) = from.drain_next_outbound_response() {
            trace!(from = %from.side(), id = %response.id, "Forwarding response");
            if to.deliver_invocation_response(response).is_err() {
                debug!(from = %from.side(), "Counterpart closed, response dropped");
            }
            moved += 1;
        }

        while let Some(event) = from.drain_next_outbound_event() {
            trace!(from = %from.side(), event = %event.event, "Forwarding event");
            if to.enqueue_inbound_event(event.event, event.payload).is_err() {
                debug!(from = %from.side(), "Counterpart closed, event dropped");
            }
            moved += 1;
        }

        moved
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.lock().take() {
            let _ = stop_tx.send(());
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    fn pair() -> (Bridge, Bridge) {
        let web = Bridge::builder().web().build().expect("web");
        let host = Bridge::builder().host().build().expect("host");
        (web, host)
    }

    #[tokio::test]
    async fn test_invoke_across_link() {
        let (web, host) = pair();
        host.register_command("add", |args| {
            let a = args.get("a").and_then(|v| v.as_i64()).unwrap_or(0);
            let b = args.get("b").and_then(|v| v.as_i64()).unwrap_or(0);
            Ok(json!(a + b))
        });

        let link = Link::connect(&web, &host);
        let sum = web
            .invoke("add", json!({ "a": 2, "b": 3 }))
            .expect("invoke")
            .await
            .expect("result");

        assert_eq!(sum, json!(5));
        assert!(link.forwarded() >= 2);
        link.close().await;
        assert!(!link.is_running());
    }

    #[tokio::test]
    async fn test_same_side_link_still_pumps() {
        let a = Bridge::builder().web().build().expect("a");
        let b = Bridge::builder().web().build().expect("b");
        assert_ne!(a.side(), b.side().counterpart());

        b.register_command("echo", |args| Ok(serde_json::Value::Object(args)));
        let _link = Link::connect(&a, &b);

        let echoed = a
            .invoke("echo", json!({ "k": 1 }))
            .expect("invoke")
            .await
            .expect("result");
        assert_eq!(echoed, json!({ "k": 1 }));
    }

    #[tokio::test]
    async fn test_closed_counterpart_fails_invocation() {
        let (web, host) = pair();
        host.shutdown().await;

        let _link = Link::connect(&web, &host);
        let err = web
            .invoke("anything", json!({}))
            .expect("invoke")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_close_leaves_queued_items() {
        let (web, host) = pair();
        let link = Link::connect(&web, &host);
        link.close().await;

        web.emit("late", json!(null));
        tokio::task::yield_now().await;

        assert_eq!(web.outbound_event_len(), 1);
    }
}
