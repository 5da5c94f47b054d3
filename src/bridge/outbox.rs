//! Outbound FIFO queues drained by the counterpart.
//!
//! Every push wakes whoever is parked in [`Outbound::ready`], so a transport
//! can wait for work instead of polling the drain primitives.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::protocol::{InvocationResponse, OutboundEvent, OutboundInvocation};

// ============================================================================
// Outbox
// ============================================================================

/// A single FIFO queue sharing its wake signal with its siblings.
pub(crate) struct Outbox<T> {
    items: Mutex<VecDeque<T>>,
    signal: Arc<Notify>,
}

impl<T> Outbox<T> {
    fn new(signal: Arc<Notify>) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            signal,
        }
    }

    /// Appends to the back and wakes waiters.
    pub(crate) fn push(&self, item: T) {
        self.items.lock().push_back(item);
        self.signal.notify_waiters();
    }

    /// Pops from the front.
    pub(crate) fn pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

// ============================================================================
// Outbound
// ============================================================================

/// The three outbound queues of one bridge.
pub(crate) struct Outbound {
    /// Invocations issued by this side.
    pub(crate) invocations: Outbox<OutboundInvocation>,
    /// Events emitted by this side.
    pub(crate) events: Outbox<OutboundEvent>,
    /// Answers to invocations the counterpart issued.
    pub(crate) responses: Outbox<InvocationResponse>,
    signal: Arc<Notify>,
}

impl Default for Outbound {
    fn default() -> Self {
        let signal = Arc::new(Notify::new());
        Self {
            invocations: Outbox::new(Arc::clone(&signal)),
            events: Outbox::new(Arc::clone(&signal)),
            responses: Outbox::new(Arc::clone(&signal)),
            signal,
        }
    }
}

impl Outbound {
    /// Returns `true` if any queue holds an item.
    pub(crate) fn has_items(&self) -> bool {
        !(self.invocations.is_empty() && self.events.is_empty() && self.responses.is_empty())
    }

    /// Waits until at least one queue holds an item.
    pub(crate) async fn ready(&self) {
        loop {
            let notified = self.signal.notified();
            tokio::pin!(notified);

            // Register before checking so a push in between is not missed.
            notified.as_mut().enable();

            if self.has_items() {
                return;
            }

            notified.await;
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
    use serde_json::json;

    #[test]
    fn test_outbox_is_fifo() {
        let outbound = Outbound::default();
        outbound.events.push(OutboundEvent::new("a", json!(1)));
        outbound.events.push(OutboundEvent::new("b", json!(2)));

        assert_eq!(outbound.events.len(), 2);
        assert_eq!(outbound.events.pop().map(|e| e.event), Some("a".to_string()));
        assert_eq!(outbound.events.pop().map(|e| e.event), Some("b".to_string()));
        assert!(outbound.events.pop().is_none());
    }

    #[tokio::test]
    async fn test_ready_returns_immediately_when_non_empty() {
        let outbound = Outbound::default();
        outbound
            .responses
            .push(InvocationResponse::success(CorrelationId::new("a"), json!(1)));

        outbound.ready().await;
        assert!(outbound.has_items());
    }

    #[tokio::test]
    async fn test_ready_wakes_on_push() {
        let outbound = Arc::new(Outbound::default());

        let waiter = {
            let outbound = Arc::clone(&outbound);
            tokio::spawn(async move { outbound.ready().await })
        };

        tokio::task::yield_now().await;
        outbound.events.push(OutboundEvent::new("late", json!(null)));

        waiter.await.expect("join");
    }
}
