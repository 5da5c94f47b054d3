//! Event listeners keyed by event name.
//!
//! Listeners for one event run in registration order. Dispatch works on a
//! snapshot taken before the first callback runs, so a listener removed
//! during a pass still sees that pass but no later one.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::identifiers::ListenerId;

use super::panic_message;

// ============================================================================
// Types
// ============================================================================

/// Event listener callback.
///
/// Identity is the `Arc` allocation: keep a clone to `unlisten` later.
pub type EventCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Wraps a closure as an [`EventCallback`].
#[inline]
#[must_use]
pub fn callback<F>(f: F) -> EventCallback
where
    F: Fn(&Value) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A registered listener.
struct Subscription {
    id: ListenerId,
    ordinal: u64,
    callback: EventCallback,
}

/// Listener table shared with [`ListenerHandle`]s.
#[derive(Default)]
struct Listeners {
    by_event: FxHashMap<String, Vec<Subscription>>,
    next_ordinal: u64,
}

impl Listeners {
    fn remove_matching(&mut self, event: &str, callback: &EventCallback) -> usize {
        let Some(subscriptions) = self.by_event.get_mut(event) else {
            return 0;
        };

        let before = subscriptions.len();
        subscriptions.retain(|sub| !Arc::ptr_eq(&sub.callback, callback));
        let removed = before - subscriptions.len();

        if subscriptions.is_empty() {
            self.by_event.remove(event);
        }

        removed
    }
}

// ============================================================================
// DispatchReport
// ============================================================================

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Callbacks that returned normally.
    pub delivered: usize,
    /// Callbacks that panicked.
    pub failed: usize,
}

impl DispatchReport {
    /// Total callbacks invoked.
    #[inline]
    #[must_use]
    pub fn invoked(&self) -> usize {
        self.delivered + self.failed
    }
}

// ============================================================================
// EventRegistry
// ============================================================================

/// Mapping from event name to an ordered list of listeners.
///
/// Cloning yields another handle to the same table.
#[derive(Clone, Default)]
pub struct EventRegistry {
    listeners: Arc<Mutex<Listeners>>,
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.lock();
        f.debug_struct("EventRegistry")
            .field("events", &listeners.by_event.len())
            .finish_non_exhaustive()
    }
}

impl EventRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `event`.
    ///
    /// The same callback may be registered more than once; each registration
    /// fires separately.
    pub fn listen(&self, event: impl Into<String>, callback: EventCallback) -> ListenerHandle {
        let event = event.into();
        let id = ListenerId::next();

        {
            let mut listeners = self.listeners.lock();
            let ordinal = listeners.next_ordinal;
            listeners.next_ordinal += 1;

            listeners
                .by_event
                .entry(event.clone())
                .or_default()
                .push(Subscription {
                    id,
                    ordinal,
                    callback: Arc::clone(&callback),
                });

            trace!(event = %event, listener = %id, ordinal, "Listener registered");
        }

        ListenerHandle {
            listeners: Arc::downgrade(&self.listeners),
            event,
            id,
            callback,
        }
    }

    /// Removes every subscription for `event` whose callback is `callback`.
    ///
    /// Returns the number of subscriptions removed.
    pub fn unlisten(&self, event: &str, callback: &EventCallback) -> usize {
        let removed = self.listeners.lock().remove_matching(event, callback);
        if removed > 0 {
            trace!(event, removed, "Listeners removed");
        }
        removed
    }

    /// Removes a single subscription by id.
    ///
    /// Returns `true` if it was registered.
    pub fn unlisten_id(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();

        let Some(subscriptions) = listeners.by_event.get_mut(event) else {
            return false;
        };

        let before = subscriptions.len();
        subscriptions.retain(|sub| sub.id != id);
        let removed = subscriptions.len() != before;

        if subscriptions.is_empty() {
            listeners.by_event.remove(event);
        }

        removed
    }

    /// Calls every listener of `event` with `payload`, in registration order.
    ///
    /// A panicking listener is logged and skipped; the rest still run.
    /// An event with no listeners is a no-op.
    pub fn dispatch(&self, event: &str, payload: &Value) -> DispatchReport {
        let snapshot: Vec<(ListenerId, EventCallback)> = {
            let listeners = self.listeners.lock();
            match listeners.by_event.get(event) {
                Some(subscriptions) => {
                    debug_assert!(subscriptions.windows(2).all(|w| w[0].ordinal < w[1].ordinal));
                    subscriptions
                        .iter()
                        .map(|sub| (sub.id, Arc::clone(&sub.callback)))
                        .collect()
                }
                None => Vec::new(),
            }
        };

        let mut report = DispatchReport::default();

        for (id, callback) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback(payload))) {
                Ok(()) => report.delivered += 1,
                Err(panic) => {
                    report.failed += 1;
                    warn!(
                        event,
                        listener = %id,
                        panic = %panic_message(&*panic),
                        "Event listener panicked"
                    );
                }
            }
        }

        if report.invoked() > 0 {
            debug!(event, delivered = report.delivered, failed = report.failed, "Event dispatched");
        }

        report
    }

    /// Returns the number of listeners for `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .lock()
            .by_event
            .get(event)
            .map_or(0, Vec::len)
    }

    /// Returns the names of events that have at least one listener.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.listeners.lock().by_event.keys().cloned().collect()
    }

    /// Removes every listener.
    pub fn clear(&self) {
        self.listeners.lock().by_event.clear();
    }
}

// ============================================================================
// ListenerHandle
// ============================================================================

/// Handle returned by [`EventRegistry::listen`].
///
/// Dropping the handle keeps the listener registered; call
/// [`unlisten`](Self::unlisten) to remove it. The handle does not keep the
/// registry alive.
pub struct ListenerHandle {
    listeners: Weak<Mutex<Listeners>>,
    event: String,
    id: ListenerId,
    callback: EventCallback,
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("event", &self.event)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl ListenerHandle {
    /// Event this listener is registered for.
    #[inline]
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Id of this registration.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// The registered callback.
    #[inline]
    #[must_use]
    pub fn callback(&self) -> &EventCallback {
        &self.callback
    }

    /// Removes the listener; same as `unlisten(event, callback)`.
    ///
    /// Returns the number of subscriptions removed (zero if the registry is
    /// gone).
    pub fn unlisten(self) -> usize {
        match self.listeners.upgrade() {
            Some(listeners) => listeners.lock().remove_matching(&self.event, &self.callback),
            None => 0,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
