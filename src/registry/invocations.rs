//! Pending invocation records keyed by correlation id.
//!
//! Each record moves through `Pending → Resolved` exactly once and is
//! removed when its caller observes the result. Waiters park on a
//! per-record [`Notify`] instead of polling.
//!
//! # Resolution Rules
//!
//! | Record state | `resolve` outcome |
//! |--------------|-------------------|
//! | absent | dropped silently (unmatched resolution) |
//! | `Pending` | becomes `Resolved`, waiter woken |
//! | `Resolved` | ignored, first resolution wins |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::Notify;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::CorrelationId;
use crate::protocol::InvocationResponse;

// ============================================================================
// Types
// ============================================================================

/// Lifecycle state of an invocation record.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationState {
    /// Waiting for the counterpart to answer.
    Pending,
    /// Answered, not yet observed by the caller.
    Resolved(InvocationResponse),
}

/// A single registry entry.
struct Record {
    /// Command name, kept for error context.
    command: String,
    /// Current state.
    state: InvocationState,
    /// Wakes the caller parked in `wait`.
    notify: Arc<Notify>,
}

// ============================================================================
// InvocationRegistry
// ============================================================================

/// Mapping from correlation id to invocation state.
///
/// Thread-safe. Locks are never held across an await point.
pub struct InvocationRegistry {
    /// Outstanding records.
    records: Mutex<FxHashMap<CorrelationId, Record>>,
    /// Optional cap on outstanding records.
    max_pending: Option<usize>,
    /// Set once by `close`.
    closed: AtomicBool,
}

impl Default for InvocationRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

impl InvocationRegistry {
    /// Creates an empty registry with an optional cap on outstanding records.
    #[must_use]
    pub fn new(max_pending: Option<usize>) -> Self {
        Self {
            records: Mutex::new(FxHashMap::default()),
            max_pending,
            closed: AtomicBool::new(false),
        }
    }

    /// Inserts a `Pending` record for `id`.
    ///
    /// # Errors
    ///
    /// - [`Error::BridgeClosed`] if the registry was closed
    /// - [`Error::DuplicateId`] if `id` already has a record
    /// - [`Error::TooManyPending`] if the cap is reached
    pub fn create(&self, id: CorrelationId, command: impl Into<String>) -> Result<()> {
        if self.is_closed() {
            return Err(Error::BridgeClosed);
        }

        let mut records = self.records.lock();

        if records.contains_key(&id) {
            warn!(id = %id, "Correlation id collision");
            return Err(Error::duplicate_id(id));
        }

        if let Some(max) = self.max_pending
            && records.len() >= max
        {
            warn!(pending = records.len(), max, "Too many pending invocations");
            return Err(Error::too_many_pending(records.len(), max));
        }

        records.insert(
            id,
            Record {
                command: command.into(),
                state: InvocationState::Pending,
                notify: Arc::new(Notify::new()),
            },
        );

        Ok(())
    }

    /// Transitions the record for `response.id` to `Resolved`.
    ///
    /// Returns `true` if a pending record was resolved. Unknown ids and
    /// already resolved records are left untouched and return `false`.
    pub fn resolve(&self, response: InvocationResponse) -> bool {
        let notify = {
            let mut records = self.records.lock();

            let Some(record) = records.get_mut(&response.id) else {
                trace!(id = %response.id, "Unmatched resolution dropped");
                return false;
            };

            if matches!(record.state, InvocationState::Resolved(_)) {
                warn!(id = %response.id, "Duplicate resolution ignored");
                return false;
            }

            trace!(id = %response.id, command = %record.command, "Invocation resolved");
            record.state = InvocationState::Resolved(response);
            Arc::clone(&record.notify)
        };

        notify.notify_one();
        true
    }

    /// Waits until `id` is resolved, then removes the record and returns
    /// its result.
    ///
    /// # Errors
    ///
    /// - [`Error::CommandFailed`] if the counterpart answered with an error
    /// - [`Error::Timeout`] if `wait_timeout` elapsed (the record is evicted)
    /// - [`Error::BridgeClosed`] if the registry was closed while waiting
    pub async fn wait(&self, id: &CorrelationId, wait_timeout: Option<Duration>) -> Result<Value> {
        let Some(duration) = wait_timeout else {
            return self.wait_resolved(id).await;
        };

        match timeout(duration, self.wait_resolved(id)).await {
            Ok(result) => result,
            Err(_) => {
                let removed = self.records.lock().remove(id);

                match removed {
                    // Answer raced the deadline.
                    Some(Record {
                        command,
                        state: InvocationState::Resolved(response),
                        ..
                    }) => response.into_result(&command),
                    Some(Record { command, .. }) => {
                        debug!(id = %id, command = %command, "Invocation timed out");
                        Err(Error::timeout(id.clone(), command, duration.as_millis() as u64))
                    }
                    None => Err(Error::timeout(
                        id.clone(),
                        String::new(),
                        duration.as_millis() as u64,
                    )),
                }
            }
        }
    }

    /// Parks on the record's wake signal until it is resolved or closed.
    async fn wait_resolved(&self, id: &CorrelationId) -> Result<Value> {
        loop {
            let notify = {
                let mut records = self.records.lock();

                let record = records.get(id).ok_or(Error::BridgeClosed)?;

                if matches!(record.state, InvocationState::Resolved(_)) {
                    if let Some(Record {
                        command,
                        state: InvocationState::Resolved(response),
                        ..
                    }) = records.remove(id)
                    {
                        return response.into_result(&command);
                    }
                    return Err(Error::BridgeClosed);
                }

                if self.is_closed() {
                    records.remove(id);
                    return Err(Error::BridgeClosed);
                }

                Arc::clone(&record.notify)
            };

            notify.notified().await;
        }
    }

    /// Removes the record for `id` regardless of its state.
    ///
    /// Returns `true` if a record was removed.
    pub fn forget(&self, id: &CorrelationId) -> bool {
        let removed = self.records.lock().remove(id).is_some();
        if removed {
            trace!(id = %id, "Invocation record forgotten");
        }
        removed
    }

    /// Closes the registry, failing every current and future waiter.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let notifies: Vec<_> = self
            .records
            .lock()
            .values()
            .map(|record| Arc::clone(&record.notify))
            .collect();

        if !notifies.is_empty() {
            debug!(count = notifies.len(), "Failing pending invocations on close");
        }

        for notify in notifies {
            notify.notify_one();
        }
    }

    /// Returns the state of the record for `id`, if any.
    #[must_use]
    pub fn state(&self, id: &CorrelationId) -> Option<InvocationState> {
        self.records.lock().get(id).map(|record| record.state.clone())
    }

    /// Returns `true` if a record exists for `id`.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &CorrelationId) -> bool {
        self.records.lock().contains_key(id)
    }

    /// Returns the number of outstanding records.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns `true` if no records are outstanding.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Returns `true` once `close` has been called.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Tests
// ============================================================================
