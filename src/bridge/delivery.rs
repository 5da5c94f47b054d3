//! Inbound delivery loop.
//!
//! A spawned task owns the inbound FIFO and routes one item per tick:
//!
//! | Item | Routed to |
//! |------|-----------|
//! | [`QueueItem::Invoke`] | [`InvocationRegistry::resolve`] |
//! | [`QueueItem::Event`] | [`EventRegistry::dispatch`] |
//! | [`QueueItem::Command`] | [`CommandRegistry::execute`], response queued outbound |
//!
//! # States
//!
//! ```text
//!          item arrives            queue empty
//!   Idle ───────────────► Draining ───────────► Idle
//!     │                      │
//!     └──── shutdown ────────┴────────────────► Stopped
//! ```
//!
//! The worker parks in `Idle` and resumes on the next enqueue; it only stops
//! on shutdown or when every sender is gone.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::{InvocationResponse, OutboundEvent, OutboundInvocation};
use crate::registry::{CommandRegistry, EventRegistry, InvocationRegistry};

use super::options::Side;
use super::outbox::Outbound;

// ============================================================================
// QueueItem
// ============================================================================

/// A single inbound item, consumed exactly once.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueItem {
    /// Result for an invocation this side issued.
    Invoke(InvocationResponse),
    /// Event for local listeners.
    Event(OutboundEvent),
    /// Invocation issued by the counterpart.
    Command(OutboundInvocation),
}

impl QueueItem {
    /// Short kind label for logs.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Invoke(_) => "invoke",
            Self::Event(_) => "event",
            Self::Command(_) => "command",
        }
    }
}

// ============================================================================
// LoopState
// ============================================================================

/// Observable state of the delivery loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoopState {
    /// Parked, waiting for an item.
    Idle = 0,
    /// Routing items.
    Draining = 1,
    /// Terminated; nothing more will be delivered.
    Stopped = 2,
}

impl LoopState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

/// Shared, lock-free state cell.
#[derive(Clone)]
struct StateCell(Arc<AtomicU8>);

impl StateCell {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(LoopState::Idle as u8)))
    }

    fn get(&self) -> LoopState {
        LoopState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: LoopState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

// ============================================================================
// DeliveryTargets
// ============================================================================

/// Everything the loop routes into.
pub(crate) struct DeliveryTargets {
    pub(crate) side: Side,
    pub(crate) invocations: Arc<InvocationRegistry>,
    pub(crate) events: EventRegistry,
    pub(crate) commands: Arc<CommandRegistry>,
    pub(crate) outbound: Arc<Outbound>,
}

impl DeliveryTargets {
    /// Routes one item. Never panics: listener and handler failures are
    /// contained by the registries.
    fn route(&self, item: QueueItem) {
        match item {
            QueueItem::Invoke(response) => {
                self.invocations.resolve(response);
            }
            QueueItem::Event(event) => {
                self.events.dispatch(&event.event, &event.payload);
            }
            QueueItem::Command(invocation) => {
                let response = self.commands.execute(invocation);
                self.outbound.responses.push(response);
            }
        }
    }
}

// ============================================================================
// LoopCommand
// ============================================================================

/// Internal commands for the loop task.
enum LoopCommand {
    /// Route an item.
    Deliver(QueueItem),
    /// Acknowledge once everything queued earlier has been routed.
    Flush(oneshot::Sender<()>),
    /// Stop after everything queued earlier has been routed.
    Shutdown,
}

// ============================================================================
// DeliveryLoop
// ============================================================================

/// Handle to the spawned delivery task.
pub struct DeliveryLoop {
    side: Side,
    command_tx: mpsc::UnboundedSender<LoopCommand>,
    state: StateCell,
    queued: Arc<AtomicUsize>,
    closing: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for DeliveryLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryLoop")
            .field("side", &self.side)
            .field("state", &self.state())
            .field("queued", &self.queued())
            .finish()
    }
}

impl DeliveryLoop {
    /// Spawns the loop task. Must be called inside a tokio runtime.
    pub(crate) fn spawn(targets: DeliveryTargets) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let state = StateCell::new();
        let queued = Arc::new(AtomicUsize::new(0));
        let side = targets.side;

        let task = tokio::spawn(Self::run(
            command_rx,
            targets,
            state.clone(),
            Arc::clone(&queued),
        ));

        Self {
            side,
            command_tx,
            state,
            queued,
            closing: AtomicBool::new(false),
            task: Mutex::new(Some(task)),
        }
    }

    /// Appends an item to the inbound FIFO.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeClosed`] once shutdown has begun.
    pub fn enqueue(&self, item: QueueItem) -> Result<()> {
        if self.closing.load(Ordering::Acquire) {
            debug!(side = %self.side, "Enqueue after shutdown began");
            return Err(Error::BridgeClosed);
        }

        self.queued.fetch_add(1, Ordering::AcqRel);

        if self.command_tx.send(LoopCommand::Deliver(item)).is_err() {
            self.queued.fetch_sub(1, Ordering::AcqRel);
            debug!(side = %self.side, "Enqueue after delivery loop stopped");
            return Err(Error::BridgeClosed);
        }

        Ok(())
    }

    /// Waits until every item enqueued before this call has been routed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeClosed`] if the loop stopped first.
    pub async fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();

        self.command_tx
            .send(LoopCommand::Flush(ack_tx))
            .map_err(|_| Error::BridgeClosed)?;

        ack_rx.await.map_err(|_| Error::BridgeClosed)
    }

    /// Stops the loop after draining what is already queued, and waits for
    /// the task to exit.
    pub async fn shutdown(&self) {
        self.closing.store(true, Ordering::Release);
        let _ = self.command_tx.send(LoopCommand::Shutdown);

        let task = self.task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            debug!(side = %self.side, error = %e, "Delivery task join failed");
        }
    }

    /// Returns the current loop state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> LoopState {
        self.state.get()
    }

    /// Returns the number of items enqueued but not yet routed.
    #[inline]
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }

    /// Loop body.
    async fn run(
        mut command_rx: mpsc::UnboundedReceiver<LoopCommand>,
        targets: DeliveryTargets,
        state: StateCell,
        queued: Arc<AtomicUsize>,
    ) {
        debug!(side = %targets.side, "Delivery loop started");

        loop {
            let command = match command_rx.try_recv() {
                Ok(command) => command,
                Err(TryRecvError::Empty) => {
                    state.set(LoopState::Idle);
                    match command_rx.recv().await {
                        Some(command) => command,
                        None => break,
                    }
                }
                Err(TryRecvError::Disconnected) => break,
            };

            match command {
                LoopCommand::Deliver(item) => {
                    state.set(LoopState::Draining);
                    trace!(side = %targets.side, kind = item.kind(), "Delivering item");

                    targets.route(item);
                    queued.fetch_sub(1, Ordering::AcqRel);

                    // Let other tasks on this side run between ticks.
                    tokio::task::yield_now().await;
                }
                LoopCommand::Flush(ack) => {
                    let _ = ack.send(());
                }
                LoopCommand::Shutdown => {
                    debug!(side = %targets.side, "Shutdown command received");
                    break;
                }
            }
        }

        // Anything accepted before the channel closed is still routed once.
        command_rx.close();
        let mut late = 0usize;
        while let Ok(command) = command_rx.try_recv() {
            match command {
                LoopCommand::Deliver(item) => {
                    targets.route(item);
                    queued.fetch_sub(1, Ordering::AcqRel);
                    late += 1;
                }
                LoopCommand::Flush(ack) => {
                    let _ = ack.send(());
                }
                LoopCommand::Shutdown => {}
            }
        }
        if late > 0 {
            warn!(side = %targets.side, count = late, "Delivered items that raced shutdown");
        }

        state.set(LoopState::Stopped);

        debug!(side = %targets.side, "Delivery loop terminated");
    }
}

// ============================================================================
// Tests
// ============================================================================
