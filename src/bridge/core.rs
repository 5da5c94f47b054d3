//! Bridge façade for one side of the host/web-content boundary.
//!
//! The [`Bridge`] composes the invocation, event and command registries with
//! the outbound queues and the inbound delivery loop.
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use webview_bridge::{Bridge, Result, callback};
//!
//! # async fn example() -> Result<()> {
//! let bridge = Bridge::builder().web().build()?;
//!
//! bridge.listen("theme-changed", callback(|payload| {
//!     println!("theme: {payload}");
//! }));
//!
//! let pong = bridge.invoke("ping", json!({}))?.await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::{CorrelationId, CorrelationIdGenerator};
use crate::protocol::{InvocationResponse, OutboundEvent, OutboundInvocation};
use crate::registry::{
    CommandRegistry, CommandResult, DispatchReport, EventCallback, EventRegistry,
    InvocationRegistry, ListenerHandle,
};

use super::builder::BridgeBuilder;
use super::delivery::{DeliveryLoop, DeliveryTargets, LoopState, QueueItem};
use super::handle::InvocationHandle;
use super::options::{BridgeOptions, Side};
use super::outbox::Outbound;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the bridge.
pub(crate) struct BridgeInner {
    /// Configuration.
    options: BridgeOptions,

    /// Correlation id source.
    id_generator: Arc<dyn CorrelationIdGenerator>,

    /// Invocations issued by this side.
    invocations: Arc<InvocationRegistry>,

    /// Local event listeners.
    events: EventRegistry,

    /// Handlers for invocations issued by the counterpart.
    commands: Arc<CommandRegistry>,

    /// Queues drained by the counterpart.
    outbound: Arc<Outbound>,

    /// Inbound FIFO worker.
    delivery: DeliveryLoop,
}

// ============================================================================
// Bridge
// ============================================================================

/// One side of the message bridge.
///
/// Cheap to clone; clones share the same registries and queues. Host and
/// web content each own one instance and talk only through the boundary
/// primitives.
#[derive(Clone)]
pub struct Bridge {
    pub(crate) inner: Arc<BridgeInner>,
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("side", &self.side())
            .field("pending", &self.pending_invocations())
            .field("delivery", &self.inner.delivery)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Bridge - Construction
// ============================================================================

impl Bridge {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }

    /// Assembles a bridge and spawns its delivery loop.
    pub(crate) fn from_parts(
        options: BridgeOptions,
        id_generator: Arc<dyn CorrelationIdGenerator>,
    ) -> Self {
        let invocations = Arc::new(InvocationRegistry::new(options.max_pending));
        let events = EventRegistry::new();
        let commands = Arc::new(CommandRegistry::new());
        let outbound = Arc::new(Outbound::default());

        let delivery = DeliveryLoop::spawn(DeliveryTargets {
            side: options.side,
            invocations: Arc::clone(&invocations),
            events: events.clone(),
            commands: Arc::clone(&commands),
            outbound: Arc::clone(&outbound),
        });

        info!(side = %options.side, "Bridge started");

        Self {
            inner: Arc::new(BridgeInner {
                options,
                id_generator,
                invocations,
                events,
                commands,
                outbound,
                delivery,
            }),
        }
    }
}

// ============================================================================
// Bridge - Invocations
// ============================================================================

impl Bridge {
    /// Asks the counterpart to run `command` with `arguments`.
    ///
    /// The request is queued before this returns. Await the handle for the
    /// result. The configured default timeout, if any, applies.
    ///
    /// # Errors
    ///
    /// Nothing is queued when any of these is returned:
    ///
    /// - [`Error::InvalidCommand`] if `command` is empty
    /// - [`Error::InvalidArguments`] if `arguments` is not a JSON object
    /// - [`Error::DuplicateId`] if the id generator repeated a live id
    /// - [`Error::TooManyPending`] if the pending cap is reached
    /// - [`Error::BridgeClosed`] after shutdown
    pub fn invoke(&self, command: impl Into<String>, arguments: Value) -> Result<InvocationHandle> {
        self.enqueue_invocation(command.into(), arguments, self.inner.options.default_timeout)
    }

    /// Like [`invoke`](Self::invoke) with an explicit timeout for this call.
    ///
    /// # Errors
    ///
    /// Same as [`invoke`](Self::invoke).
    pub fn invoke_with_timeout(
        &self,
        command: impl Into<String>,
        arguments: Value,
        timeout: Duration,
    ) -> Result<InvocationHandle> {
        self.enqueue_invocation(command.into(), arguments, Some(timeout))
    }

    /// Invokes with serializable arguments and deserializes the result.
    ///
    /// # Errors
    ///
    /// Same as [`invoke`](Self::invoke), plus [`Error::Json`] on a
    /// serialization mismatch.
    pub async fn invoke_typed<A, R>(&self, command: impl Into<String>, arguments: &A) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let arguments = serde_json::to_value(arguments)?;
        self.invoke(command, arguments)?.wait_as().await
    }

    /// Validates, records and queues one invocation.
    fn enqueue_invocation(
        &self,
        command: String,
        arguments: Value,
        timeout: Option<Duration>,
    ) -> Result<InvocationHandle> {
        let side = self.side();

        if command.is_empty() {
            warn!(side = %side, "Rejected invocation with empty command");
            return Err(Error::InvalidCommand);
        }

        let arguments = match arguments {
            Value::Object(map) => map,
            other => {
                let kind = value_kind(&other);
                warn!(side = %side, command = %command, kind, "Rejected non-object arguments");
                return Err(Error::invalid_arguments(format!(
                    "arguments must be an object, got {kind}"
                )));
            }
        };

        let id = self.inner.id_generator.generate();
        self.inner.invocations.create(id.clone(), command.as_str())?;

        self.inner.outbound.invocations.push(OutboundInvocation::new(
            id.clone(),
            command.clone(),
            arguments,
        ));

        debug!(side = %side, id = %id, command = %command, "Invocation queued");

        Ok(InvocationHandle::new(
            id,
            command,
            Arc::clone(&self.inner.invocations),
            timeout,
        ))
    }

    /// Returns the number of invocations awaiting a result.
    #[inline]
    #[must_use]
    pub fn pending_invocations(&self) -> usize {
        self.inner.invocations.len()
    }
}

// ============================================================================
// Bridge - Events
// ============================================================================

impl Bridge {
    /// Registers `callback` for events named `event` arriving from the
    /// counterpart.
    pub fn listen(&self, event: impl Into<String>, callback: EventCallback) -> ListenerHandle {
        self.inner.events.listen(event, callback)
    }

    /// Removes every registration of `callback` for `event`.
    ///
    /// Returns the number removed.
    pub fn unlisten(&self, event: &str, callback: &EventCallback) -> usize {
        self.inner.events.unlisten(event, callback)
    }

    /// Sends an event to the counterpart. Fire-and-forget.
    pub fn emit(&self, event: impl Into<String>, payload: Value) {
        let event = OutboundEvent::new(event, payload);
        debug!(side = %self.side(), event = %event.event, "Event emitted");
        self.inner.outbound.events.push(event);
    }

    /// Dispatches an event to local listeners immediately, bypassing the
    /// inbound queue.
    pub fn dispatch_event(&self, event: &str, payload: &Value) -> DispatchReport {
        self.inner.events.dispatch(event, payload)
    }

    /// Returns the number of listeners for `event`.
    #[inline]
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.events.listener_count(event)
    }
}

// ============================================================================
// Bridge - Commands
// ============================================================================

impl Bridge {
    /// Registers a handler for invocations of `name` issued by the
    /// counterpart. Replaces any previous handler.
    pub fn register_command<F>(&self, name: impl Into<String>, handler: F) -> bool
    where
        F: Fn(serde_json::Map<String, Value>) -> CommandResult + Send + Sync + 'static,
    {
        self.inner.commands.register(name, handler)
    }

    /// Registers a handler with typed arguments and result.
    pub fn register_typed_command<A, R, F>(&self, name: impl Into<String>, handler: F) -> bool
    where
        A: DeserializeOwned,
        R: Serialize,
        F: Fn(A) -> std::result::Result<R, String> + Send + Sync + 'static,
    {
        self.inner.commands.register_typed(name, handler)
    }

    /// Removes the handler for `name`.
    pub fn unregister_command(&self, name: &str) -> bool {
        self.inner.commands.unregister(name)
    }
}

// ============================================================================
// Bridge - Boundary Primitives
// ============================================================================

impl Bridge {
    /// Pops the oldest invocation waiting for the counterpart.
    #[must_use]
    pub fn drain_next_outbound_invocation(&self) -> Option<OutboundInvocation> {
        self.inner.outbound.invocations.pop()
    }

    /// Pops the oldest event waiting for the counterpart.
    #[must_use]
    pub fn drain_next_outbound_event(&self) -> Option<OutboundEvent> {
        self.inner.outbound.events.pop()
    }

    /// Pops the oldest answer to an invocation the counterpart issued.
    #[must_use]
    pub fn drain_next_outbound_response(&self) -> Option<InvocationResponse> {
        self.inner.outbound.responses.pop()
    }

    /// Delivers a successful result for a previously drained invocation.
    ///
    /// A result for an unknown or already consumed id is dropped silently.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeClosed`] after shutdown.
    pub fn deliver_invocation_result(
        &self,
        id: impl Into<CorrelationId>,
        result: Value,
    ) -> Result<()> {
        self.deliver_invocation_response(InvocationResponse::success(id.into(), result))
    }

    /// Delivers a failure for a previously drained invocation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeClosed`] after shutdown.
    pub fn deliver_invocation_error(
        &self,
        id: impl Into<CorrelationId>,
        message: impl Into<String>,
    ) -> Result<()> {
        self.deliver_invocation_response(InvocationResponse::error(id.into(), message))
    }

    /// Delivers a response for a previously drained invocation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeClosed`] after shutdown.
    pub fn deliver_invocation_response(&self, response: InvocationResponse) -> Result<()> {
        self.inner.delivery.enqueue(QueueItem::Invoke(response))
    }

    /// Queues an event from the counterpart for local listeners.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeClosed`] after shutdown.
    pub fn enqueue_inbound_event(&self, event: impl Into<String>, payload: Value) -> Result<()> {
        self.inner
            .delivery
            .enqueue(QueueItem::Event(OutboundEvent::new(event, payload)))
    }

    /// Queues an invocation issued by the counterpart for the local command
    /// handlers. Its answer appears on
    /// [`drain_next_outbound_response`](Self::drain_next_outbound_response).
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeClosed`] after shutdown.
    pub fn enqueue_inbound_invocation(&self, invocation: OutboundInvocation) -> Result<()> {
        self.inner.delivery.enqueue(QueueItem::Command(invocation))
    }

    /// Waits until at least one outbound queue holds an item.
    pub async fn outbound_ready(&self) {
        self.inner.outbound.ready().await;
    }

    /// Returns the number of invocations waiting to be drained.
    #[inline]
    #[must_use]
    pub fn outbound_invocation_len(&self) -> usize {
        self.inner.outbound.invocations.len()
    }

    /// Returns the number of events waiting to be drained.
    #[inline]
    #[must_use]
    pub fn outbound_event_len(&self) -> usize {
        self.inner.outbound.events.len()
    }

    /// Returns the number of responses waiting to be drained.
    #[inline]
    #[must_use]
    pub fn outbound_response_len(&self) -> usize {
        self.inner.outbound.responses.len()
    }
}

// ============================================================================
// Bridge - Lifecycle
// ============================================================================

impl Bridge {
    /// Side this bridge serves.
    #[inline]
    #[must_use]
    pub fn side(&self) -> Side {
        self.inner.options.side
    }

    /// Active configuration.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &BridgeOptions {
        &self.inner.options
    }

    /// Current state of the delivery loop.
    #[inline]
    #[must_use]
    pub fn delivery_state(&self) -> LoopState {
        self.inner.delivery.state()
    }

    /// Number of inbound items not yet delivered.
    #[inline]
    #[must_use]
    pub fn inbound_len(&self) -> usize {
        self.inner.delivery.queued()
    }

    /// Waits until every inbound item queued before this call is delivered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BridgeClosed`] after shutdown.
    pub async fn flush(&self) -> Result<()> {
        self.inner.delivery.flush().await
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has been called.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.invocations.is_closed()
    }

    /// Shuts the bridge down.
    ///
    /// Already queued inbound items are delivered first. Every pending
    /// invocation then fails with [`Error::BridgeClosed`], as does any later
    /// `invoke` or inbound enqueue.
    pub async fn shutdown(&self) {
        if self.is_closed() {
            return;
        }

        info!(side = %self.side(), "Bridge shutting down");

        self.inner.delivery.shutdown().await;
        self.inner.invocations.close();
        self.inner.events.clear();

        info!(side = %self.side(), "Bridge shutdown complete");
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// JSON type name for diagnostics.
fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Tests
// ============================================================================
