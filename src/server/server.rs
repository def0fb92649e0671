//! # Server: orchestrates connectors over one shared executor.
//!
//! The [`Server`] owns the default executor handle, the thread [`Ledger`], the
//! event bus and the ordered list of connectors. Startup is all-or-nothing.
//!
//! ## High-level architecture
//! ```text
//! start()
//!   ├─► state: Created|Stopped|Failed ─► Starting
//!   ├─► for connector in insertion order:
//!   │      ├─ stop() called meanwhile ─► root = StartAborted
//!   │      └─ select! { token cancelled ─► root = StartAborted (in-flight start dropped, lease returned)
//!   │                   connector.start()
//!   │                     ├─ Ok  ─► remember as started
//!   │                     └─ Err ─► root = err   (connector already Failed, lease already returned) }
//!   │
//!   ├─► no root error ─► Started
//!   └─► root error:
//!          ├─ publish RollbackStarted
//!          ├─ stop started connectors in reverse order
//!          │     └─ secondary errors ─► publish RollbackFailed (suppressed)
//!          ├─ Failed; ledger demand on the default executor is back to 0
//!          └─ return root error
//!
//! stop()
//!   ├─► at rest  ─► no-op
//!   ├─► Starting ─► stop every connector, the pending start returns StartAborted
//!   └─► Started  ─► reverse insertion order, every lease released, first error returned
//!
//! start()/stop() future dropped half-way
//!   └─► Unwind guard: remaining connectors abandoned synchronously, leases returned
//!
//! Event flow:
//!   Ledger / Connector / Server ── publish ──► Bus ──► listener ──► SubscriberSet
//! ```
//!
//! ## Example
//! ```rust
//! use threadvisor::{BoundedPool, Connector, Lifecycle, Server};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::new(BoundedPool::arc("server", 3)?);
//!     server.add_connector(Connector::builder("http").acceptors(2).selectors(4).build()?)?;
//!
//!     let err = server.start().await.expect_err("7 threads do not fit in 3");
//!     let cap = err.as_capacity().expect("capacity error");
//!     assert_eq!((cap.required, cap.available), (7, 3));
//!     assert_eq!(server.demand(), 0);
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    budget::Ledger,
    connector::{Connector, Host},
    error::{LifecycleError, RuntimeError},
    events::{Bus, Event, EventKind},
    executor::ExecutorRef,
    ids::ComponentId,
    lifecycle::{Lifecycle, LifecycleState, StateCell, StopFrom},
    subscribers::SubscriberSet,
};

use super::{builder::ServerBuilder, config::ServerConfig};

/// Background task forwarding bus events to subscribers.
struct Listener {
    token: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Which sequence an [`Unwind`] guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// `start_with`: an abandoned start ends `Failed`.
    Start,
    /// `stop` from `Started`: an abandoned stop ends `Stopped`.
    Stop,
    /// `stop` during a start: the start owns the final state.
    Interrupt,
}

/// Connectors still owing a stop when the surrounding future is dropped.
///
/// `pending` is popped from the back, so connectors come down in reverse order.
struct Unwind<'a> {
    server: &'a Server,
    phase: Phase,
    pending: Vec<Arc<Connector>>,
    armed: bool,
}

impl<'a> Unwind<'a> {
    fn new(server: &'a Server, phase: Phase, pending: Vec<Arc<Connector>>) -> Self {
        Self {
            server,
            phase,
            pending,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Unwind<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        while let Some(connector) = self.pending.pop() {
            connector.abandon();
        }
        let server = self.server;
        match self.phase {
            Phase::Start => {
                server.state.finish_start(false);
                server.publish(Event::new(EventKind::StartAborted));
                server.publish(Event::new(EventKind::ServerFailed).with_reason("start abandoned"));
            }
            Phase::Stop => {
                server.state.finish_stop();
                server.publish(Event::new(EventKind::ServerStopped).with_reason("stop abandoned"));
            }
            Phase::Interrupt => {}
        }
    }
}

/// Network server multiplexing connectors over a shared worker pool.
pub struct Server {
    id: ComponentId,
    cfg: ServerConfig,
    host: Host,
    connectors: RwLock<Vec<Arc<Connector>>>,
    state: StateCell,
    listener: Listener,
}

impl Server {
    /// Returns a builder around the default shared executor.
    pub fn builder(executor: ExecutorRef) -> ServerBuilder {
        ServerBuilder::new(executor)
    }

    /// Creates a server with default configuration and no subscribers.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(executor: ExecutorRef) -> Self {
        ServerBuilder::new(executor).build()
    }

    pub(super) fn new_internal(
        id: ComponentId,
        cfg: ServerConfig,
        host: Host,
        subs: SubscriberSet,
    ) -> Self {
        let token = CancellationToken::new();
        let handle = Self::spawn_listener(&host.bus, subs, token.clone());
        Self {
            id,
            cfg,
            host,
            connectors: RwLock::new(Vec::new()),
            state: StateCell::new(),
            listener: Listener {
                token,
                handle: Mutex::new(Some(handle)),
            },
        }
    }

    /// Subscribes to the bus and forwards events to the subscriber set until cancelled.
    ///
    /// On cancellation, already queued events are drained before subscriber
    /// workers are shut down.
    fn spawn_listener(bus: &Bus, subs: SubscriberSet, token: CancellationToken) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => subs.emit(ev),
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    }
                }
            }
            while let Ok(ev) = rx.try_recv() {
                subs.emit(ev);
            }
            subs.shutdown().await;
        })
    }

    /// Returns the server identity.
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.cfg
    }

    /// Returns the default shared executor.
    pub fn executor(&self) -> &ExecutorRef {
        &self.host.executor
    }

    /// Returns the thread ledger.
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.host.ledger
    }

    /// Returns the event bus (subscribe to observe events directly).
    pub fn bus(&self) -> &Bus {
        &self.host.bus
    }

    /// Current demand on the default executor.
    pub fn demand(&self) -> usize {
        self.host.ledger.total_for(self.host.executor.as_ref())
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Returns the connectors in insertion order.
    pub fn connectors(&self) -> Vec<Arc<Connector>> {
        self.connectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Adds a connector; it is started on the next `start()`, after those added before it.
    ///
    /// Fails if the connector already belongs to a server.
    pub fn add_connector(
        &self,
        connector: impl Into<Arc<Connector>>,
    ) -> Result<Arc<Connector>, LifecycleError> {
        let connector = connector.into();
        connector.attach(self.host.clone())?;
        self.connectors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&connector));
        Ok(connector)
    }

    fn publish(&self, ev: Event) {
        self.host.publish(ev.with_component(self.id.label()));
    }

    /// Starts every connector in insertion order, rolling back on the first failure.
    ///
    /// `cancel` is raced against every connector start and checked once more before
    /// the server is declared started; a cancelled start rolls back and returns
    /// [`RuntimeError::StartAborted`]. A `stop()` issued meanwhile aborts the same way.
    ///
    /// Dropping the returned future half-way tears the started connectors down
    /// synchronously and leaves the server `Failed`.
    pub async fn start_with(&self, cancel: &CancellationToken) -> Result<(), RuntimeError> {
        self.state.begin_start(&self.id.to_string())?;
        self.publish(
            Event::new(EventKind::ServerStarting).with_executor(self.host.executor.id().to_string()),
        );

        let mut unwind = Unwind::new(self, Phase::Start, Vec::new());
        let mut root: Option<RuntimeError> = None;

        for connector in self.connectors() {
            if self.state.get() != LifecycleState::Starting {
                break;
            }
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                res = connector.start() => Some(res),
            };
            match outcome {
                Some(Ok(())) => unwind.pending.push(connector),
                Some(Err(e)) => {
                    root = Some(e);
                    break;
                }
                None => break,
            }
        }
        let interrupted = cancel.is_cancelled() || self.state.get() != LifecycleState::Starting;
        if interrupted && matches!(root, None | Some(RuntimeError::StartAborted { .. })) {
            root = Some(self.aborted(unwind.pending.len()));
        }

        if root.is_none() && self.state.finish_start(true) {
            unwind.disarm();
            self.publish(Event::new(EventKind::ServerStarted).with_total(self.demand()));
            return Ok(());
        }

        // Without a root error the start lost a race with stop() and is already `Failed`.
        let settled = root.is_none();
        let err = root.unwrap_or_else(|| self.aborted(unwind.pending.len()));
        self.rollback(&mut unwind, &err).await;
        unwind.disarm();
        if !settled {
            self.state.finish_start(false);
        }
        self.publish(Event::new(EventKind::ServerFailed).with_reason(err.to_string()));
        Err(err)
    }

    fn aborted(&self, started: usize) -> RuntimeError {
        self.publish(Event::new(EventKind::StartAborted));
        RuntimeError::StartAborted { started }
    }

    /// Stops already started connectors in reverse order; errors are reported, not returned.
    async fn rollback(&self, unwind: &mut Unwind<'_>, root: &RuntimeError) {
        self.publish(Event::new(EventKind::RollbackStarted).with_reason(root.to_string()));

        while let Some(connector) = unwind.pending.pop() {
            if let Err(e) = connector.stop().await {
                self.host.publish(
                    Event::new(EventKind::RollbackFailed)
                        .with_component(connector.id().label())
                        .with_reason(e.to_string()),
                );
            }
        }
    }

    /// Stops connectors in reverse insertion order, returning the first error.
    async fn stop_connectors(&self, unwind: &mut Unwind<'_>) -> Result<(), RuntimeError> {
        let mut first: Option<RuntimeError> = None;
        while let Some(connector) = unwind.pending.pop() {
            if let Err(e) = connector.stop().await {
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Stops the server and waits for subscribers to process every pending event.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let stopped = self.stop().await;

        self.listener.token.cancel();
        let handle = self
            .listener
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        stopped
    }
}

#[async_trait]
impl Lifecycle for Server {
    fn name(&self) -> &str {
        self.id.name()
    }

    async fn start(&self) -> Result<(), RuntimeError> {
        self.start_with(&CancellationToken::new()).await
    }

    /// Stops all connectors in reverse insertion order; a no-op when at rest.
    ///
    /// While a start is in flight, every connector is stopped (returning its lease)
    /// and the pending start ends with [`RuntimeError::StartAborted`].
    async fn stop(&self) -> Result<(), RuntimeError> {
        let phase = match self.state.begin_stop() {
            StopFrom::Idle => return Ok(()),
            StopFrom::Starting => Phase::Interrupt,
            StopFrom::Started => Phase::Stop,
        };

        let mut unwind = Unwind::new(self, phase, self.connectors());
        let stopped = self.stop_connectors(&mut unwind).await;
        unwind.disarm();

        if phase == Phase::Stop {
            self.state.finish_stop();
            self.publish(Event::new(EventKind::ServerStopped));
        }
        stopped
    }

    fn is_started(&self) -> bool {
        self.state.is_started()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{BoundedPool, UnboundedPool};

    fn connector(acceptors: usize, selectors: usize) -> Connector {
        Connector::builder("c")
            .acceptors(acceptors)
            .selectors(selectors)
            .build()
            .expect("connector")
    }

    #[tokio::test]
    async fn preserves_insertion_order() {
        let server = Server::new(UnboundedPool::arc("server"));
        let a = server.add_connector(connector(1, 1)).expect("add");
        let b = server.add_connector(connector(1, 1)).expect("add");
        let ids: Vec<ComponentId> = server.connectors().iter().map(|c| c.id().clone()).collect();
        assert_eq!(ids, vec![a.id().clone(), b.id().clone()]);
    }

    #[tokio::test]
    async fn connector_cannot_join_two_servers() {
        let first = Server::new(UnboundedPool::arc("one"));
        let second = Server::new(UnboundedPool::arc("two"));
        let c = first.add_connector(connector(1, 1)).expect("add");
        assert!(matches!(
            second.add_connector(c),
            Err(LifecycleError::AlreadyAttached { .. })
        ));
        assert!(second.connectors().is_empty());
    }

    #[tokio::test]
    async fn start_twice_is_a_lifecycle_error() {
        let server = Server::new(BoundedPool::arc("server", 8).expect("pool"));
        server.add_connector(connector(1, 1)).expect("add");
        server.start().await.expect("start");
        assert!(matches!(
            server.start().await,
            Err(RuntimeError::Lifecycle(LifecycleError::InvalidTransition { .. }))
        ));
        assert_eq!(server.demand(), 3);
        server.shutdown().await.expect("shutdown");
        assert_eq!(server.demand(), 0);
    }

    #[tokio::test]
    async fn empty_server_starts_and_stops() {
        let server = Server::new(BoundedPool::arc("server", 1).expect("pool"));
        server.start().await.expect("start");
        assert!(server.is_started());
        server.stop().await.expect("stop");
        server.stop().await.expect("second stop is a no-op");
        assert_eq!(server.state(), LifecycleState::Stopped);
    }
}
