//! # Connector: a listening component that leases its threads before it runs.
//!
//! ## Start sequence
//! ```text
//! start()
//!   ├─► state: Created|Stopped|Failed ─► Starting   (else LifecycleError)
//!   ├─► resolve executor
//!   │     ├─ dedicated pool   ─► no ledger interaction at all
//!   │     └─ server default   ─► ledger.lease(self, default, required)
//!   │                              └─ CapacityExceeded ─► Failed, error returned unchanged
//!   ├─► endpoint.open(ctx)            (optional)
//!   │     └─ Err ─► release lease, Failed
//!   └─► Started
//! ```
//!
//! ## Stop sequence
//! ```text
//! stop()
//!   ├─► at rest ─► no-op
//!   ├─► Starting ─► ledger.release(self, default); the start ends Failed
//!   ├─► endpoint.close()  (bounded by stop_grace)
//!   ├─► ledger.release(self, default)   (always, even if close failed or was dropped)
//!   └─► Stopped, close error (if any) returned
//! ```
//!
//! A start future dropped half-way returns its lease and leaves the connector `Failed`.
//!
//! A connector with a dedicated executor is invisible to the server ledger; its
//! pool is accounted by whoever owns it.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use async_trait::async_trait;
use tokio::runtime::Handle;

use crate::connector::host::Host;
use crate::connector::{ConnectorConfig, Endpoint, EndpointContext};
use crate::error::{ConfigError, LifecycleError, RuntimeError};
use crate::events::{Event, EventKind};
use crate::executor::ExecutorRef;
use crate::ids::ComponentId;
use crate::lifecycle::{Lifecycle, LifecycleState, StateCell, StopFrom};

/// Builder for a [`Connector`].
pub struct ConnectorBuilder {
    name: Arc<str>,
    config: ConnectorConfig,
    executor: Option<ExecutorRef>,
    endpoint: Option<Arc<dyn Endpoint>>,
}

impl ConnectorBuilder {
    /// Starts a builder with the default plan (1 acceptor, 1 selector, 1 reserved).
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            config: ConnectorConfig::default(),
            executor: None,
            endpoint: None,
        }
    }

    /// Sets the acceptor thread count.
    pub fn acceptors(mut self, n: usize) -> Self {
        self.config.acceptors = n;
        self
    }

    /// Sets the selector thread count.
    pub fn selectors(mut self, n: usize) -> Self {
        self.config.selectors = n;
        self
    }

    /// Sets the reserved thread count.
    pub fn reserved(mut self, n: usize) -> Self {
        self.config.reserved = n;
        self
    }

    /// Replaces the whole thread plan.
    pub fn config(mut self, config: ConnectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Gives the connector its own pool instead of the server's default one.
    pub fn executor(mut self, executor: ExecutorRef) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Attaches the I/O endpoint opened on start.
    pub fn endpoint(mut self, endpoint: Arc<dyn Endpoint>) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Validates the plan and builds the connector.
    pub fn build(self) -> Result<Connector, ConfigError> {
        self.config.validate()?;
        Ok(Connector {
            id: ComponentId::new(self.name),
            config: self.config,
            dedicated: self.executor,
            endpoint: self.endpoint,
            state: StateCell::new(),
            host: OnceLock::new(),
            leased: Mutex::new(None),
        })
    }
}

/// Listening component with a fixed thread requirement.
pub struct Connector {
    id: ComponentId,
    config: ConnectorConfig,
    dedicated: Option<ExecutorRef>,
    endpoint: Option<Arc<dyn Endpoint>>,
    state: StateCell,
    host: OnceLock<Host>,
    /// Executor currently holding this connector's ledger lease.
    leased: Mutex<Option<ExecutorRef>>,
}

impl Connector {
    /// Returns a builder for a connector named `name`.
    pub fn builder(name: impl Into<Arc<str>>) -> ConnectorBuilder {
        ConnectorBuilder::new(name)
    }

    /// Builds a connector sharing the server executor with the given plan.
    pub fn new(config: ConnectorConfig) -> Result<Self, ConfigError> {
        ConnectorBuilder::new("connector").config(config).build()
    }

    /// Returns the connector identity (also its ledger owner id).
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Returns the thread plan.
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Worker slots this connector needs.
    pub fn required_threads(&self) -> usize {
        self.config.required_threads()
    }

    /// Returns the dedicated pool, if any.
    pub fn dedicated_executor(&self) -> Option<&ExecutorRef> {
        self.dedicated.as_ref()
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// True if the connector currently holds a lease on the shared executor.
    pub fn holds_lease(&self) -> bool {
        self.leased
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn attach(&self, host: Host) -> Result<(), LifecycleError> {
        self.host
            .set(host)
            .map_err(|_| LifecycleError::AlreadyAttached {
                component: self.id.to_string(),
            })
    }

    fn publish(&self, ev: Event) {
        if let Some(host) = self.host.get() {
            host.publish(ev.with_component(self.id.label()));
        }
    }

    async fn acquire(&self) -> Result<ExecutorRef, RuntimeError> {
        let host = self.host.get();
        let (executor, lender) = match (&self.dedicated, host) {
            (Some(own), _) => (Arc::clone(own), None),
            (None, Some(host)) => (Arc::clone(&host.executor), Some(host)),
            (None, None) => {
                return Err(LifecycleError::Detached {
                    component: self.id.to_string(),
                }
                .into());
            }
        };

        let required = self.required_threads();
        self.publish(
            Event::new(EventKind::ConnectorStarting)
                .with_executor(executor.id().to_string())
                .with_required(required),
        );

        if let Some(host) = lender {
            host.ledger.lease(&self.id, executor.as_ref(), required)?;
            *self.leased.lock().unwrap_or_else(PoisonError::into_inner) =
                Some(Arc::clone(&executor));
        }

        if let Some(endpoint) = &self.endpoint {
            let ctx = EndpointContext {
                connector: self.id.clone(),
                executor: Arc::clone(&executor),
                plan: self.config,
                shared: lender.is_some(),
            };
            if let Err(e) = endpoint.open(ctx).await {
                self.release();
                return Err(RuntimeError::Endpoint {
                    component: self.id.to_string(),
                    error: e.to_string(),
                });
            }
        }
        Ok(executor)
    }

    fn release(&self) {
        let leased = self
            .leased
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let (Some(executor), Some(host)) = (leased, self.host.get()) {
            host.ledger.release(&self.id, executor.as_ref());
        }
    }

    async fn close_endpoint(&self) -> Result<(), RuntimeError> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(());
        };
        let grace = self.host.get().and_then(|h| h.stop_grace);
        let closed = match grace {
            Some(grace) => match tokio::time::timeout(grace, endpoint.close()).await {
                Ok(res) => res,
                Err(_) => {
                    return Err(RuntimeError::StopTimeout {
                        component: self.id.to_string(),
                        grace,
                    });
                }
            },
            None => endpoint.close().await,
        };
        closed.map_err(|e| RuntimeError::Endpoint {
            component: self.id.to_string(),
            error: e.to_string(),
        })
    }
}

/// Undoes a start whose future was dropped before it finished.
struct StartGuard<'a> {
    connector: &'a Connector,
    armed: bool,
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.connector.release();
        self.connector.state.finish_start(false);
        self.connector
            .publish(Event::new(EventKind::ConnectorFailed).with_reason("start abandoned"));
    }
}

/// Returns the lease and settles `Stopped` however the stop sequence ends.
struct StopGuard<'a>(&'a Connector);

impl Drop for StopGuard<'_> {
    fn drop(&mut self) {
        self.0.release();
        self.0.state.finish_stop();
    }
}

impl Connector {
    /// Tears a started connector down without awaiting anything.
    ///
    /// Used when the server start that launched it is dropped: the lease goes
    /// back at once and the endpoint closes in the background.
    pub(crate) fn abandon(&self) {
        match self.state.begin_stop() {
            StopFrom::Idle => return,
            StopFrom::Starting => {
                self.release();
                return;
            }
            StopFrom::Started => {}
        }
        let _guard = StopGuard(self);

        if let (Some(endpoint), Ok(rt)) = (&self.endpoint, Handle::try_current()) {
            let endpoint = Arc::clone(endpoint);
            let grace = self.host.get().and_then(|h| h.stop_grace);
            rt.spawn(async move {
                match grace {
                    Some(grace) => {
                        let _ = tokio::time::timeout(grace, endpoint.close()).await;
                    }
                    None => {
                        let _ = endpoint.close().await;
                    }
                }
            });
        }
        self.publish(Event::new(EventKind::ConnectorStopped).with_reason("start abandoned"));
    }

    /// Finishes a start that a concurrent `stop()` interrupted.
    async fn unwind_interrupted(&self) -> RuntimeError {
        self.release();
        let closed = self.close_endpoint().await;

        let err = RuntimeError::StartAborted { started: 0 };
        let reason = match closed {
            Ok(()) => err.to_string(),
            Err(e) => format!("{err}; {e}"),
        };
        self.publish(Event::new(EventKind::ConnectorFailed).with_reason(reason));
        err
    }
}

#[async_trait]
impl Lifecycle for Connector {
    fn name(&self) -> &str {
        self.id.name()
    }

    async fn start(&self) -> Result<(), RuntimeError> {
        self.state.begin_start(&self.id.to_string())?;

        let mut guard = StartGuard {
            connector: self,
            armed: true,
        };
        let acquired = self.acquire().await;
        guard.armed = false;

        match acquired {
            Ok(executor) => {
                if !self.state.finish_start(true) {
                    return Err(self.unwind_interrupted().await);
                }
                self.publish(
                    Event::new(EventKind::ConnectorStarted)
                        .with_executor(executor.id().to_string()),
                );
                Ok(())
            }
            Err(e) => {
                self.state.finish_start(false);
                self.publish(Event::new(EventKind::ConnectorFailed).with_reason(e.to_string()));
                Err(e)
            }
        }
    }

    /// Stops a started connector; while a start is in flight it only returns the
    /// lease and lets the start finish as `Failed`.
    async fn stop(&self) -> Result<(), RuntimeError> {
        match self.state.begin_stop() {
            StopFrom::Idle => return Ok(()),
            StopFrom::Starting => {
                self.release();
                return Ok(());
            }
            StopFrom::Started => {}
        }

        let guard = StopGuard(self);
        let closed = self.close_endpoint().await;
        drop(guard);

        let mut ev = Event::new(EventKind::ConnectorStopped);
        if let Err(e) = &closed {
            ev = ev.with_reason(e.to_string());
        }
        self.publish(ev);
        closed
    }

    fn is_started(&self) -> bool {
        self.state.is_started()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::budget::Ledger;
    use crate::connector::EndpointError;
    use crate::events::Bus;
    use crate::executor::BoundedPool;
    use tokio::sync::Notify;

    fn host(capacity: usize) -> Host {
        let bus = Bus::new(64);
        Host {
            executor: BoundedPool::arc("server", capacity).expect("pool"),
            ledger: Arc::new(Ledger::new(bus.clone())),
            bus,
            stop_grace: Some(Duration::from_millis(50)),
        }
    }

    #[derive(Default)]
    struct Flaky {
        fail_open: bool,
        fail_close: bool,
        hang_close: bool,
        opened: AtomicUsize,
        closed: AtomicUsize,
    }

    #[async_trait]
    impl Endpoint for Flaky {
        async fn open(&self, ctx: EndpointContext) -> Result<(), EndpointError> {
            assert!(ctx.shared);
            self.opened.fetch_add(1, Ordering::SeqCst);
            if self.fail_open {
                return Err(EndpointError::new("bind: address in use"));
            }
            Ok(())
        }

        async fn close(&self) -> Result<(), EndpointError> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            if self.hang_close {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if self.fail_close {
                return Err(EndpointError::new("close failed"));
            }
            Ok(())
        }
    }

    #[test]
    fn invalid_plan_never_builds() {
        assert_eq!(
            Connector::builder("c").acceptors(0).build().err(),
            Some(ConfigError::NoAcceptors)
        );
        assert_eq!(
            Connector::builder("c").selectors(0).build().err(),
            Some(ConfigError::NoSelectors)
        );
    }

    #[tokio::test]
    async fn start_and_stop_move_the_lease() {
        let host = host(4);
        let c = Connector::builder("http").build().expect("connector");
        c.attach(host.clone()).expect("attach");

        c.start().await.expect("start");
        assert_eq!(c.state(), LifecycleState::Started);
        assert!(c.holds_lease());
        assert_eq!(host.ledger.total_for(host.executor.as_ref()), 3);

        c.stop().await.expect("stop");
        assert_eq!(c.state(), LifecycleState::Stopped);
        assert!(!c.holds_lease());
        assert_eq!(host.ledger.total_for(host.executor.as_ref()), 0);
    }

    #[tokio::test]
    async fn lease_denial_fails_the_connector() {
        let host = host(3);
        let c = Connector::builder("http")
            .acceptors(2)
            .selectors(4)
            .build()
            .expect("connector");
        c.attach(host.clone()).expect("attach");

        let err = c.start().await.expect_err("overflow");
        let cap = err.as_capacity().expect("capacity error");
        assert_eq!((cap.required, cap.available), (7, 3));
        assert_eq!(&cap.owner, c.id());
        assert_eq!(c.state(), LifecycleState::Failed);
        assert_eq!(host.ledger.total_for(host.executor.as_ref()), 0);

        c.stop().await.expect("stop after failure is a no-op");
        assert_eq!(c.state(), LifecycleState::Failed);
    }

    #[tokio::test]
    async fn dedicated_executor_skips_the_ledger() {
        let host = host(3);
        let own = BoundedPool::arc("own", 100).expect("pool");
        let c = Connector::builder("http")
            .acceptors(2)
            .selectors(4)
            .executor(Arc::clone(&own))
            .build()
            .expect("connector");
        c.attach(host.clone()).expect("attach");

        c.start().await.expect("start");
        assert!(!c.holds_lease());
        assert_eq!(host.ledger.total_for(host.executor.as_ref()), 0);
        assert_eq!(host.ledger.total_for(own.as_ref()), 0);
    }

    #[tokio::test]
    async fn endpoint_open_failure_returns_the_lease() {
        let host = host(8);
        let endpoint = Arc::new(Flaky {
            fail_open: true,
            ..Flaky::default()
        });
        let c = Connector::builder("http")
            .endpoint(endpoint.clone())
            .build()
            .expect("connector");
        c.attach(host.clone()).expect("attach");

        let err = c.start().await.expect_err("open fails");
        assert_eq!(err.as_label(), "runtime_endpoint_failed");
        assert_eq!(c.state(), LifecycleState::Failed);
        assert_eq!(host.ledger.total_for(host.executor.as_ref()), 0);
        assert_eq!(endpoint.closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn close_failure_still_releases() {
        let host = host(8);
        let endpoint = Arc::new(Flaky {
            fail_close: true,
            ..Flaky::default()
        });
        let c = Connector::builder("http")
            .endpoint(endpoint.clone())
            .build()
            .expect("connector");
        c.attach(host.clone()).expect("attach");

        c.start().await.expect("start");
        assert!(c.stop().await.is_err());
        assert_eq!(c.state(), LifecycleState::Stopped);
        assert_eq!(host.ledger.total_for(host.executor.as_ref()), 0);
        assert_eq!(endpoint.opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_close_times_out_and_releases() {
        let host = host(8);
        let c = Connector::builder("http")
            .endpoint(Arc::new(Flaky {
                hang_close: true,
                ..Flaky::default()
            }))
            .build()
            .expect("connector");
        c.attach(host.clone()).expect("attach");

        c.start().await.expect("start");
        let err = c.stop().await.expect_err("timeout");
        assert_eq!(err.as_label(), "runtime_stop_timeout");
        assert_eq!(host.ledger.total_for(host.executor.as_ref()), 0);
    }

    #[tokio::test]
    async fn detached_shared_connector_cannot_start() {
        let c = Connector::builder("http").build().expect("connector");
        let err = c.start().await.expect_err("detached");
        assert!(matches!(
            err,
            RuntimeError::Lifecycle(LifecycleError::Detached { .. })
        ));
        assert_eq!(c.state(), LifecycleState::Failed);
    }

    #[tokio::test]
    async fn double_start_and_double_attach_are_rejected() {
        let host = host(8);
        let c = Connector::builder("http").build().expect("connector");
        c.attach(host.clone()).expect("attach");
        assert!(c.attach(host.clone()).is_err());

        c.start().await.expect("start");
        assert!(matches!(
            c.start().await,
            Err(RuntimeError::Lifecycle(LifecycleError::InvalidTransition { .. }))
        ));
        assert_eq!(host.ledger.total_for(host.executor.as_ref()), 3);
    }

    /// Endpoint whose `open` waits until it is let through.
    #[derive(Default)]
    struct Gate {
        pass: Notify,
    }

    #[async_trait]
    impl Endpoint for Gate {
        async fn open(&self, _ctx: EndpointContext) -> Result<(), EndpointError> {
            self.pass.notified().await;
            Ok(())
        }

        async fn close(&self) -> Result<(), EndpointError> {
            Ok(())
        }
    }

    async fn wait_for_lease(c: &Connector) {
        while !c.holds_lease() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_start_returns_the_lease() {
        let host = host(8);
        let c = Connector::builder("http")
            .endpoint(Arc::new(Gate::default()))
            .build()
            .expect("connector");
        c.attach(host.clone()).expect("attach");

        let res = tokio::time::timeout(Duration::from_secs(1), c.start()).await;
        assert!(res.is_err(), "open never finishes");
        assert_eq!(c.state(), LifecycleState::Failed);
        assert!(!c.holds_lease());
        assert_eq!(host.ledger.total_for(host.executor.as_ref()), 0);

        c.stop().await.expect("stop after an abandoned start is a no-op");
    }

    #[tokio::test]
    async fn stop_while_starting_returns_the_lease() {
        let host = host(8);
        let gate = Arc::new(Gate::default());
        let c = Arc::new(
            Connector::builder("http")
                .endpoint(gate.clone())
                .build()
                .expect("connector"),
        );
        c.attach(host.clone()).expect("attach");

        let starting = tokio::spawn({
            let c = Arc::clone(&c);
            async move { c.start().await }
        });
        wait_for_lease(&c).await;
        assert_eq!(c.state(), LifecycleState::Starting);

        c.stop().await.expect("stop while starting");
        assert_eq!(host.ledger.total_for(host.executor.as_ref()), 0);

        gate.pass.notify_one();
        let err = starting.await.expect("join").expect_err("start was interrupted");
        assert_eq!(err.as_label(), "runtime_start_aborted");
        assert_eq!(c.state(), LifecycleState::Failed);
        assert_eq!(host.ledger.total_for(host.executor.as_ref()), 0);
    }

    #[tokio::test]
    async fn abandon_releases_a_started_connector() {
        let host = host(8);
        let c = Connector::builder("http").build().expect("connector");
        c.attach(host.clone()).expect("attach");
        c.start().await.expect("start");

        c.abandon();
        assert_eq!(c.state(), LifecycleState::Stopped);
        assert_eq!(host.ledger.total_for(host.executor.as_ref()), 0);
    }
}
