//! # Runtime events emitted by the ledger, connectors and the server.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Budget events**: lease accounting on an executor (granted, released, rejected, low headroom)
//! - **Connector events**: per-connector lifecycle (starting, started, failed, stopped)
//! - **Server events**: orchestration and rollback
//! - **Subscriber events**: delivery problems inside the fan-out
//!
//! The [`Event`] struct carries additional metadata such as timestamps, component and
//! executor labels, thread counts and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use threadvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::CapacityExceeded)
//!     .with_component("http#1")
//!     .with_executor("server#1")
//!     .with_threads(7, 3);
//!
//! assert_eq!(ev.kind, EventKind::CapacityExceeded);
//! assert_eq!(ev.component.as_deref(), Some("http#1"));
//! assert_eq!(ev.required, Some(7));
//! assert_eq!(ev.available, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `component`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `component`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Budget events ===
    /// A lease was recorded on an executor.
    ///
    /// Sets:
    /// - `component`: lease owner
    /// - `executor`: executor label
    /// - `required`: threads leased by this owner
    /// - `total`: executor demand after the lease
    /// - `available`: executor capacity (absent when unknown)
    LeaseGranted,

    /// A lease was removed from an executor.
    ///
    /// Sets:
    /// - `component`: lease owner
    /// - `executor`: executor label
    /// - `required`: threads returned
    /// - `total`: executor demand after the release
    LeaseReleased,

    /// A lease was rejected because it would overflow the executor.
    ///
    /// Sets:
    /// - `component`: lease owner
    /// - `executor`: executor label
    /// - `required`: total demand attempted
    /// - `available`: executor capacity
    CapacityExceeded,

    /// A lease was granted but leaves fewer spare threads than configured.
    ///
    /// Sets:
    /// - `component`: lease owner
    /// - `executor`: executor label
    /// - `total`: executor demand after the lease
    /// - `available`: executor capacity
    CapacityLow,

    // === Connector events ===
    /// Connector began its start sequence.
    ///
    /// Sets:
    /// - `component`: connector label
    /// - `executor`: effective executor label
    /// - `required`: connector thread requirement
    ConnectorStarting,

    /// Connector reached `Started`.
    ///
    /// Sets:
    /// - `component`: connector label
    /// - `executor`: effective executor label
    ConnectorStarted,

    /// Connector start failed (lease denial or endpoint error).
    ///
    /// Sets:
    /// - `component`: connector label
    /// - `reason`: failure message
    ConnectorFailed,

    /// Connector reached `Stopped`.
    ///
    /// Sets:
    /// - `component`: connector label
    /// - `reason`: close failure message (only if closing failed)
    ConnectorStopped,

    // === Server events ===
    /// Server began starting its connectors.
    ///
    /// Sets:
    /// - `component`: server label
    /// - `executor`: default executor label
    ServerStarting,

    /// All connectors started.
    ///
    /// Sets:
    /// - `component`: server label
    /// - `total`: demand on the default executor
    ServerStarted,

    /// Server start failed; rollback has completed.
    ///
    /// Sets:
    /// - `component`: server label
    /// - `reason`: root-cause error message
    ServerFailed,

    /// All connectors stopped.
    ///
    /// Sets:
    /// - `component`: server label
    ServerStopped,

    /// Start was cancelled externally between connectors.
    ///
    /// Sets:
    /// - `component`: server label
    StartAborted,

    /// Rollback of already-started connectors is beginning.
    ///
    /// Sets:
    /// - `component`: server label
    /// - `reason`: root-cause error message
    RollbackStarted,

    /// Stopping a connector during rollback failed (error suppressed).
    ///
    /// Sets:
    /// - `component`: connector label
    /// - `reason`: secondary error message
    RollbackFailed,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Component label (connector, server or subscriber).
    pub component: Option<Arc<str>>,
    /// Executor label.
    pub executor: Option<Arc<str>>,
    /// Thread slots required (meaning depends on kind).
    pub required: Option<usize>,
    /// Known executor capacity.
    pub available: Option<usize>,
    /// Executor demand after the accounted change.
    pub total: Option<usize>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            component: None,
            executor: None,
            required: None,
            available: None,
            total: None,
            reason: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a component label.
    #[inline]
    pub fn with_component(mut self, component: impl Into<Arc<str>>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Attaches an executor label.
    #[inline]
    pub fn with_executor(mut self, executor: impl Into<Arc<str>>) -> Self {
        self.executor = Some(executor.into());
        self
    }

    /// Attaches a required count and a known capacity.
    #[inline]
    pub fn with_threads(mut self, required: usize, available: usize) -> Self {
        self.required = Some(required);
        self.available = Some(available);
        self
    }

    /// Attaches a required count only.
    #[inline]
    pub fn with_required(mut self, required: usize) -> Self {
        self.required = Some(required);
        self
    }

    /// Attaches a capacity, if known.
    #[inline]
    pub fn with_available(mut self, available: Option<usize>) -> Self {
        self.available = available;
        self
    }

    /// Attaches the executor demand after the change.
    #[inline]
    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_component(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_component(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    /// True for events that report a failure.
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::CapacityExceeded
                | EventKind::ConnectorFailed
                | EventKind::ServerFailed
                | EventKind::RollbackFailed
                | EventKind::SubscriberPanicked
        )
    }
}
