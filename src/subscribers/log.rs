//! # LogWriter: forwards events to `tracing`
//!
//! A subscriber that turns every [`Event`] into a structured `tracing` record.
//! Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see them.
//!
//! ## Levels
//! - `error`: capacity exceeded, server start failed
//! - `warn`: low headroom, connector failed, rollback errors, subscriber trouble
//! - `info`: connector and server lifecycle
//! - `debug`: lease accounting

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let component = e.component.as_deref().unwrap_or("-");
        let executor = e.executor.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::CapacityExceeded => {
                error!(
                    component,
                    executor,
                    required = e.required,
                    available = e.available,
                    "insufficient threads"
                );
            }
            EventKind::CapacityLow => {
                warn!(
                    component,
                    executor,
                    total = e.total,
                    available = e.available,
                    "executor has no spare threads left"
                );
            }
            EventKind::LeaseGranted => {
                debug!(component, executor, required = e.required, total = e.total, "lease granted");
            }
            EventKind::LeaseReleased => {
                debug!(component, executor, released = e.required, total = e.total, "lease released");
            }
            EventKind::ConnectorStarting => {
                info!(component, executor, required = e.required, "connector starting");
            }
            EventKind::ConnectorStarted => info!(component, executor, "connector started"),
            EventKind::ConnectorFailed => warn!(component, reason, "connector failed to start"),
            EventKind::ConnectorStopped if e.reason.is_some() => {
                warn!(component, reason, "connector stopped with error");
            }
            EventKind::ConnectorStopped => info!(component, "connector stopped"),
            EventKind::ServerStarting => info!(component, executor, "server starting"),
            EventKind::ServerStarted => info!(component, total = e.total, "server started"),
            EventKind::ServerFailed => error!(component, reason, "server failed to start"),
            EventKind::ServerStopped => info!(component, "server stopped"),
            EventKind::StartAborted => warn!(component, "server start aborted"),
            EventKind::RollbackStarted => warn!(component, reason, "rolling back started connectors"),
            EventKind::RollbackFailed => warn!(component, reason, "rollback stop failed (suppressed)"),
            EventKind::SubscriberOverflow => warn!(subscriber = component, reason, "subscriber dropped event"),
            EventKind::SubscriberPanicked => warn!(subscriber = component, reason, "subscriber panicked"),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
