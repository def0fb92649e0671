use std::sync::Arc;
use std::time::Duration;

use crate::budget::Ledger;
use crate::events::{Bus, Event};
use crate::executor::ExecutorRef;

/// Server-provided context a connector is attached to.
#[derive(Clone)]
pub(crate) struct Host {
    /// Default shared executor.
    pub executor: ExecutorRef,
    /// Ledger accounting for `executor`.
    pub ledger: Arc<Ledger>,
    /// Diagnostic sink.
    pub bus: Bus,
    /// Bound on closing an endpoint (`None` = unbounded).
    pub stop_grace: Option<Duration>,
}

impl Host {
    #[inline]
    pub fn publish(&self, ev: Event) {
        self.bus.publish(ev);
    }
}
