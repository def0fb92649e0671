//! # Diagnostic fan-out from the server bus to user subscribers.
//!
//! [`SubscriberSet`] is fed by the server listener. Each subscriber owns a
//! bounded queue drained by its own worker task, so a slow sink never holds up
//! a start, a rollback or another sink.
//!
//! ```text
//! server listener ─► emit(event)
//!                      ├─► worker "log"     [queue] ─► on_event ─┐
//!                      └─► worker "metrics" [queue] ─► on_event ─┤
//!                                                                ▼
//!                                  panic ─► SubscriberPanicked on the bus
//! ```
//!
//! ## Rules
//! - Per-subscriber FIFO; no ordering across subscribers.
//! - `emit()` never waits. A full queue drops the event for that subscriber only.
//! - Overflow is reported once per burst: the first dropped event publishes
//!   `SubscriberOverflow`, later drops stay silent until a delivery succeeds again.
//! - Overflow reports never trigger further overflow reports.
//!
//! **Warning**: handlers run under `AssertUnwindSafe`; a panic while holding a lock
//! can leave the subscriber's own state inconsistent.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

/// Queue, worker and drop counter of one subscriber.
struct Worker {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
    handle: JoinHandle<()>,
    /// Events dropped since the last successful delivery.
    dropped: AtomicUsize,
}

impl Worker {
    fn spawn(sub: Arc<dyn Subscribe>, bus: Bus) -> Self {
        let name = sub.name();
        let (sender, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));

        let handle = tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                let handled = std::panic::AssertUnwindSafe(sub.on_event(ev.as_ref()))
                    .catch_unwind()
                    .await;
                if let Err(payload) = handled {
                    bus.publish(Event::subscriber_panicked(name, panic_message(payload.as_ref())));
                }
            }
        });
        Self {
            name,
            sender,
            handle,
            dropped: AtomicUsize::new(0),
        }
    }

    /// Queues the event; returns the drop reason when this drop opens a new burst.
    fn offer(&self, event: &Arc<Event>) -> Option<&'static str> {
        let reason = match self.sender.try_send(Arc::clone(event)) {
            Ok(()) => {
                self.dropped.store(0, Ordering::Relaxed);
                return None;
            }
            Err(mpsc::error::TrySendError::Full(_)) => "full",
            Err(mpsc::error::TrySendError::Closed(_)) => "closed",
        };
        (self.dropped.fetch_add(1, Ordering::Relaxed) == 0).then_some(reason)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Fan-out coordinator for the server's subscribers.
pub struct SubscriberSet {
    workers: Vec<Worker>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber. Panics and overflows are reported on `bus`.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let workers = subs
            .into_iter()
            .map(|sub| Worker::spawn(sub, bus.clone()))
            .collect();
        Self { workers, bus }
    }

    /// Hands the event to every subscriber queue without waiting.
    pub fn emit(&self, event: Event) {
        let is_overflow_evt = event.is_subscriber_overflow();
        let event = Arc::new(event);

        for worker in &self.workers {
            if let Some(reason) = worker.offer(&event) {
                if !is_overflow_evt {
                    self.bus
                        .publish(Event::subscriber_overflow(worker.name, reason));
                }
            }
        }
    }

    /// Closes every queue and waits until the workers have drained them.
    pub async fn shutdown(self) {
        let handles: Vec<JoinHandle<()>> = self.workers.into_iter().map(|w| w.handle).collect();
        for h in handles {
            let _ = h.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    use crate::events::EventKind;

    struct Collect(Arc<Mutex<Vec<EventKind>>>);

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().expect("lock").push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "collect"
        }
    }

    struct Explode;

    #[async_trait]
    impl Subscribe for Explode {
        async fn on_event(&self, _ev: &Event) {
            panic!("boom");
        }

        fn name(&self) -> &'static str {
            "explode"
        }
    }

    /// Holds every event until the gate is opened; one slot of queue.
    struct Gated(Arc<Notify>);

    #[async_trait]
    impl Subscribe for Gated {
        async fn on_event(&self, _ev: &Event) {
            self.0.notified().await;
        }

        fn name(&self) -> &'static str {
            "gated"
        }

        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn delivers_in_order_and_drains_on_shutdown() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let set = SubscriberSet::new(vec![Arc::new(Collect(Arc::clone(&seen)))], Bus::new(8));

        set.emit(Event::new(EventKind::ServerStarting));
        set.emit(Event::new(EventKind::ServerStarted));
        set.shutdown().await;

        assert_eq!(
            *seen.lock().expect("lock"),
            vec![EventKind::ServerStarting, EventKind::ServerStarted]
        );
    }

    #[tokio::test]
    async fn panics_are_reported_on_the_bus() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Explode)], bus);

        set.emit(Event::new(EventKind::ServerStopped));
        let ev = rx.recv().await.expect("panic event");
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.component.as_deref(), Some("explode"));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
        set.shutdown().await;
    }

    #[tokio::test]
    async fn a_burst_of_drops_is_reported_once() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let gate = Arc::new(Notify::new());
        let set = SubscriberSet::new(vec![Arc::new(Gated(Arc::clone(&gate)))], bus);

        // The worker has not run yet: the first event fills the queue, the rest are dropped.
        set.emit(Event::new(EventKind::ServerStarting));
        set.emit(Event::new(EventKind::LeaseGranted));
        set.emit(Event::new(EventKind::LeaseGranted));
        set.emit(Event::new(EventKind::ServerStarted));

        gate.notify_one();
        set.shutdown().await;

        let mut overflows = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.is_subscriber_overflow() {
                overflows.push(ev);
            }
        }
        assert_eq!(overflows.len(), 1);
        assert_eq!(overflows[0].component.as_deref(), Some("gated"));
        assert_eq!(overflows[0].reason.as_deref(), Some("subscriber=gated reason=full"));
    }
}
