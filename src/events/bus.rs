//! # Server-wide event bus.
//!
//! Every component of one server publishes on the same [`Bus`]. The ledger
//! reports leases and rejections, connectors report their lifecycle, and the
//! server reports startup, rollback and shutdown. A single listener owned by the
//! server forwards what it receives to the [`SubscriberSet`](crate::SubscriberSet).
//!
//! ```text
//!   Ledger     ──┐
//!   Connector  ──┼──► Bus ──► server listener ──► SubscriberSet
//!   Server     ──┘
//! ```
//!
//! The capacity comes from `ServerConfig::bus_capacity`. A listener that falls
//! behind skips the oldest events (`RecvError::Lagged`); publishing never waits
//! and never fails, even with no receiver attached.

use tokio::sync::broadcast;

use super::event::Event;

/// Cloneable handle to one server's broadcast channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus holding up to `capacity` undelivered events (at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes to every current receiver; dropped silently when there is none.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn subscriber_sees_events_published_after_subscribe() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::ServerStarting));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::ServerStarted));

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::ServerStarted);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn lagging_receiver_skips_the_oldest_events() {
        let bus = Bus::new(2);
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::ServerStarting));
        bus.publish(Event::new(EventKind::LeaseGranted));
        bus.publish(Event::new(EventKind::ServerStarted));

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(rx.recv().await.expect("event").kind, EventKind::LeaseGranted);
    }
}
