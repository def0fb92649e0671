use std::sync::Arc;

use crate::{
    budget::Ledger,
    connector::Host,
    events::Bus,
    executor::ExecutorRef,
    ids::ComponentId,
    subscribers::{Subscribe, SubscriberSet},
};

use super::{config::ServerConfig, server::Server};

/// Builder for constructing a [`Server`].
pub struct ServerBuilder {
    name: Arc<str>,
    executor: ExecutorRef,
    cfg: ServerConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl ServerBuilder {
    /// Creates a new builder around the default shared executor.
    pub fn new(executor: ExecutorRef) -> Self {
        Self {
            name: Arc::from("server"),
            executor,
            cfg: ServerConfig::default(),
            subscribers: Vec::new(),
        }
    }

    /// Sets the server label used in events and errors.
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, cfg: ServerConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive capacity, lifecycle and rollback events through
    /// dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the server.
    ///
    /// Initializes the event bus, the ledger, the subscriber workers and the
    /// event listener; must be called from within a Tokio runtime.
    pub fn build(self) -> Server {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let ledger = Arc::new(Ledger::new(bus.clone()).with_low_headroom(self.cfg.low_headroom));

        let host = Host {
            executor: self.executor,
            ledger,
            bus,
            stop_grace: self.cfg.stop_grace_limit(),
        };
        Server::new_internal(ComponentId::new(self.name), self.cfg, host, subs)
    }
}
