//! # threadvisor
//!
//! **Threadvisor** is thread-capacity admission control for connector-based servers.
//!
//! A server runs several connectors (listening endpoints) on one shared worker pool.
//! Every connector needs a fixed number of threads of that pool for its own machinery:
//! acceptors, selectors and a reserve. Threadvisor accounts for those demands in a
//! ledger and refuses to start a server whose connectors would starve the pool.
//! Startup is all-or-nothing: on the first failure every connector already started
//! is stopped again and the ledger is left exactly as it was.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Connector   │   │  Connector   │   │  Connector   │
//!     │ a + s + r    │   │ a + s + r    │   │ own pool     │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Server (orchestrator)                                            │
//! │  - default executor (BoundedPool / UnboundedPool / custom)        │
//! │  - Ledger (per-executor demand, keyed by component identity)      │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  │               │
//!   lease(a+s+r)       lease(a+s+r)       no lease             │
//!        │                  │             (dedicated)          │
//!        ▼                  ▼                                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │               (capacity: ServerConfig::bus_capacity)              │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                          ┌─────────────────┐
//!                          │ server listener │
//!                          └────────┬────────┘
//!                                   ▼
//!                             SubscriberSet
//!                         ┌─────────┼─────────┐
//!                         ▼         ▼         ▼
//!                      worker1   worker2   workerN
//! ```
//!
//! ### Admission rule
//! ```text
//! capacity_of(executor)
//!   ├─ None     ─► admit (unknown capacity is never checked)
//!   └─ Some(c)  ─► current + required <= c ? admit : CapacityExceeded{ required: current + required, available: c }
//! ```
//!
//! ## Features
//! | Area              | Description                                                      | Key types / traits                          |
//! |-------------------|------------------------------------------------------------------|---------------------------------------------|
//! | **Executors**     | Worker pools that may report a thread bound.                     | [`Executor`], [`BoundedPool`], [`UnboundedPool`] |
//! | **Budget**        | Per-executor thread accounting with atomic check-and-record.     | [`Ledger`]                                  |
//! | **Connectors**    | Thread requirement model, lease-on-start, release-on-stop.       | [`Connector`], [`ConnectorConfig`], [`Endpoint`] |
//! | **Server**        | Ordered start, reverse rollback, ordered stop.                   | [`Server`], [`ServerBuilder`]               |
//! | **Lifecycle**     | Shared state machine and a session wrapper.                      | [`Lifecycle`], [`LifecycleState`], [`Running`] |
//! | **Subscriber API**| Observe lease, capacity and lifecycle events.                    | [`Subscribe`]                               |
//! | **Errors**        | Typed configuration, capacity, lifecycle and runtime errors.     | [`CapacityExceeded`], [`RuntimeError`]      |
//! | **Configuration** | Server-wide settings.                                            | [`ServerConfig`]                            |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], a subscriber that writes events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use threadvisor::{BoundedPool, Connector, Lifecycle, Server, ServerConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn threadvisor::Subscribe>> = vec![Arc::new(threadvisor::LogWriter::default())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn threadvisor::Subscribe>> = Vec::new();
//!
//!     let server = Server::builder(BoundedPool::arc("server", 6)?)
//!         .with_config(ServerConfig::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     // 1 + 1 + 1 = 3 threads each; two of them fit exactly in 6.
//!     server.add_connector(Connector::builder("http").build()?)?;
//!     server.add_connector(Connector::builder("admin").build()?)?;
//!
//!     server.start().await?;
//!     assert_eq!(server.demand(), 6);
//!
//!     server.shutdown().await?;
//!     assert_eq!(server.demand(), 0);
//!     Ok(())
//! }
//! ```
mod budget;
mod connector;
mod error;
mod events;
mod executor;
mod ids;
mod lifecycle;
mod server;
mod subscribers;

// ---- Public re-exports ----

pub use budget::Ledger;
pub use connector::{
    Connector, ConnectorBuilder, ConnectorConfig, Endpoint, EndpointContext, EndpointError,
    required_threads,
};
pub use error::{CapacityExceeded, ConfigError, LifecycleError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use executor::{BoundedPool, Executor, ExecutorRef, UnboundedPool, capacity_of};
pub use ids::{ComponentId, ExecutorId};
pub use lifecycle::{Lifecycle, LifecycleState, Running, StateCell, StopFrom};
pub use server::{Server, ServerBuilder, ServerConfig};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a built-in subscriber writing events through `tracing`.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
