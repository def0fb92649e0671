//! Server orchestration: configuration, builder and the all-or-nothing start.
//!
//! Internal modules:
//! - [`config`]: server-wide settings;
//! - [`builder`]: wires bus, ledger, subscribers and listener;
//! - [`server`]: ordered connector start/stop with rollback.

mod builder;
mod config;
#[allow(clippy::module_inception)]
mod server;

pub use builder::ServerBuilder;
pub use config::ServerConfig;
pub use server::Server;
