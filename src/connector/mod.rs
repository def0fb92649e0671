//! # Connectors and their thread requirement.
//!
//! - [`ConnectorConfig`], [`required_threads`] - requirement model (acceptors + selectors + reserved)
//! - [`Connector`], [`ConnectorBuilder`] - lifecycle that leases threads before opening its endpoint
//! - [`Endpoint`], [`EndpointContext`], [`EndpointError`] - I/O boundary behind a connector

mod config;
#[allow(clippy::module_inception)]
mod connector;
mod endpoint;
mod host;

pub use config::{ConnectorConfig, required_threads};
pub use connector::{Connector, ConnectorBuilder};
pub use endpoint::{Endpoint, EndpointContext, EndpointError};

pub(crate) use host::Host;
