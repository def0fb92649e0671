//! # I/O boundary of a connector.
//!
//! An [`Endpoint`] is whatever actually listens for and serves connections
//! (socket binding, protocol handling, TLS). The connector only opens it after
//! its thread lease is granted and closes it before returning the lease.

use async_trait::async_trait;
use thiserror::Error;

use crate::connector::ConnectorConfig;
use crate::executor::ExecutorRef;
use crate::ids::ComponentId;

/// Failure reported by an endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct EndpointError {
    /// The underlying error message.
    pub message: String,
}

impl EndpointError {
    /// Creates an error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for EndpointError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// What an endpoint gets to work with once its connector holds a lease.
#[derive(Clone)]
pub struct EndpointContext {
    /// Owning connector.
    pub connector: ComponentId,
    /// Executor the endpoint must run its acceptors and selectors on.
    pub executor: ExecutorRef,
    /// Thread plan reserved for this connector.
    pub plan: ConnectorConfig,
    /// True when `executor` is the server's shared pool.
    pub shared: bool,
}

/// # Listening component behind a connector.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use threadvisor::{Endpoint, EndpointContext, EndpointError};
///
/// struct Noop;
///
/// #[async_trait]
/// impl Endpoint for Noop {
///     async fn open(&self, _ctx: EndpointContext) -> Result<(), EndpointError> { Ok(()) }
///     async fn close(&self) -> Result<(), EndpointError> { Ok(()) }
/// }
/// ```
#[async_trait]
pub trait Endpoint: Send + Sync + 'static {
    /// Starts serving on the leased threads.
    async fn open(&self, ctx: EndpointContext) -> Result<(), EndpointError>;

    /// Stops serving; must be safe to call once after a successful `open`.
    async fn close(&self) -> Result<(), EndpointError>;
}
