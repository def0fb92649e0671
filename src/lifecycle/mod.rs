//! # Generic lifecycle contract.
//!
//! Connectors, the server and unrelated collaborators all expose the same
//! minimal capability: [`Lifecycle`] (`start`, `stop`, `is_started`).
//! Shared state handling lives in a composed [`StateCell`], not in a base type.
//!
//! - [`Lifecycle`] - async start/stop contract; `stop` is idempotent for every implementer
//! - [`LifecycleState`] - observable state
//! - [`StateCell`], [`StopFrom`] - state machine embedded by implementers
//! - [`Running`] - session wrapper: started on construction, stopped on close

mod running;
mod state;

use async_trait::async_trait;

use crate::error::RuntimeError;

pub use running::Running;
pub use state::{LifecycleState, StateCell, StopFrom};

/// # Startable and stoppable component.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use threadvisor::{Lifecycle, RuntimeError, StateCell, StopFrom};
///
/// struct Session { state: StateCell }
///
/// #[async_trait]
/// impl Lifecycle for Session {
///     fn name(&self) -> &str { "session" }
///
///     async fn start(&self) -> Result<(), RuntimeError> {
///         self.state.begin_start(self.name())?;
///         self.state.finish_start(true);
///         Ok(())
///     }
///
///     async fn stop(&self) -> Result<(), RuntimeError> {
///         if self.state.begin_stop() != StopFrom::Idle {
///             self.state.finish_stop();
///         }
///         Ok(())
///     }
///
///     fn is_started(&self) -> bool { self.state.is_started() }
/// }
/// ```
#[async_trait]
pub trait Lifecycle: Send + Sync + 'static {
    /// Returns a stable, human-readable component name.
    fn name(&self) -> &str;

    /// Starts the component.
    async fn start(&self) -> Result<(), RuntimeError>;

    /// Stops the component; calling it on a component that is not running is a no-op.
    async fn stop(&self) -> Result<(), RuntimeError>;

    /// True while the component is running.
    fn is_started(&self) -> bool;
}
