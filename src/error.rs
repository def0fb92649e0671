//! Error types used by the thread budget and the component lifecycle.
//!
//! This module defines the failure taxonomy:
//!
//! - [`ConfigError`]: invalid connector or pool configuration, raised at construction.
//! - [`CapacityExceeded`]: a lease would overflow a bounded executor; aborts server startup.
//! - [`LifecycleError`]: invalid state transition or attachment (a programmer-usage fault).
//! - [`RuntimeError`]: umbrella returned by [`Lifecycle::start`](crate::Lifecycle::start)
//!   and [`Lifecycle::stop`](crate::Lifecycle::stop).
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::time::Duration;
use thiserror::Error;

use crate::ids::{ComponentId, ExecutorId};
use crate::lifecycle::LifecycleState;

/// # Invalid configuration detected at construction time.
///
/// Never deferred to `start()`: an invalid config never produces a component.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A connector needs at least one acceptor thread.
    #[error("connector requires at least one acceptor")]
    NoAcceptors,

    /// A connector needs at least one selector thread.
    #[error("connector requires at least one selector")]
    NoSelectors,

    /// A bounded pool must allow at least one thread.
    #[error("bounded pool '{name}' must allow at least one thread")]
    EmptyPool {
        /// Pool label.
        name: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use threadvisor::ConfigError;
    ///
    /// assert_eq!(ConfigError::NoAcceptors.as_label(), "config_no_acceptors");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::NoAcceptors => "config_no_acceptors",
            ConfigError::NoSelectors => "config_no_selectors",
            ConfigError::EmptyPool { .. } => "config_empty_pool",
        }
    }
}

/// # A lease would overflow the known capacity of an executor.
///
/// `required` is the total demand the executor would carry had the lease been
/// granted (existing leases plus the attempted one), `available` is the executor
/// capacity.
///
/// # Example
/// ```
/// use threadvisor::{CapacityExceeded, ComponentId, ExecutorId};
///
/// let err = CapacityExceeded {
///     required: 7,
///     available: 3,
///     owner: ComponentId::new("http"),
///     executor: ExecutorId::new("server"),
/// };
/// assert!(err.to_string().starts_with("insufficient threads: required=7, available=3 for executor server#"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("insufficient threads: required={required}, available={available} for executor {executor}")]
pub struct CapacityExceeded {
    /// Total thread slots the executor would need.
    pub required: usize,
    /// Known capacity of the executor.
    pub available: usize,
    /// Component whose lease attempt failed.
    pub owner: ComponentId,
    /// Executor the lease was requested from.
    pub executor: ExecutorId,
}

impl CapacityExceeded {
    /// Number of thread slots missing for the lease to fit.
    pub fn shortfall(&self) -> usize {
        self.required.saturating_sub(self.available)
    }
}

/// # Invalid use of the lifecycle contract.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// The requested action is not allowed from the current state.
    #[error("cannot {action} '{component}' while {state:?}")]
    InvalidTransition {
        /// Component label.
        component: String,
        /// State observed when the action was attempted.
        state: LifecycleState,
        /// Attempted action.
        action: &'static str,
    },

    /// The connector already belongs to a server.
    #[error("connector '{component}' is already attached to a server")]
    AlreadyAttached {
        /// Component label.
        component: String,
    },

    /// The connector shares the server executor but was never added to a server.
    #[error("connector '{component}' has no dedicated executor and is not attached to a server")]
    Detached {
        /// Component label.
        component: String,
    },
}

/// # Errors produced while starting or stopping components.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum RuntimeError {
    /// Thread budget admission failed.
    #[error(transparent)]
    Capacity(#[from] CapacityExceeded),

    /// Lifecycle contract was violated.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The I/O endpoint behind a connector failed to open or close.
    #[error("endpoint of '{component}' failed: {error}")]
    Endpoint {
        /// Component label.
        component: String,
        /// The underlying error message.
        error: String,
    },

    /// Closing an endpoint did not finish within the configured grace.
    #[error("stopping '{component}' exceeded {grace:?}")]
    StopTimeout {
        /// Component label.
        component: String,
        /// The configured grace duration.
        grace: Duration,
    },

    /// Startup was cancelled externally; already started components were rolled back.
    #[error("start aborted after {started} component(s) started")]
    StartAborted {
        /// How many components had started (and were rolled back).
        started: usize,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use threadvisor::RuntimeError;
    ///
    /// let err = RuntimeError::StartAborted { started: 2 };
    /// assert_eq!(err.as_label(), "runtime_start_aborted");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Capacity(_) => "runtime_capacity_exceeded",
            RuntimeError::Lifecycle(_) => "runtime_lifecycle",
            RuntimeError::Endpoint { .. } => "runtime_endpoint_failed",
            RuntimeError::StopTimeout { .. } => "runtime_stop_timeout",
            RuntimeError::StartAborted { .. } => "runtime_start_aborted",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::Capacity(e) => format!(
                "owner={} required={} available={} executor={}",
                e.owner, e.required, e.available, e.executor
            ),
            RuntimeError::Lifecycle(e) => e.to_string(),
            RuntimeError::Endpoint { component, error } => {
                format!("component={component} error: {error}")
            }
            RuntimeError::StopTimeout { component, grace } => {
                format!("component={component} grace={grace:?}")
            }
            RuntimeError::StartAborted { started } => format!("aborted; rolled back={started}"),
        }
    }

    /// Returns the capacity failure, if that is what this error is.
    pub fn as_capacity(&self) -> Option<&CapacityExceeded> {
        match self {
            RuntimeError::Capacity(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_message_is_human_readable() {
        let executor = ExecutorId::new("server");
        let err = CapacityExceeded {
            required: 7,
            available: 3,
            owner: ComponentId::new("http"),
            executor: executor.clone(),
        };
        assert_eq!(
            err.to_string(),
            format!("insufficient threads: required=7, available=3 for executor {executor}")
        );
        assert_eq!(err.shortfall(), 4);
    }

    #[test]
    fn runtime_error_wraps_capacity_transparently() {
        let cap = CapacityExceeded {
            required: 6,
            available: 4,
            owner: ComponentId::new("c"),
            executor: ExecutorId::new("e"),
        };
        let err = RuntimeError::from(cap.clone());
        assert_eq!(err.to_string(), cap.to_string());
        assert_eq!(err.as_capacity(), Some(&cap));
        assert_eq!(err.as_label(), "runtime_capacity_exceeded");
    }

    #[test]
    fn lifecycle_error_names_state_and_action() {
        let err = LifecycleError::InvalidTransition {
            component: "http#1".into(),
            state: LifecycleState::Started,
            action: "start",
        };
        assert_eq!(err.to_string(), "cannot start 'http#1' while Started");
    }
}
