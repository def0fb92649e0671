//! # Connector thread requirement.
//!
//! A connector needs a fixed number of worker slots to make progress:
//! acceptor threads, selector threads, and reserved threads for internal
//! housekeeping. The requirement is their plain sum.
//!
//! ## Sentinel values
//! - `acceptors = 0`, `selectors = 0` are configuration errors.
//! - `reserved = 0` is valid (no housekeeping slot).

use crate::error::ConfigError;

/// Computes a connector's thread requirement.
///
/// # Example
/// ```
/// use threadvisor::required_threads;
///
/// assert_eq!(required_threads(2, 4, 1), 7);
/// ```
#[inline]
pub const fn required_threads(acceptors: usize, selectors: usize, reserved: usize) -> usize {
    acceptors + selectors + reserved
}

/// Thread plan of a connector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectorConfig {
    /// Threads accepting new connections (`>= 1`).
    pub acceptors: usize,
    /// Threads running I/O selection (`>= 1`).
    pub selectors: usize,
    /// Housekeeping threads (default 1).
    pub reserved: usize,
}

impl ConnectorConfig {
    /// Creates a plan with the default single reserved thread.
    pub fn new(acceptors: usize, selectors: usize) -> Self {
        Self {
            acceptors,
            selectors,
            ..Self::default()
        }
    }

    /// Total worker slots this plan needs.
    #[inline]
    pub fn required_threads(&self) -> usize {
        required_threads(self.acceptors, self.selectors, self.reserved)
    }

    /// Checks the plan; called once when a connector is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.acceptors == 0 {
            return Err(ConfigError::NoAcceptors);
        }
        if self.selectors == 0 {
            return Err(ConfigError::NoSelectors);
        }
        Ok(())
    }
}

impl Default for ConnectorConfig {
    /// One acceptor, one selector, one reserved thread.
    fn default() -> Self {
        Self {
            acceptors: 1,
            selectors: 1,
            reserved: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirement_is_the_sum() {
        assert_eq!(ConnectorConfig::new(2, 4).required_threads(), 7);
        assert_eq!(ConnectorConfig::default().required_threads(), 3);
        let no_reserve = ConnectorConfig {
            reserved: 0,
            ..ConnectorConfig::new(1, 1)
        };
        assert_eq!(no_reserve.required_threads(), 2);
        assert!(no_reserve.validate().is_ok());
    }

    #[test]
    fn zero_acceptors_or_selectors_is_rejected() {
        assert_eq!(
            ConnectorConfig::new(0, 1).validate(),
            Err(ConfigError::NoAcceptors)
        );
        assert_eq!(
            ConnectorConfig::new(1, 0).validate(),
            Err(ConfigError::NoSelectors)
        );
    }
}
