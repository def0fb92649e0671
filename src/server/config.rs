//! # Server configuration.
//!
//! Provides [`ServerConfig`] centralized settings for a [`Server`](crate::Server).
//!
//! ## Sentinel values
//! - `stop_grace = 0s` → no bound on closing a connector endpoint
//! - `low_headroom = 0` → no low-headroom warning
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

/// Global configuration for a server.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `stop_grace`: Maximum wait for one connector endpoint to close (`0s` = unbounded)
/// - `low_headroom`: Warn when a granted lease leaves fewer spare threads than this
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages
    /// skip older items.
    pub bus_capacity: usize,

    /// Maximum time a connector endpoint may take to close.
    ///
    /// On timeout the connector still returns its lease and reaches `Stopped`;
    /// `stop()` reports [`RuntimeError::StopTimeout`](crate::RuntimeError::StopTimeout).
    pub stop_grace: Duration,

    /// Spare-thread threshold for the `CapacityLow` warning.
    ///
    /// The default of 1 warns when the shared pool is fully booked by connectors
    /// and has no thread left for actual work.
    pub low_headroom: usize,
}

impl ServerConfig {
    /// Returns the endpoint close bound as an `Option`.
    ///
    /// - `None` → wait indefinitely
    /// - `Some(d)` → close is abandoned after `d`
    #[inline]
    pub fn stop_grace_limit(&self) -> Option<Duration> {
        if self.stop_grace == Duration::ZERO {
            None
        } else {
            Some(self.stop_grace)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for ServerConfig {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `stop_grace = 30s`
    /// - `low_headroom = 1`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            stop_grace: Duration::from_secs(30),
            low_headroom: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_map_to_none() {
        let cfg = ServerConfig {
            bus_capacity: 0,
            stop_grace: Duration::ZERO,
            low_headroom: 0,
        };
        assert_eq!(cfg.stop_grace_limit(), None);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.stop_grace_limit(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.bus_capacity_clamped(), 1024);
        assert_eq!(cfg.low_headroom, 1);
    }
}
