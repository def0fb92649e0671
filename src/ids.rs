//! # Process-unique identities for executors and lifecycle components.
//!
//! The budget ledger keys its entries by [`ExecutorId`] and its leases by
//! [`ComponentId`]. Both are minted from global monotonic counters, so two
//! instances are never equal even when they share a name or a capacity.
//!
//! ## Rules
//! - Equality and hashing use the sequence number only; the name is a label.
//! - Cloning an id is cheap (`Arc<str>` name).
//! - `Display` renders `name#seq`, e.g. `http#3`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Global sequence counter for executor identities.
static EXECUTOR_SEQ: AtomicU64 = AtomicU64::new(1);

/// Global sequence counter for component identities.
static COMPONENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Identity of a worker pool.
#[derive(Clone, Debug)]
pub struct ExecutorId {
    seq: u64,
    name: Arc<str>,
}

impl ExecutorId {
    /// Mints a fresh identity with the given label.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            seq: EXECUTOR_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            name: name.into(),
        }
    }

    /// Returns the human-readable label.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the unique sequence number.
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl PartialEq for ExecutorId {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for ExecutorId {}

impl Hash for ExecutorId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.seq.hash(state);
    }
}

impl fmt::Display for ExecutorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.seq)
    }
}

/// Identity of a lifecycle component (connector, server) that may own leases.
#[derive(Clone, Debug)]
pub struct ComponentId {
    seq: u64,
    name: Arc<str>,
}

impl ComponentId {
    /// Mints a fresh identity with the given label.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            seq: COMPONENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            name: name.into(),
        }
    }

    /// Returns the human-readable label.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the unique sequence number.
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub(crate) fn label(&self) -> Arc<str> {
        Arc::from(self.to_string())
    }
}

impl PartialEq for ComponentId {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for ComponentId {}

impl Hash for ComponentId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.seq.hash(state);
    }
}

impl PartialOrd for ComponentId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComponentId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.seq.cmp(&other.seq)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_distinct_identity() {
        let a = ExecutorId::new("pool");
        let b = ExecutorId::new("pool");
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
        assert!(b.seq() > a.seq());
    }

    #[test]
    fn display_includes_name_and_seq() {
        let id = ComponentId::new("http");
        assert_eq!(id.to_string(), format!("http#{}", id.seq()));
        assert_eq!(&*id.label(), id.to_string().as_str());
    }

    #[test]
    fn sequences_are_never_zero() {
        assert!(ExecutorId::new("server").seq() >= 1);
        assert!(ComponentId::new("http").seq() >= 1);
        assert_ne!(ExecutorId::new("server").to_string(), "server#0");
    }
}
