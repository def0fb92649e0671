//! # Thread budget ledger.
//!
//! The [`Ledger`] is the single source of truth for aggregate thread demand on
//! every executor shared between components. Each executor identity maps to an
//! entry holding the active leases (`owner → required threads`) and their sum.
//!
//! ## Architecture
//! ```text
//! lease(owner, executor, n)
//!     │  capacity = capacity_of(executor)          (sampled once)
//!     ▼
//! ┌──────────── lock ──────────────────────────────────────────────┐
//! │ current   = total(executor) - previous lease of owner (if any) │
//! │ attempted = current + n                                        │
//! │ capacity known && attempted > capacity ─► reject, no change    │
//! │ otherwise ─► record lease, total = attempted                   │
//! └────────────────────────────────────────────────────────────────┘
//!     │
//!     └─► publish LeaseGranted / CapacityExceeded (/ CapacityLow)
//! ```
//!
//! ## Rules
//! - Invariant: `total_for(E) <= capacity(E)` whenever the capacity is known.
//! - Check and record happen under one lock; no caller ever decides on a stale total.
//! - At most one lease per `(owner, executor)`; leasing again replaces the amount.
//! - A rejected lease leaves the ledger unchanged.
//! - `release` for an owner without a lease is a no-op.
//! - Unknown capacity admits every lease.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::CapacityExceeded;
use crate::events::{Bus, Event, EventKind};
use crate::executor::{Executor, capacity_of};
use crate::ids::{ComponentId, ExecutorId};

/// Active leases on one executor.
#[derive(Debug, Default)]
struct Entry {
    leases: HashMap<ComponentId, usize>,
    total: usize,
}

/// Per-executor account of active thread leases.
#[derive(Debug)]
pub struct Ledger {
    entries: Mutex<HashMap<ExecutorId, Entry>>,
    bus: Bus,
    low_headroom: usize,
}

impl Ledger {
    /// Creates an empty ledger reporting to `bus`, with the low-headroom warning disabled.
    pub fn new(bus: Bus) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            bus,
            low_headroom: 0,
        }
    }

    /// Publishes [`EventKind::CapacityLow`] when a granted lease leaves fewer than
    /// `threads` spare slots on a bounded executor (`0` disables the warning).
    pub fn with_low_headroom(mut self, threads: usize) -> Self {
        self.low_headroom = threads;
        self
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ExecutorId, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a lease of `required` threads by `owner` on `executor`.
    ///
    /// Fails with [`CapacityExceeded`] when the executor capacity is known and the
    /// total demand including this lease would exceed it. The error carries the
    /// total attempted demand, the capacity, the owner and the executor.
    pub fn lease(
        &self,
        owner: &ComponentId,
        executor: &dyn Executor,
        required: usize,
    ) -> Result<(), CapacityExceeded> {
        let capacity = capacity_of(executor);
        let id = executor.id();

        let mut entries = self.entries();
        let current = entries.get(id).map_or(0, |entry| {
            let previous = entry.leases.get(owner).copied().unwrap_or(0);
            entry.total - previous
        });
        let attempted = current.saturating_add(required);

        if let Some(available) = capacity {
            if attempted > available {
                drop(entries);
                let err = CapacityExceeded {
                    required: attempted,
                    available,
                    owner: owner.clone(),
                    executor: id.clone(),
                };
                self.bus.publish(
                    Event::new(EventKind::CapacityExceeded)
                        .with_component(owner.label())
                        .with_executor(id.to_string())
                        .with_threads(attempted, available)
                        .with_reason(err.to_string()),
                );
                return Err(err);
            }
        }

        let entry = entries.entry(id.clone()).or_default();
        entry.leases.insert(owner.clone(), required);
        entry.total = attempted;
        drop(entries);

        self.bus.publish(
            Event::new(EventKind::LeaseGranted)
                .with_component(owner.label())
                .with_executor(id.to_string())
                .with_required(required)
                .with_available(capacity)
                .with_total(attempted),
        );

        if let Some(available) = capacity {
            if available - attempted < self.low_headroom {
                self.bus.publish(
                    Event::new(EventKind::CapacityLow)
                        .with_component(owner.label())
                        .with_executor(id.to_string())
                        .with_available(Some(available))
                        .with_total(attempted),
                );
            }
        }
        Ok(())
    }

    /// Removes the lease held by `owner` on `executor`.
    ///
    /// Returns the released thread count, or `None` when the owner held no lease
    /// (in which case nothing changes).
    pub fn release(&self, owner: &ComponentId, executor: &dyn Executor) -> Option<usize> {
        let id = executor.id();

        let mut entries = self.entries();
        let entry = entries.get_mut(id)?;
        let released = entry.leases.remove(owner)?;
        entry.total -= released;
        let total = entry.total;
        if entry.leases.is_empty() {
            entries.remove(id);
        }
        drop(entries);

        self.bus.publish(
            Event::new(EventKind::LeaseReleased)
                .with_component(owner.label())
                .with_executor(id.to_string())
                .with_required(released)
                .with_total(total),
        );
        Some(released)
    }

    /// Returns the current aggregate demand on `executor` (0 when untracked).
    pub fn total_for(&self, executor: &dyn Executor) -> usize {
        self.entries()
            .get(executor.id())
            .map_or(0, |entry| entry.total)
    }

    /// Returns the active leases on `executor`, ordered by owner creation.
    pub fn leases_for(&self, executor: &dyn Executor) -> Vec<(ComponentId, usize)> {
        let mut leases: Vec<(ComponentId, usize)> = self
            .entries()
            .get(executor.id())
            .map(|entry| {
                entry
                    .leases
                    .iter()
                    .map(|(owner, n)| (owner.clone(), *n))
                    .collect()
            })
            .unwrap_or_default();
        leases.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        leases
    }

    /// True if no executor carries any lease.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
