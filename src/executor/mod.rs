//! # Worker pools and their capacity query.
//!
//! An [`Executor`] is anything that can run work on a pool of worker threads.
//! The budget ledger only needs two facts about it: a stable identity and,
//! when the pool exposes one, a bounded maximum thread count.
//!
//! ## Contents
//! - [`Executor`] - trait implemented by pools
//! - [`ExecutorRef`] - shared handle (`Arc<dyn Executor>`)
//! - [`capacity_of`] - the capacity query used by the ledger
//! - [`BoundedPool`] - fixed-size pool (known capacity)
//! - [`UnboundedPool`] - pool with no known limit (capacity unknown)
//!
//! ## Capacity rules
//! ```text
//! capacity_of(pool) ─┬─► Some(n) → leases on the pool are checked against n
//!                    └─► None    → leases are always admitted
//! ```
//! Unknown capacity is exempt from checking.

mod bounded;
mod unbounded;

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::ids::ExecutorId;

pub use bounded::BoundedPool;
pub use unbounded::UnboundedPool;

/// Shared handle to an executor.
pub type ExecutorRef = Arc<dyn Executor>;

/// # Pool of worker threads.
///
/// Implementors must return the same [`ExecutorId`] for their whole lifetime and
/// a capacity that stays stable while leases are being evaluated.
///
/// # Example
/// ```
/// use futures::future::BoxFuture;
/// use threadvisor::{Executor, ExecutorId, capacity_of};
///
/// struct Inline { id: ExecutorId }
///
/// impl Executor for Inline {
///     fn id(&self) -> &ExecutorId { &self.id }
///     fn execute(&self, job: BoxFuture<'static, ()>) { futures::executor::block_on(job) }
/// }
///
/// let pool = Inline { id: ExecutorId::new("inline") };
/// assert_eq!(capacity_of(&pool), None);
/// ```
pub trait Executor: Send + Sync + 'static {
    /// Returns the pool identity.
    fn id(&self) -> &ExecutorId;

    /// Returns the bounded maximum thread count, if the pool exposes one.
    fn max_threads(&self) -> Option<usize> {
        None
    }

    /// Runs a unit of work on the pool.
    fn execute(&self, job: BoxFuture<'static, ()>);
}

/// Reports the capacity of an executor: `Some(n)` when bounded, `None` when unknown.
#[inline]
pub fn capacity_of(executor: &dyn Executor) -> Option<usize> {
    executor.max_threads()
}
