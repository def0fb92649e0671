//! # Fixed-size worker pool.
//!
//! [`BoundedPool`] runs jobs on the ambient Tokio runtime and caps concurrency
//! with a semaphore holding `max_threads` permits, one per worker slot.
//!
//! ```text
//! execute(job) ──► tokio::spawn ──► acquire permit ──► job.await ──► release permit
//! ```
//!
//! Because the limit is known, leases on a `BoundedPool` are checked by the ledger.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Semaphore;

use crate::error::ConfigError;
use crate::executor::{Executor, ExecutorRef};
use crate::ids::ExecutorId;

/// Worker pool with a known maximum number of threads.
pub struct BoundedPool {
    id: ExecutorId,
    max_threads: usize,
    permits: Arc<Semaphore>,
}

impl BoundedPool {
    /// Creates a pool allowing at most `max_threads` concurrent jobs.
    ///
    /// Returns [`ConfigError::EmptyPool`] when `max_threads == 0`.
    pub fn new(name: impl Into<Arc<str>>, max_threads: usize) -> Result<Self, ConfigError> {
        let name = name.into();
        if max_threads == 0 {
            return Err(ConfigError::EmptyPool {
                name: name.to_string(),
            });
        }
        Ok(Self {
            id: ExecutorId::new(name),
            max_threads,
            permits: Arc::new(Semaphore::new(max_threads)),
        })
    }

    /// Creates the pool and returns it as a shared handle (`Arc<dyn Executor>`).
    pub fn arc(name: impl Into<Arc<str>>, max_threads: usize) -> Result<ExecutorRef, ConfigError> {
        Ok(Arc::new(Self::new(name, max_threads)?))
    }

    /// Number of worker slots not currently running a job.
    pub fn idle_threads(&self) -> usize {
        self.permits.available_permits()
    }
}

impl Executor for BoundedPool {
    fn id(&self) -> &ExecutorId {
        &self.id
    }

    fn max_threads(&self) -> Option<usize> {
        Some(self.max_threads)
    }

    /// Spawns the job on the current Tokio runtime; must be called from within one.
    fn execute(&self, job: BoxFuture<'static, ()>) {
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            job.await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures::FutureExt;
    use tokio::sync::mpsc;

    use crate::executor::capacity_of;

    #[test]
    fn zero_threads_is_rejected() {
        let err = BoundedPool::new("empty", 0).err();
        assert_eq!(
            err,
            Some(ConfigError::EmptyPool {
                name: "empty".into()
            })
        );
    }

    #[test]
    fn reports_known_capacity() {
        let pool = BoundedPool::new("server", 3).expect("pool");
        assert_eq!(capacity_of(&pool), Some(3));
        assert_eq!(pool.idle_threads(), 3);
    }

    #[tokio::test]
    async fn never_runs_more_jobs_than_threads() {
        let pool = BoundedPool::new("workers", 2).expect("pool");
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::channel::<()>(8);

        for _ in 0..6 {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            let tx = tx.clone();
            pool.execute(
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    let _ = tx.send(()).await;
                }
                .boxed(),
            );
        }
        drop(tx);

        let mut done = 0;
        while rx.recv().await.is_some() {
            done += 1;
        }
        assert_eq!(done, 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
