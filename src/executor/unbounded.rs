//! # Pool without a known limit.
//!
//! [`UnboundedPool`] spawns every job straight onto the ambient Tokio runtime.
//! It reports no capacity, so the ledger admits every lease against it.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::executor::{Executor, ExecutorRef};
use crate::ids::ExecutorId;

/// Worker pool whose maximum thread count is unknown.
pub struct UnboundedPool {
    id: ExecutorId,
}

impl UnboundedPool {
    /// Creates a new pool with the given label.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            id: ExecutorId::new(name),
        }
    }

    /// Creates the pool and returns it as a shared handle (`Arc<dyn Executor>`).
    pub fn arc(name: impl Into<Arc<str>>) -> ExecutorRef {
        Arc::new(Self::new(name))
    }
}

impl Executor for UnboundedPool {
    fn id(&self) -> &ExecutorId {
        &self.id
    }

    fn execute(&self, job: BoxFuture<'static, ()>) {
        tokio::spawn(job);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::capacity_of;
    use futures::FutureExt;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn runs_jobs_and_reports_unknown_capacity() {
        let pool = UnboundedPool::new("elastic");
        assert_eq!(capacity_of(&pool), None);

        let (tx, rx) = oneshot::channel();
        pool.execute(
            async move {
                let _ = tx.send(42);
            }
            .boxed(),
        );
        assert_eq!(rx.await.ok(), Some(42));
    }
}
