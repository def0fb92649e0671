//! # Session wrapper that ties a component's lifecycle to a value.
//!
//! [`Running`] starts its component on construction and stops it on
//! [`Running::close`]. A wrapper dropped without `close` schedules `stop()` on
//! the current Tokio runtime, if there is one.

use std::ops::Deref;
use std::sync::Arc;

use crate::error::RuntimeError;
use crate::lifecycle::Lifecycle;

/// A component that is started for as long as this value is open.
pub struct Running<L: Lifecycle + ?Sized> {
    inner: Arc<L>,
    closed: bool,
}

impl<L: Lifecycle + ?Sized> Running<L> {
    /// Starts `inner` and wraps it.
    pub async fn start(inner: Arc<L>) -> Result<Self, RuntimeError> {
        inner.start().await?;
        Ok(Self {
            inner,
            closed: false,
        })
    }

    /// Stops the wrapped component.
    pub async fn close(mut self) -> Result<(), RuntimeError> {
        self.closed = true;
        self.inner.stop().await
    }

    /// Returns the shared handle to the wrapped component.
    pub fn handle(&self) -> Arc<L> {
        Arc::clone(&self.inner)
    }
}

impl<L: Lifecycle + ?Sized> Deref for Running<L> {
    type Target = L;

    fn deref(&self) -> &L {
        &self.inner
    }
}

impl<L: Lifecycle + ?Sized> Drop for Running<L> {
    fn drop(&mut self) {
        if self.closed || !self.inner.is_started() {
            return;
        }
        if let Ok(rt) = tokio::runtime::Handle::try_current() {
            let inner = Arc::clone(&self.inner);
            rt.spawn(async move {
                let _ = inner.stop().await;
            });
        }
    }
}
