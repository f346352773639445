//! Shutdown coordination.
//!
//! A single latched flag: once triggered it stays triggered, so a task that
//! starts waiting after the trigger still stops.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// Handle to the process-wide shutdown latch. Clones share the latch.
#[derive(Debug, Clone)]
pub struct Shutdown {
    latch: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (latch, _) = watch::channel(false);
        Self {
            latch: Arc::new(latch),
        }
    }

    /// Latch the shutdown flag and wake every waiter. Idempotent.
    pub fn trigger(&self) {
        if !self.latch.send_replace(true) {
            tracing::info!("Shutdown triggered");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.latch.borrow()
    }

    /// Future resolving once shutdown has been triggered.
    pub fn signaled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.latch.subscribe();
        async move {
            if rx.wait_for(|&triggered| triggered).await.is_err() {
                // every handle dropped without triggering
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
