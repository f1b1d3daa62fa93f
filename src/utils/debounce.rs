//! Debounce wrapper for interactive callers
//!
//! The resolution service itself never debounces; UI callers that fire a
//! request per keystroke wrap the entrypoint with a [`Debouncer`] so only
//! the call that survives the quiescence window runs. Superseded calls
//! resolve to `None` instead of hanging.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Trailing-edge debouncer
///
/// Each call claims a generation number and waits out the delay; if a
/// newer call arrived in the meantime, the older one yields `None`
/// without running its operation.
#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Run `operation` once input has been quiet for the configured
    /// delay; `None` when a newer call superseded this one.
    pub async fn debounce<F, Fut, T>(&self, operation: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let claimed = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;

        if self.generation.load(Ordering::SeqCst) != claimed {
            return None;
        }
        Some(operation().await)
    }
}
