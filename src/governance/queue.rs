//! FIFO request queue with bounded concurrency and per-slot spacing.
//!
//! Each of the `max_concurrent_requests` slots is a permit on a fair tokio
//! semaphore, so waiting callers are served in arrival order. When an
//! operation finishes (either way, or because the caller's future was
//! dropped) its permit is handed to a scheduled release task that holds it
//! for `request_spacing` before returning it, pacing outbound calls
//! independently of the rate governor.
//!
//! Operations run in the caller's task. [`RequestQueue::shutdown`] fails
//! every caller still waiting for a slot.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::{GemgateError, Result};

/// Concurrency and pacing settings for [`RequestQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Operations allowed to run at once. Default: 2.
    pub max_concurrent_requests: usize,
    /// Delay after an operation completes before its slot is reused. Default: 4 s.
    pub request_spacing: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 2,
            request_spacing: Duration::from_millis(4000),
        }
    }
}

impl QueueConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_concurrent_requests(mut self, n: usize) -> Self {
        self.max_concurrent_requests = n;
        self
    }

    pub fn request_spacing(mut self, spacing: Duration) -> Self {
        self.request_spacing = spacing;
        self
    }
}

/// Decrements the wrapped counter when dropped.
struct CountGuard(Arc<AtomicUsize>);

impl CountGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for CountGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Slot held by a running operation. Dropping it keeps the slot occupied
/// for the spacing delay before the permit goes back to the semaphore.
struct SpacedPermit {
    permit: Option<OwnedSemaphorePermit>,
    spacing: Duration,
}

impl Drop for SpacedPermit {
    fn drop(&mut self) {
        let Some(permit) = self.permit.take() else {
            return;
        };
        if self.spacing.is_zero() {
            return;
        }
        // Outside a runtime there is nothing to schedule on; release now.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let spacing = self.spacing;
            handle.spawn(async move {
                tokio::time::sleep(spacing).await;
                drop(permit);
            });
        }
    }
}

/// FIFO executor that bounds concurrent operations and spaces slot reuse.
pub struct RequestQueue {
    config: QueueConfig,
    slots: Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
}

impl RequestQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            config,
            pending: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Run `operation` once a slot is free, in FIFO order.
    ///
    /// Must be called from within a tokio runtime; the spacing release is a
    /// spawned task.
    pub async fn enqueue<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let permit = {
            let _waiting = CountGuard::new(&self.pending);
            Arc::clone(&self.slots)
                .acquire_owned()
                .await
                .map_err(|_| GemgateError::QueueShutdown)?
        };
        let _slot = SpacedPermit {
            permit: Some(permit),
            spacing: self.config.request_spacing,
        };

        let _running = CountGuard::new(&self.in_flight);
        operation().await
    }

    /// Callers waiting for a slot.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Operations currently executing.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Stop accepting work. Waiting and future callers get
    /// [`GemgateError::QueueShutdown`]; running operations finish normally.
    pub fn shutdown(&self) {
        debug!(pending = self.pending(), "request queue shutting down");
        self.slots.close();
    }

    pub fn is_shutdown(&self) -> bool {
        self.slots.is_closed()
    }
}
