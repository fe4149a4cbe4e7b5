//! Ownership of the single in-flight long-running operation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Cancellation flag shared between a coordinator and the work it started.
#[derive(Debug, Clone, Default)]
pub struct OperationHandle {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

impl OperationHandle {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Starting an operation cancels whichever one was current before it, so only
/// the most recently started operation is expected to finish.
///
/// The CLI runs one operation per process and only uses `begin`/`finish`.
/// A long-lived host (a UI shell or a signal handler thread) shares one
/// coordinator behind an `Arc` and calls `cancel_current` from its own thread.
#[derive(Debug, Default)]
pub struct OperationCoordinator {
    next_id: AtomicU64,
    current: Mutex<Option<OperationHandle>>,
}

impl OperationCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> OperationHandle {
        let handle = OperationHandle {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            cancelled: Arc::new(AtomicBool::new(false)),
        };
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.replace(handle.clone()) {
            log::info!("operation {} superseded by {}", previous.id, handle.id);
            previous.cancel();
        }
        handle
    }

    /// Cancels the current operation, if any.
    pub fn cancel_current(&self) {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = current.as_ref() {
            handle.cancel();
        }
    }

    /// Clears `handle` if it is still the current operation.
    pub fn finish(&self, handle: &OperationHandle) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().is_some_and(|active| active.id == handle.id) {
            *current = None;
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<OperationHandle> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
