//! Cooperative cancellation for long-running operations.
//!
//! Long-running operations (batch prediction, benchmarking, cross
//! validation) accept a [`CancellationSignal`] and check it at safe points
//! between items. Cancellation is advisory: in-flight work runs to its next
//! checkpoint and partial results are discarded by the caller.

use crate::error::MediaButlerError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag, cheap to clone across tasks
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(Cancelled)` when cancellation was requested, for use
    /// with the `?` operator at checkpoints.
    pub fn checkpoint(&self) -> Result<(), MediaButlerError> {
        if self.is_cancelled() {
            Err(MediaButlerError::Cancelled)
        } else {
            Ok(())
        }
    }
}
