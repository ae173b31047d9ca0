//! Execution context
//!
//! Carried explicitly through every execution instead of living in
//! thread-scoped state.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Per-request execution state
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Request ID for tracing
    request_id: Uuid,
    /// Cancels async executions sharing this context
    cancel: CancellationToken,
    /// Readers currently open under this context
    open_readers: Arc<AtomicUsize>,
    started_at: Instant,
}

impl ExecutionContext {
    /// Create a new context with a fresh request id
    pub fn new() -> Self {
        Self::with_cancellation(CancellationToken::new())
    }

    /// Create a context driven by an existing cancellation token
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            cancel,
            open_readers: Arc::new(AtomicUsize::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// The token observed by async executions
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel every pending execution under this context
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Number of row sources currently open
    pub fn open_readers(&self) -> usize {
        self.open_readers.load(Ordering::Acquire)
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }

    /// Account for one open row source until the lease is dropped
    pub fn lease(&self) -> ReaderLease {
        self.open_readers.fetch_add(1, Ordering::AcqRel);
        ReaderLease {
            open_readers: Arc::clone(&self.open_readers),
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases its reader slot on drop, on every exit path
#[derive(Debug)]
pub struct ReaderLease {
    open_readers: Arc<AtomicUsize>,
}

impl Drop for ReaderLease {
    fn drop(&mut self) {
        self.open_readers.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_released_on_drop() {
        let ctx = ExecutionContext::new();
        {
            let _a = ctx.lease();
            let _b = ctx.clone().lease();
            assert_eq!(ctx.open_readers(), 2);
        }
        assert_eq!(ctx.open_readers(), 0);
    }

    #[test]
    fn test_lease_released_on_panic() {
        let ctx = ExecutionContext::new();
        let inner = ctx.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _lease = inner.lease();
            panic!("row source blew up");
        }));
        assert!(result.is_err());
        assert_eq!(ctx.open_readers(), 0);
    }

    #[test]
    fn test_cancel_shared_by_clones() {
        let ctx = ExecutionContext::new();
        let clone = ctx.clone();
        assert_eq!(ctx.request_id(), clone.request_id());
        clone.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_distinct_request_ids() {
        assert_ne!(ExecutionContext::new().request_id(), ExecutionContext::new().request_id());
    }
}
