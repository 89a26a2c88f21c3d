//! Cancellation tokens for blocking reads.
//!
//! A token is shared between the transport (which trips it when the caller
//! gives up) and a blocked read (which polls it while parked). Cancelling
//! never affects background work already in flight; it only releases the
//! waiter with an interrupted error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Caller-side cancellation for blocking operations.
///
/// Cloning is cheap; clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that can never fire. Used by transports without a
    /// cancellation path of their own.
    pub fn never() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
