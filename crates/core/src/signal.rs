//! Cooperative stop signal
//!
//! Writers observe the signal at safe points (between records or at batch
//! boundaries). Raising it never aborts an in-flight batch; the current
//! batch is flushed and the writer closes cleanly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag
///
/// Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    /// Create a signal in the not-stopped state
    pub fn new() -> Self {
        StopSignal::default()
    }

    /// Raise the signal
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether the signal has been raised
    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
