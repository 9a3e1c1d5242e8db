use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable stop signal shared between a running search and its caller.
///
/// Once tripped the tuner schedules no further combinations and returns the
/// best candidate found so far.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
