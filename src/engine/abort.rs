// src/engine/abort.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Run-wide stop request shared between the caller, the scheduling loop and
/// task bodies.
///
/// Aborting does not interrupt a running task body. The scheduler stops
/// dispatching new tasks, waits for the ones already handed to workers, and
/// returns [`TaskflowError::Cancelled`](crate::errors::TaskflowError::Cancelled).
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
