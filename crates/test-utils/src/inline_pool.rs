use std::sync::atomic::{AtomicUsize, Ordering};

use taskflow::errors::Result;
use taskflow::exec::WorkerPool;
use taskflow::types::Work;
use tracing::trace;

/// A worker pool that runs each unit of work on the calling thread, inside
/// `post`.
///
/// With this pool a whole run is deterministic: the scheduling thread
/// executes every task itself, in dispatch order.
#[derive(Debug, Default)]
pub struct InlinePool {
    posted: AtomicUsize,
}

impl WorkerPool for InlinePool {
    fn start(_worker_count: usize) -> Result<Self> {
        Ok(Self::default())
    }

    fn post(&self, work: Work) -> Result<()> {
        let n = self.posted.fetch_add(1, Ordering::SeqCst);
        trace!(n, "running posted work inline");
        work();
        Ok(())
    }

    fn size(&self) -> usize {
        1
    }
}
