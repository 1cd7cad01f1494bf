// src/exec/pool.rs

//! Pluggable worker pool abstraction.
//!
//! The task manager talks to a `WorkerPool` instead of raw threads. This
//! makes it easy to swap in a deterministic pool in tests while keeping the
//! production implementation in [`ThreadPool`].

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use crate::errors::{Result, TaskflowError};
use crate::exec::worker::Worker;
use crate::types::Work;

/// Trait abstracting how dispatched work is executed.
pub trait WorkerPool: Send {
    /// Start a pool of `worker_count` workers, ready to accept work.
    fn start(worker_count: usize) -> Result<Self>
    where
        Self: Sized;

    /// Submit `work` for asynchronous execution.
    ///
    /// No back-pressure: the call never waits for the work to start.
    fn post(&self, work: Work) -> Result<()>;

    /// Number of workers in the pool.
    fn size(&self) -> usize;

    /// Stop accepting work and wait for queued work to drain.
    fn shutdown(&mut self) {}
}

/// Fixed-size pool of OS-thread workers with round-robin assignment.
pub struct ThreadPool {
    workers: Vec<Worker>,
    cursor: AtomicUsize,
}

impl ThreadPool {
    fn next_worker(&self) -> &Worker {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        &self.workers[idx]
    }
}

impl WorkerPool for ThreadPool {
    fn start(worker_count: usize) -> Result<Self> {
        if worker_count == 0 {
            return Err(TaskflowError::ConfigError(
                "worker count must be >= 1 (got 0)".to_string(),
            ));
        }

        let workers = (0..worker_count)
            .map(Worker::spawn)
            .collect::<Result<Vec<_>>>()?;

        debug!(workers = workers.len(), "thread pool started");

        Ok(Self {
            workers,
            cursor: AtomicUsize::new(0),
        })
    }

    fn post(&self, work: Work) -> Result<()> {
        if self.workers.is_empty() {
            return Err(TaskflowError::WorkerUnavailable(
                "thread pool has been shut down".to_string(),
            ));
        }
        self.next_worker().post(work)
    }

    fn size(&self) -> usize {
        self.workers.len()
    }

    fn shutdown(&mut self) {
        for worker in &mut self.workers {
            worker.shutdown();
        }
        self.workers.clear();
        debug!("thread pool shut down");
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("workers", &self.workers.len())
            .finish_non_exhaustive()
    }
}
