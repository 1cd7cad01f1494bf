// src/exec/worker.rs

//! A single worker thread with an unbounded work channel.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, error, info};

use crate::errors::{Result, TaskflowError};
use crate::types::Work;

/// Owns one OS thread that executes posted closures in submission order.
///
/// Dropping the worker closes its channel and joins the thread after the
/// already queued work has drained.
#[derive(Debug)]
pub struct Worker {
    id: usize,
    tx: Option<Sender<Work>>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn the worker thread immediately.
    pub fn spawn(id: usize) -> Result<Self> {
        let (tx, rx) = unbounded::<Work>();

        let handle = thread::Builder::new()
            .name(format!("taskflow-worker-{id}"))
            .spawn(move || worker_loop(id, rx))?;

        Ok(Self {
            id,
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Queue `work` for execution on this worker. Never blocks.
    pub fn post(&self, work: Work) -> Result<()> {
        let tx = self.tx.as_ref().ok_or_else(|| {
            TaskflowError::WorkerUnavailable(format!("worker {} is shut down", self.id))
        })?;

        tx.send(work).map_err(|_| {
            TaskflowError::WorkerUnavailable(format!("worker {} thread has exited", self.id))
        })
    }

    /// Close the channel and wait for the thread to finish queued work.
    pub fn shutdown(&mut self) {
        // Dropping the sender ends the `recv` loop.
        self.tx.take();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!(worker = self.id, "worker thread panicked");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(id: usize, rx: Receiver<Work>) {
    debug!(worker = id, "worker started");

    while let Ok(work) = rx.recv() {
        // Keep the thread alive if a unit of work unwinds.
        if catch_unwind(AssertUnwindSafe(work)).is_err() {
            error!(worker = id, "unit of work panicked");
        }
    }

    info!(worker = id, "worker finished (channel closed)");
}
