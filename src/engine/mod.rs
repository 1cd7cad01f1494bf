// src/engine/mod.rs

//! Scheduling engine.
//!
//! This module ties together:
//! - the immutable task graph
//! - the live per-run state (dependency counters, dispatch cells)
//! - the worker pool that executes task bodies
//! - the run-wide abort flag
//!
//! [`TaskManager`] is the entry point; `run_state` holds the lock-free
//! per-task counters it shares with the workers.

pub mod abort;
pub mod manager;
pub(crate) mod run_state;

pub use abort::AbortHandle;
pub use manager::{DEFAULT_WORKERS, RunSummary, TaskManager};
