// src/exec/mod.rs

//! Work execution layer.
//!
//! - [`worker`] owns a single OS thread draining an unbounded channel.
//! - [`pool`] provides the `WorkerPool` trait and the production
//!   `ThreadPool` the task manager uses by default, and which tests can
//!   replace with a deterministic implementation.

pub mod pool;
pub mod worker;

pub use pool::{ThreadPool, WorkerPool};
pub use worker::Worker;
