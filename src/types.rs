// src/types.rs

//! Small shared types used across the graph, the scheduler and the workers.

use std::any::Any;
use std::sync::Arc;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Type-erased value stored as global input or as a task output.
///
/// Readers downcast to the concrete type they expect; see
/// [`TaskContext::output`](crate::dag::TaskContext::output).
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// A zero-argument unit of work submitted to a worker.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Per-run state of a task, as observed from outside the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting on at least one unfinished prerequisite.
    Blocked,
    /// All prerequisites finished; not yet claimed.
    Ready,
    /// Claimed by the scheduler and queued to a worker.
    Claimed,
    /// A worker is executing the task body.
    Running,
    /// The completion closure ran to the end.
    Finished,
    /// The task body panicked; its dependents stay blocked.
    Failed,
}
