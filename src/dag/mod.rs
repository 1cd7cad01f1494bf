// src/dag/mod.rs

//! Task graph representation.
//!
//! - [`task`] holds the task node type and the deserialized [`Job`] record.
//! - [`graph`] builds the immutable topology and runs the static cycle check.
//! - [`context`] is the shared environment passed to every task function.
//! - [`registry`] maps task names to executable functions.
//! - [`concurrent_map`] is the sharded map backing per-task outputs.

pub mod concurrent_map;
pub mod context;
pub mod graph;
pub mod registry;
pub mod task;

pub use concurrent_map::ConcurrentMap;
pub use context::{OutputSlot, TaskContext};
pub use graph::Graph;
pub use registry::FunctionRegistry;
pub use task::{Job, Task, TaskFn};
