// src/dag/context.rs

//! Shared execution context handed to every task function.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::dag::concurrent_map::ConcurrentMap;
use crate::engine::AbortHandle;
use crate::types::{AnyValue, TaskName};

/// Shared handle to the single global output value of a run.
///
/// The caller keeps one clone and hands another to the task manager; whichever
/// task writes it is a convention of the caller, the scheduler does not
/// arbitrate between writers.
#[derive(Clone, Default)]
pub struct OutputSlot {
    inner: Arc<Mutex<Option<AnyValue>>>,
}

impl OutputSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, replacing whatever was there.
    pub fn set<T: Any + Send + Sync>(&self, value: T) {
        *self.lock() = Some(Arc::new(value));
    }

    /// Read the value back as `T`, if one is set and it has that type.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.lock().clone()?.downcast::<T>().ok()
    }

    /// Remove the raw value from the slot.
    pub fn take(&self) -> Option<AnyValue> {
        self.lock().take()
    }

    pub fn is_set(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<AnyValue>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for OutputSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSlot")
            .field("is_set", &self.is_set())
            .finish()
    }
}

/// Execution environment shared by every task of one run.
///
/// - `global_input` is read-only.
/// - `global_output` is a shared slot (see [`OutputSlot`]).
/// - `task_output` maps a task name to the value that task produced; each
///   entry is written by the task of that name and readable by any other.
pub struct TaskContext {
    global_input: AnyValue,
    global_output: OutputSlot,
    task_output: ConcurrentMap<TaskName, AnyValue>,
    abort: AbortHandle,
}

impl TaskContext {
    pub fn new(global_input: AnyValue, global_output: OutputSlot) -> Self {
        Self::with_abort(global_input, global_output, AbortHandle::new())
    }

    pub fn with_abort(global_input: AnyValue, global_output: OutputSlot, abort: AbortHandle) -> Self {
        Self {
            global_input,
            global_output,
            task_output: ConcurrentMap::new(),
            abort,
        }
    }

    /// The global input, downcast to `T`.
    pub fn input<T: Any>(&self) -> Option<&T> {
        self.global_input.downcast_ref::<T>()
    }

    pub fn raw_input(&self) -> &AnyValue {
        &self.global_input
    }

    pub fn global_output(&self) -> &OutputSlot {
        &self.global_output
    }

    /// Record the output of task `task`.
    pub fn set_output<T: Any + Send + Sync>(&self, task: &str, value: T) {
        self.task_output.insert(task.to_string(), Arc::new(value));
    }

    /// Output of task `task`, downcast to `T`.
    ///
    /// Returns `None` if the task has not produced an output yet or produced
    /// a value of another type.
    pub fn output<T: Any + Send + Sync>(&self, task: &str) -> Option<Arc<T>> {
        self.task_output.get(&task.to_string())?.downcast::<T>().ok()
    }

    pub fn has_output(&self, task: &str) -> bool {
        self.task_output.contains_key(&task.to_string())
    }

    pub fn task_outputs(&self) -> &ConcurrentMap<TaskName, AnyValue> {
        &self.task_output
    }

    /// Whether the run this context belongs to has been asked to stop.
    ///
    /// Long task bodies may poll this and return early.
    pub fn is_cancelled(&self) -> bool {
        self.abort.is_aborted()
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("global_output", &self.global_output)
            .field("task_outputs", &self.task_output.len())
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
