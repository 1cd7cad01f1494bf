// src/dag/task.rs

//! Task nodes of the graph.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use serde::{Deserialize, Serialize};

use crate::dag::context::TaskContext;
use crate::types::TaskName;

/// Executable body of a task.
pub type TaskFn = Arc<dyn Fn(&TaskContext) + Send + Sync>;

/// One entry of a graph description, as deserialized from config.
///
/// ```json
/// { "task_name": "b", "dependencies": ["a"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub task_name: TaskName,
    #[serde(default)]
    pub dependencies: Vec<TaskName>,
}

impl Job {
    pub fn new(task_name: impl Into<TaskName>) -> Self {
        Self {
            task_name: task_name.into(),
            dependencies: Vec::new(),
        }
    }

    pub fn after(mut self, dep: impl Into<TaskName>) -> Self {
        self.dependencies.push(dep.into());
        self
    }
}

/// A named unit of work inside a [`Graph`](crate::dag::Graph).
///
/// Tasks are owned by the graph. `dependencies` are weak back-references
/// used only to wire the topology; they are set once, after every task of
/// the graph exists.
pub struct Task {
    name: TaskName,
    job: Option<TaskFn>,
    dependencies: OnceLock<Vec<Weak<Task>>>,
}

impl Task {
    pub(crate) fn new(name: TaskName, job: Option<TaskFn>) -> Self {
        Self {
            name,
            job,
            dependencies: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn job(&self) -> Option<&TaskFn> {
        self.job.as_ref()
    }

    pub fn has_job(&self) -> bool {
        self.job.is_some()
    }

    /// Number of resolved direct prerequisites.
    pub fn dependency_count(&self) -> usize {
        self.dependencies.get().map_or(0, Vec::len)
    }

    /// Resolved prerequisites that are still alive.
    pub fn dependencies(&self) -> Vec<Arc<Task>> {
        self.dependencies
            .get()
            .map(|deps| deps.iter().filter_map(Weak::upgrade).collect())
            .unwrap_or_default()
    }

    /// Wire the prerequisites. Later calls are ignored.
    pub(crate) fn set_dependencies(&self, deps: Vec<Weak<Task>>) {
        let _ = self.dependencies.set(deps);
    }

    /// Run the task body, if there is one.
    pub(crate) fn execute(&self, ctx: &TaskContext) {
        if let Some(job) = &self.job {
            job(ctx);
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let deps: Vec<TaskName> = self
            .dependencies()
            .iter()
            .map(|t| t.name.clone())
            .collect();
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("has_job", &self.job.is_some())
            .field("dependencies", &deps)
            .finish()
    }
}
