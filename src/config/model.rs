// src/config/model.rs

use serde::{Deserialize, Serialize};

use crate::dag::Job;

/// Graph description as read from a JSON or TOML file.
///
/// ```json
/// {
///   "config": { "workers": 4, "strict": false },
///   "tasks": [
///     { "task_name": "a", "dependencies": [] },
///     { "task_name": "b", "dependencies": ["a"] }
///   ]
/// }
/// ```
///
/// or, equivalently:
///
/// ```toml
/// [config]
/// workers = 4
///
/// [[tasks]]
/// task_name = "a"
///
/// [[tasks]]
/// task_name = "b"
/// dependencies = ["a"]
/// ```
///
/// The `config` section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawGraphFile {
    #[serde(default)]
    pub config: RunSection,

    /// Jobs in declaration order. Order matters: it is the sweep order.
    #[serde(default)]
    pub tasks: Vec<Job>,
}

/// `config` section: run options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSection {
    /// Number of worker threads.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Reject unknown, self-referencing and duplicate task names instead of
    /// tolerating them.
    #[serde(default)]
    pub strict: bool,
}

fn default_workers() -> usize {
    crate::engine::DEFAULT_WORKERS
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            strict: false,
        }
    }
}

/// A validated graph description.
///
/// Only obtainable through `TryFrom<RawGraphFile>` (see `config::validate`).
#[derive(Debug, Clone)]
pub struct GraphFile {
    config: RunSection,
    tasks: Vec<Job>,
}

impl GraphFile {
    pub(crate) fn new_unchecked(config: RunSection, tasks: Vec<Job>) -> Self {
        Self { config, tasks }
    }

    pub fn config(&self) -> &RunSection {
        &self.config
    }

    pub fn tasks(&self) -> &[Job] {
        &self.tasks
    }
}
