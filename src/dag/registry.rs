// src/dag/registry.rs

//! Name -> function registry supplied by the embedding application.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::dag::context::TaskContext;
use crate::dag::task::TaskFn;
use crate::types::TaskName;

#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<TaskName, TaskFn>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `f` under `name`, replacing any earlier registration.
    pub fn register<F>(&mut self, name: impl Into<TaskName>, f: F) -> &mut Self
    where
        F: Fn(&TaskContext) + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(f));
        self
    }

    pub fn insert(&mut self, name: impl Into<TaskName>, f: TaskFn) -> Option<TaskFn> {
        self.functions.insert(name.into(), f)
    }

    pub fn get(&self, name: &str) -> Option<TaskFn> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("FunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}
