#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use taskflow::dag::{FunctionRegistry, Graph, TaskContext};
use taskflow::Job;

/// Builder for a job list / graph to simplify test setup.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    jobs: Vec<Job>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task with the given prerequisites.
    pub fn with_task(mut self, name: &str, deps: &[&str]) -> Self {
        let job = deps.iter().fold(Job::new(name), |job, dep| job.after(*dep));
        self.jobs.push(job);
        self
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn build(self, registry: &FunctionRegistry) -> Graph {
        Graph::from_jobs(&self.jobs, registry)
    }

    pub fn build_shared(self, registry: &FunctionRegistry) -> Arc<Graph> {
        Arc::new(self.build(registry))
    }
}

/// Records every task invocation, in order.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// How many times `name` was invoked.
    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.calls.lock().unwrap().iter().position(|c| c == name)
    }

    /// Registry where every named task records itself and stores its own
    /// name as output.
    pub fn registry(&self, names: &[&str]) -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        for name in names {
            let recorder = self.clone();
            let name = name.to_string();
            registry.register(name.clone(), move |ctx: &TaskContext| {
                recorder.record(&name);
                ctx.set_output(&name, name.clone());
            });
        }
        registry
    }
}
