// src/dag/graph.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, warn};

use crate::config::model::GraphFile;
use crate::dag::registry::FunctionRegistry;
use crate::dag::task::{Job, Task};
use crate::errors::{Result, TaskflowError};
use crate::types::TaskName;

/// Immutable task topology for one scheduling problem.
///
/// Tasks keep their construction order; the scheduler sweeps them in that
/// order. Adjacency is stored by position so that per-run state can be a flat
/// vector of atomics indexed the same way.
pub struct Graph {
    tasks: Vec<Arc<Task>>,
    /// Name -> position. With duplicate names the last definition wins.
    lookup: HashMap<TaskName, usize>,
    /// Resolved direct prerequisites, by position.
    deps: Vec<Vec<usize>>,
    /// Reverse edges: tasks that list this one as a prerequisite.
    dependents: Vec<Vec<usize>>,
}

impl Graph {
    /// Build a graph from a validated [`GraphFile`].
    pub fn from_config(cfg: &GraphFile, registry: &FunctionRegistry) -> Self {
        Self::from_jobs(cfg.tasks(), registry)
    }

    /// Build a graph from jobs plus a function registry.
    ///
    /// - A job whose name has no registered function becomes a no-op task.
    /// - Dependency names with no matching job are dropped from the edge set.
    /// - Duplicate names are tolerated: every job yields a task, but name
    ///   lookups (and therefore dependency wiring) resolve to the last one.
    pub fn from_jobs(jobs: &[Job], registry: &FunctionRegistry) -> Self {
        let mut tasks = Vec::with_capacity(jobs.len());
        let mut lookup: HashMap<TaskName, usize> = HashMap::with_capacity(jobs.len());

        // First pass: one task per job.
        for (idx, job) in jobs.iter().enumerate() {
            let func = registry.get(&job.task_name);
            if func.is_none() {
                debug!(task = %job.task_name, "no registered function; task is a no-op");
            }
            if let Some(prev) = lookup.insert(job.task_name.clone(), idx) {
                warn!(
                    task = %job.task_name,
                    previous = prev,
                    current = idx,
                    "duplicate task name; later definition wins for lookups"
                );
            }
            tasks.push(Arc::new(Task::new(job.task_name.clone(), func)));
        }

        // Second pass: resolve dependency names.
        let mut deps: Vec<Vec<usize>> = vec![Vec::new(); jobs.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); jobs.len()];

        for (idx, job) in jobs.iter().enumerate() {
            for dep_name in &job.dependencies {
                match lookup.get(dep_name) {
                    Some(&dep_idx) => {
                        deps[idx].push(dep_idx);
                        dependents[dep_idx].push(idx);
                    }
                    None => {
                        warn!(
                            task = %job.task_name,
                            dep = %dep_name,
                            "dependency not found among tasks; ignoring edge"
                        );
                    }
                }
            }
        }

        for (task, task_deps) in tasks.iter().zip(&deps) {
            let weak = task_deps.iter().map(|&d| Arc::downgrade(&tasks[d])).collect();
            task.set_dependencies(weak);
        }

        debug!(
            tasks = tasks.len(),
            edges = deps.iter().map(Vec::len).sum::<usize>(),
            "built task graph"
        );

        Self {
            tasks,
            lookup,
            deps,
            dependents,
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// All tasks in construction order.
    pub fn tasks(&self) -> &[Arc<Task>] {
        &self.tasks
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.name())
    }

    pub fn task(&self, name: &str) -> Option<&Arc<Task>> {
        self.index_of(name).map(|idx| &self.tasks[idx])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// Number of resolved direct prerequisites of `name`.
    pub fn dependency_count(&self, name: &str) -> Option<usize> {
        self.index_of(name).map(|idx| self.deps[idx].len())
    }

    /// Forward map: task name -> number of direct prerequisites.
    pub fn dependency_counts(&self) -> HashMap<TaskName, usize> {
        self.lookup
            .iter()
            .map(|(name, &idx)| (name.clone(), self.deps[idx].len()))
            .collect()
    }

    /// Immediate prerequisites of a task.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.index_of(name)
            .map(|idx| self.names_at(&self.deps[idx]))
            .unwrap_or_default()
    }

    /// Immediate dependents of a task (tasks that list it as a prerequisite).
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.index_of(name)
            .map(|idx| self.names_at(&self.dependents[idx]))
            .unwrap_or_default()
    }

    /// Tasks with no resolved prerequisites, in construction order.
    pub fn roots(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .zip(&self.deps)
            .filter(|(_, d)| d.is_empty())
            .map(|(t, _)| t.name())
            .collect()
    }

    pub(crate) fn dependency_count_at(&self, idx: usize) -> usize {
        self.deps[idx].len()
    }

    pub(crate) fn dependents_at(&self, idx: usize) -> &[usize] {
        &self.dependents[idx]
    }

    /// Returns `true` if the graph contains a cycle.
    ///
    /// Works on a private copy of the dependency counts, so it can be called
    /// any number of times without affecting a run.
    pub fn cycle_check(&self) -> bool {
        self.resolution_sweeps().is_err()
    }

    /// Simulate dependency resolution.
    ///
    /// Each sweep walks the tasks in construction order and finishes every
    /// task whose remaining count is zero, decrementing its dependents
    /// straight away (so a later task in the same sweep may already see zero).
    /// This is the same readiness rule the scheduler uses at run time.
    ///
    /// Returns the names finished in each sweep, or, if some sweep makes no
    /// progress, the names that could never be finished.
    pub fn resolution_sweeps(&self) -> std::result::Result<Vec<Vec<TaskName>>, Vec<TaskName>> {
        let mut remaining: Vec<usize> = self.deps.iter().map(Vec::len).collect();
        let mut finished = vec![false; self.tasks.len()];
        let mut finished_count = 0;
        let mut sweeps = Vec::new();

        loop {
            if finished_count == self.tasks.len() {
                return Ok(sweeps);
            }

            let mut sweep = Vec::new();
            for idx in 0..self.tasks.len() {
                if remaining[idx] == 0 && !finished[idx] {
                    for &dependent in &self.dependents[idx] {
                        remaining[dependent] -= 1;
                    }
                    finished[idx] = true;
                    finished_count += 1;
                    sweep.push(self.tasks[idx].name().to_string());
                }
            }

            if sweep.is_empty() {
                let stuck = self
                    .tasks
                    .iter()
                    .zip(&finished)
                    .filter(|(_, done)| !**done)
                    .map(|(t, _)| t.name().to_string())
                    .collect();
                return Err(stuck);
            }

            sweeps.push(sweep);
        }
    }

    /// Groups of tasks that form dependency cycles (including self-loops).
    ///
    /// Tasks that are merely downstream of a cycle are not included.
    pub fn cycle_members(&self) -> Vec<Vec<TaskName>> {
        let graph = self.to_petgraph();
        tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut names: Vec<TaskName> = scc.iter().map(|&n| graph[n].clone()).collect();
                names.sort();
                names
            })
            .collect()
    }

    /// Fail with [`TaskflowError::DagCycle`] if the graph contains a cycle.
    pub fn ensure_acyclic(&self) -> Result<()> {
        if !self.cycle_check() {
            return Ok(());
        }

        let groups: Vec<String> = self
            .cycle_members()
            .iter()
            .map(|g| g.join(" -> "))
            .collect();
        Err(TaskflowError::DagCycle(format!(
            "cycle detected in task DAG involving [{}]",
            groups.join("], [")
        )))
    }

    /// Export the topology as a petgraph graph.
    ///
    /// Edge direction: prerequisite -> dependent. Node `i` is task `i`.
    pub fn to_petgraph(&self) -> DiGraph<TaskName, ()> {
        let mut graph = DiGraph::with_capacity(self.tasks.len(), 0);
        for task in &self.tasks {
            graph.add_node(task.name().to_string());
        }
        for (idx, task_deps) in self.deps.iter().enumerate() {
            for &dep in task_deps {
                graph.add_edge(NodeIndex::new(dep), NodeIndex::new(idx), ());
            }
        }
        graph
    }

    fn names_at(&self, indices: &[usize]) -> Vec<&str> {
        indices.iter().map(|&i| self.tasks[i].name()).collect()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}
