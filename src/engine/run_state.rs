// src/engine/run_state.rs

//! Live per-run scheduling state.
//!
//! Everything is indexed by task position in the [`Graph`], one atomic per
//! task, so the scheduling thread and the workers never share a lock.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use tracing::warn;

use crate::dag::Graph;
use crate::types::{TaskName, TaskState};

const PENDING: u8 = 0;
const CLAIMED: u8 = 1;
const RUNNING: u8 = 2;
const FINISHED: u8 = 3;
const FAILED: u8 = 4;

#[derive(Debug)]
pub(crate) struct RunState {
    /// Live copy of the graph's dependency counts.
    remaining: Vec<AtomicUsize>,
    /// Dispatch state cell per task.
    cells: Vec<AtomicU8>,
    finished: AtomicUsize,
}

impl RunState {
    pub(crate) fn for_graph(graph: &Graph) -> Self {
        Self {
            remaining: (0..graph.len())
                .map(|idx| AtomicUsize::new(graph.dependency_count_at(idx)))
                .collect(),
            cells: (0..graph.len()).map(|_| AtomicU8::new(PENDING)).collect(),
            finished: AtomicUsize::new(0),
        }
    }

    pub(crate) fn remaining(&self, idx: usize) -> usize {
        self.remaining[idx].load(Ordering::Acquire)
    }

    /// Claim task `idx` for dispatch.
    ///
    /// Succeeds at most once per task, and only when it has no unfinished
    /// prerequisites.
    pub(crate) fn try_claim(&self, idx: usize) -> bool {
        self.remaining(idx) == 0
            && self.cells[idx]
                .compare_exchange(PENDING, CLAIMED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    pub(crate) fn mark_running(&self, idx: usize) {
        self.cells[idx].store(RUNNING, Ordering::Release);
    }

    pub(crate) fn mark_failed(&self, idx: usize) {
        self.cells[idx].store(FAILED, Ordering::Release);
    }

    pub(crate) fn mark_finished(&self, idx: usize) {
        self.cells[idx].store(FINISHED, Ordering::Release);
        self.finished.fetch_add(1, Ordering::AcqRel);
    }

    /// One prerequisite of `idx` completed. Returns `true` if that was the
    /// last one. The count never goes below zero.
    pub(crate) fn complete_prerequisite(&self, idx: usize) -> bool {
        match self.remaining[idx].fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
            n.checked_sub(1)
        }) {
            Ok(prev) => prev == 1,
            Err(_) => {
                warn!(index = idx, "dependency count already zero; ignoring decrement");
                false
            }
        }
    }

    pub(crate) fn finished_count(&self) -> usize {
        self.finished.load(Ordering::Acquire)
    }

    pub(crate) fn state(&self, idx: usize) -> TaskState {
        match self.cells[idx].load(Ordering::Acquire) {
            PENDING if self.remaining(idx) == 0 => TaskState::Ready,
            PENDING => TaskState::Blocked,
            CLAIMED => TaskState::Claimed,
            RUNNING => TaskState::Running,
            FINISHED => TaskState::Finished,
            _ => TaskState::Failed,
        }
    }

    /// Names of tasks in state `wanted`, in construction order.
    pub(crate) fn names_in(&self, graph: &Graph, wanted: impl Fn(TaskState) -> bool) -> Vec<TaskName> {
        graph
            .tasks()
            .iter()
            .enumerate()
            .filter(|(idx, _)| wanted(self.state(*idx)))
            .map(|(_, t)| t.name().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{FunctionRegistry, Job};

    fn diamond() -> Graph {
        Graph::from_jobs(
            &[
                Job::new("a"),
                Job::new("b").after("a"),
                Job::new("c").after("a"),
                Job::new("d").after("b").after("c"),
            ],
            &FunctionRegistry::new(),
        )
    }

    #[test]
    fn claim_is_exclusive_and_gated_on_count() {
        let graph = diamond();
        let state = RunState::for_graph(&graph);

        assert_eq!(state.state(0), TaskState::Ready);
        assert_eq!(state.state(3), TaskState::Blocked);

        assert!(!state.try_claim(3));
        assert!(state.try_claim(0));
        assert!(!state.try_claim(0));
        assert_eq!(state.state(0), TaskState::Claimed);
    }

    #[test]
    fn counts_reach_zero_exactly_once() {
        let graph = diamond();
        let state = RunState::for_graph(&graph);

        assert!(!state.complete_prerequisite(3));
        assert_eq!(state.remaining(3), 1);
        assert!(state.complete_prerequisite(3));
        assert_eq!(state.remaining(3), 0);

        // A stray extra decrement must not wrap around.
        assert!(!state.complete_prerequisite(3));
        assert_eq!(state.remaining(3), 0);
    }

    #[test]
    fn finished_tracking() {
        let graph = diamond();
        let state = RunState::for_graph(&graph);

        assert!(state.try_claim(0));
        state.mark_running(0);
        assert_eq!(state.state(0), TaskState::Running);
        state.mark_finished(0);
        assert_eq!(state.finished_count(), 1);
        assert_eq!(state.names_in(&graph, |s| s == TaskState::Finished), vec!["a"]);

        state.mark_failed(1);
        assert_eq!(state.state(1), TaskState::Failed);
    }
}
