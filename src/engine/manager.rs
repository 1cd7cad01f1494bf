// src/engine/manager.rs

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use tracing::{debug, error, info, warn};

use crate::dag::{Graph, OutputSlot, TaskContext};
use crate::engine::abort::AbortHandle;
use crate::engine::run_state::RunState;
use crate::errors::{Result, TaskflowError};
use crate::exec::{ThreadPool, WorkerPool};
use crate::types::{TaskName, TaskState};

/// Default number of workers started by [`TaskManager::init`].
pub const DEFAULT_WORKERS: usize = 4;

/// How long the scheduling loop waits for a completion before it re-checks
/// the abort flag and re-sweeps the task list.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Message sent by a completion closure back to the scheduling thread.
#[derive(Debug)]
enum Completion {
    /// Task finished; `ready` are dependents whose count just reached zero.
    Finished { index: usize, ready: Vec<usize> },
    /// Task body panicked; nothing was decremented.
    Panicked { index: usize, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Initialized,
    Completed,
    Cleared,
}

/// Result of a successful [`TaskManager::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Task names in the order their completion reached the scheduler.
    pub completed: Vec<TaskName>,
    /// Number of tasks handed to workers.
    pub dispatched: usize,
}

/// Drives one execution of a [`Graph`] on a pool of workers.
///
/// The manager owns:
/// - the graph (shared, immutable)
/// - the [`TaskContext`] handed to every task function
/// - the live run state (dependency counts, dispatch cells)
/// - the worker pool
///
/// A manager is single-use: `init` -> `run` -> drop (or `clear`).
pub struct TaskManager<P: WorkerPool = ThreadPool> {
    graph: Option<Arc<Graph>>,
    context: Arc<TaskContext>,
    abort: AbortHandle,
    worker_count: usize,
    pool: Option<P>,
    state: Option<Arc<RunState>>,
    phase: Phase,
}

impl TaskManager<ThreadPool> {
    /// Manager backed by OS-thread workers ([`DEFAULT_WORKERS`] of them).
    pub fn new<I>(graph: Arc<Graph>, input: I, output: OutputSlot) -> Self
    where
        I: Any + Send + Sync,
    {
        Self::build(graph, input, output)
    }
}

impl<P: WorkerPool> TaskManager<P> {
    /// Manager backed by any [`WorkerPool`] implementation.
    pub fn build<I>(graph: Arc<Graph>, input: I, output: OutputSlot) -> Self
    where
        I: Any + Send + Sync,
    {
        let abort = AbortHandle::new();
        let context = TaskContext::with_abort(Arc::new(input), output, abort.clone());

        Self {
            graph: Some(graph),
            context: Arc::new(context),
            abort,
            worker_count: DEFAULT_WORKERS,
            pool: None,
            state: None,
            phase: Phase::Created,
        }
    }

    /// Set the number of workers started by `init`.
    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn context(&self) -> &Arc<TaskContext> {
        &self.context
    }

    pub fn graph(&self) -> Option<&Arc<Graph>> {
        self.graph.as_ref()
    }

    /// Handle that stops the run from another thread.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Validate the graph and start the workers.
    ///
    /// Fails with [`TaskflowError::DagCycle`] if the graph has a cycle; in
    /// that case no worker is started and no run state is created. Calling
    /// `init` again after it succeeded is a no-op.
    pub fn init(&mut self) -> Result<()> {
        match self.phase {
            Phase::Created => {}
            Phase::Initialized => return Ok(()),
            Phase::Completed | Phase::Cleared => {
                return Err(TaskflowError::InvalidState(format!(
                    "init called on a {:?} task manager",
                    self.phase
                )));
            }
        }

        let graph = Arc::clone(self.live_graph()?);

        if let Err(err) = graph.ensure_acyclic() {
            error!(error = %err, "refusing to start run");
            return Err(err);
        }

        if self.worker_count == 0 {
            return Err(TaskflowError::ConfigError(
                "worker count must be >= 1 (got 0)".to_string(),
            ));
        }

        let pool = P::start(self.worker_count)?;

        self.state = Some(Arc::new(RunState::for_graph(&graph)));
        self.pool = Some(pool);
        self.phase = Phase::Initialized;

        info!(
            tasks = graph.len(),
            workers = self.worker_count,
            "task manager initialised"
        );
        Ok(())
    }

    /// Execute every task of the graph, blocking until all of them finished.
    ///
    /// Calls [`init`](Self::init) first if it has not been called, so a graph
    /// with a cycle never starts running.
    ///
    /// Fails with:
    /// - [`TaskflowError::TaskPanicked`] if a task body panicked; its
    ///   dependents are never dispatched.
    /// - [`TaskflowError::Cancelled`] if the abort handle fired.
    /// - [`TaskflowError::Stalled`] if nothing is running and nothing can
    ///   become ready.
    ///
    /// On failure the loop still waits for tasks already handed to workers.
    pub fn run(&mut self) -> Result<RunSummary> {
        if self.phase == Phase::Created {
            self.init()?;
        }
        if self.phase != Phase::Initialized {
            return Err(TaskflowError::InvalidState(format!(
                "run called on a {:?} task manager",
                self.phase
            )));
        }
        // Single-use from here on, whatever the outcome.
        self.phase = Phase::Completed;

        let graph = Arc::clone(self.live_graph()?);
        let state = self.live_state()?;
        let pool = self.pool.as_ref().ok_or_else(|| {
            TaskflowError::InvalidState("worker pool is not running".to_string())
        })?;

        let (tx, rx) = unbounded::<Completion>();
        let mut dispatcher = Dispatcher {
            graph: &graph,
            state: &state,
            context: &self.context,
            pool,
            abort: &self.abort,
            tx,
            in_flight: 0,
            dispatched: 0,
        };

        info!(tasks = graph.len(), workers = pool.size(), "run started");

        let outcome = drive(&mut dispatcher, &rx);

        match &outcome {
            Ok(summary) => info!(
                completed = summary.completed.len(),
                dispatched = summary.dispatched,
                "run finished"
            ),
            Err(err) => warn!(error = %err, "run ended early"),
        }

        outcome
    }

    /// Live per-task state, or `None` for an unknown task or before `init`.
    ///
    /// A task reports `Finished` before its dependents' counts are
    /// decremented, so a dependent is never seen running while one of its
    /// prerequisites still reports `Running`.
    pub fn state_of(&self, task: &str) -> Option<TaskState> {
        let graph = self.graph.as_ref()?;
        let state = self.state.as_ref()?;
        graph.index_of(task).map(|idx| state.state(idx))
    }

    /// Live remaining-prerequisite count of `task`.
    pub fn remaining_dependencies(&self, task: &str) -> Option<usize> {
        let graph = self.graph.as_ref()?;
        let state = self.state.as_ref()?;
        graph.index_of(task).map(|idx| state.remaining(idx))
    }

    /// Names of finished tasks, in graph order.
    pub fn finished_tasks(&self) -> Vec<TaskName> {
        match (&self.graph, &self.state) {
            (Some(graph), Some(state)) => {
                state.names_in(graph, |s| s == TaskState::Finished)
            }
            _ => Vec::new(),
        }
    }

    /// Release the graph, run state and workers.
    ///
    /// Queued work drains before the workers exit. The manager is unusable
    /// afterwards.
    pub fn clear(&mut self) {
        if self.phase == Phase::Cleared {
            return;
        }
        if let Some(mut pool) = self.pool.take() {
            pool.shutdown();
        }
        self.state = None;
        self.graph = None;
        self.phase = Phase::Cleared;
        debug!("task manager cleared");
    }

    fn live_graph(&self) -> Result<&Arc<Graph>> {
        self.graph
            .as_ref()
            .ok_or_else(|| TaskflowError::InvalidState("graph has been released".to_string()))
    }

    fn live_state(&self) -> Result<Arc<RunState>> {
        self.state
            .clone()
            .ok_or_else(|| TaskflowError::InvalidState("run state is missing".to_string()))
    }
}

impl<P: WorkerPool> Drop for TaskManager<P> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<P: WorkerPool> fmt::Debug for TaskManager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskManager")
            .field("phase", &self.phase)
            .field("worker_count", &self.worker_count)
            .field("graph", &self.graph.as_ref().map(|g| g.len()))
            .field("finished", &self.state.as_ref().map(|s| s.finished_count()))
            .finish_non_exhaustive()
    }
}

/// Borrowed pieces needed to claim and submit tasks during one run.
struct Dispatcher<'a, P: WorkerPool> {
    graph: &'a Arc<Graph>,
    state: &'a Arc<RunState>,
    context: &'a Arc<TaskContext>,
    pool: &'a P,
    abort: &'a AbortHandle,
    tx: Sender<Completion>,
    in_flight: usize,
    dispatched: usize,
}

impl<P: WorkerPool> Dispatcher<'_, P> {
    /// One pass over every task in construction order, dispatching each one
    /// that can be claimed. Stops as soon as the run is aborted.
    fn sweep(&mut self) -> Result<()> {
        for idx in 0..self.graph.len() {
            if self.abort.is_aborted() {
                break;
            }
            self.dispatch(idx)?;
        }
        Ok(())
    }

    /// Claim task `idx` and hand its completion closure to a worker.
    ///
    /// Does nothing if the task is blocked, was already claimed, or the run
    /// has been aborted.
    fn dispatch(&mut self, idx: usize) -> Result<()> {
        if self.abort.is_aborted() || !self.state.try_claim(idx) {
            return Ok(());
        }

        let graph = Arc::clone(self.graph);
        let state = Arc::clone(self.state);
        let ctx = Arc::clone(self.context);
        let tx = self.tx.clone();

        debug!(task = %graph.tasks()[idx].name(), "dependencies satisfied; dispatching");

        self.pool.post(Box::new(move || {
            let task = &graph.tasks()[idx];
            state.mark_running(idx);

            let completion = match catch_unwind(AssertUnwindSafe(|| task.execute(&ctx))) {
                Ok(()) => {
                    // Finished before any dependent can observe a zero count.
                    state.mark_finished(idx);
                    let ready = graph
                        .dependents_at(idx)
                        .iter()
                        .copied()
                        .filter(|&dependent| state.complete_prerequisite(dependent))
                        .collect();
                    Completion::Finished { index: idx, ready }
                }
                Err(payload) => {
                    state.mark_failed(idx);
                    Completion::Panicked {
                        index: idx,
                        message: panic_message(payload.as_ref()),
                    }
                }
            };

            // The receiver is gone only if `run` already returned.
            let _ = tx.send(completion);
        }))?;

        self.in_flight += 1;
        self.dispatched += 1;
        Ok(())
    }

    /// Record a cancellation if the abort flag is up and nothing else failed
    /// first. Returns `true` once the run is failing for any reason.
    fn note_abort(&self, failure: &mut Option<TaskflowError>) -> bool {
        if failure.is_none() && self.abort.is_aborted() {
            warn!(
                in_flight = self.in_flight,
                "abort requested; waiting for running tasks"
            );
            *failure = Some(TaskflowError::Cancelled);
        }
        failure.is_some()
    }
}

/// The scheduling loop proper.
fn drive<P: WorkerPool>(
    dispatcher: &mut Dispatcher<'_, P>,
    rx: &Receiver<Completion>,
) -> Result<RunSummary> {
    let total = dispatcher.graph.len();
    let mut completed = Vec::with_capacity(total);
    let mut failure: Option<TaskflowError> = None;

    if dispatcher.abort.is_aborted() {
        warn!("abort requested before the first dispatch");
        return Err(TaskflowError::Cancelled);
    }
    if let Err(err) = dispatcher.sweep() {
        failure = Some(err);
    }

    // Count completions as they arrive rather than polling the finished
    // counter, so the summary always holds every finished task.
    while completed.len() < total {
        dispatcher.note_abort(&mut failure);

        if dispatcher.in_flight == 0 {
            if let Some(err) = failure {
                return Err(err);
            }
            let blocked = dispatcher
                .state
                .names_in(dispatcher.graph, |s| s != TaskState::Finished);
            error!(?blocked, "no task running and none ready; run stalled");
            return Err(TaskflowError::Stalled(blocked));
        }

        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(Completion::Finished { index, ready }) => {
                dispatcher.in_flight -= 1;
                let name = dispatcher.graph.tasks()[index].name().to_string();
                debug!(task = %name, newly_ready = ready.len(), "task finished");
                completed.push(name);

                // The abort may have fired while we were waiting.
                if !dispatcher.note_abort(&mut failure) {
                    for idx in ready {
                        if let Err(err) = dispatcher.dispatch(idx) {
                            failure = Some(err);
                            break;
                        }
                    }
                }
            }
            Ok(Completion::Panicked { index, message }) => {
                dispatcher.in_flight -= 1;
                let task = dispatcher.graph.tasks()[index].name().to_string();
                error!(task = %task, panic = %message, "task panicked; dependents will not run");
                if failure.is_none() {
                    failure = Some(TaskflowError::TaskPanicked { task, message });
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if !dispatcher.note_abort(&mut failure) {
                    if let Err(err) = dispatcher.sweep() {
                        failure = Some(err);
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                // The dispatcher holds a sender, so this cannot happen while
                // it is alive.
                return Err(TaskflowError::WorkerUnavailable(
                    "completion channel closed".to_string(),
                ));
            }
        }
    }

    // Every task finished, but a failure recorded on the way still wins.
    dispatcher.note_abort(&mut failure);
    if let Some(err) = failure {
        return Err(err);
    }

    Ok(RunSummary {
        completed,
        dispatched: dispatcher.dispatched,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
