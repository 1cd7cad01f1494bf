// tests/failure_modes.rs

use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

use taskflow::{AbortHandle, TaskflowError};
use taskflow::dag::{FunctionRegistry, OutputSlot, TaskContext};
use taskflow::engine::TaskManager;
use taskflow::types::TaskState;
use taskflow_test_utils::builders::{GraphBuilder, Recorder};
use taskflow_test_utils::inline_pool::InlinePool;
use taskflow_test_utils::{init_tracing, with_timeout};

#[test]
fn panicking_task_fails_run_and_blocks_dependents() {
    init_tracing();

    let recorder = Recorder::new();
    let mut registry = recorder.registry(&["root", "sibling", "after"]);
    registry.register("boom", |_ctx: &TaskContext| panic!("kaboom"));

    let graph = GraphBuilder::new()
        .with_task("root", &[])
        .with_task("boom", &["root"])
        .with_task("sibling", &["root"])
        .with_task("after", &["boom"])
        .build_shared(&registry);

    let (err, boom, after, sibling) = with_timeout(move || {
        let mut manager = TaskManager::new(graph, (), OutputSlot::new()).with_workers(2);
        let err = manager.run().unwrap_err();
        (
            err,
            manager.state_of("boom"),
            manager.state_of("after"),
            manager.state_of("sibling"),
        )
    });

    match err {
        TaskflowError::TaskPanicked { task, message } => {
            assert_eq!(task, "boom");
            assert!(message.contains("kaboom"), "message: {message}");
        }
        other => panic!("expected TaskPanicked, got {other:?}"),
    }
    assert_eq!(boom, Some(TaskState::Failed));
    assert_eq!(after, Some(TaskState::Blocked));
    assert_eq!(sibling, Some(TaskState::Finished));
    assert_eq!(recorder.count("after"), 0);
    assert_eq!(recorder.count("root"), 1);
}

#[test]
fn panic_with_inline_pool_is_reported_the_same_way() {
    let mut registry = FunctionRegistry::new();
    registry.register("bad", |_ctx: &TaskContext| {
        panic!("{}", String::from("formatted panic"));
    });
    let graph = GraphBuilder::new()
        .with_task("bad", &[])
        .build_shared(&registry);

    let mut manager = TaskManager::<InlinePool>::build(graph, (), OutputSlot::new());
    let err = manager.run().unwrap_err();

    assert!(
        matches!(&err, TaskflowError::TaskPanicked { message, .. } if message == "formatted panic"),
        "got {err:?}"
    );
}

#[test]
fn abort_stops_dispatch_and_reports_cancelled() {
    init_tracing();

    let recorder = Recorder::new();
    let mut registry = recorder.registry(&["never"]);
    registry.register("spin", |ctx: &TaskContext| {
        while !ctx.is_cancelled() {
            thread::sleep(Duration::from_millis(5));
        }
    });

    let graph = GraphBuilder::new()
        .with_task("spin", &[])
        .with_task("never", &["spin"])
        .build_shared(&registry);

    let mut manager = TaskManager::new(graph, (), OutputSlot::new()).with_workers(2);
    let abort = manager.abort_handle();

    thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        abort.abort();
    });

    let (err, spin, never) = with_timeout(move || {
        let err = manager.run().unwrap_err();
        (err, manager.state_of("spin"), manager.state_of("never"))
    });

    assert!(matches!(err, TaskflowError::Cancelled), "got {err:?}");
    // The running task is allowed to finish; its dependent is not started.
    assert_eq!(spin, Some(TaskState::Finished));
    assert_ne!(never, Some(TaskState::Finished));
    assert!(recorder.calls().is_empty());
}

/// Registry where "stop" sleeps briefly and then aborts the run it belongs
/// to. The handle is filled in once the manager exists.
fn aborting_registry(recorder: &Recorder) -> (FunctionRegistry, Arc<OnceLock<AbortHandle>>) {
    let handle: Arc<OnceLock<AbortHandle>> = Arc::new(OnceLock::new());
    let mut registry = recorder.registry(&["never"]);
    let slot = Arc::clone(&handle);
    registry.register("stop", move |_ctx: &TaskContext| {
        thread::sleep(Duration::from_millis(20));
        if let Some(abort) = slot.get() {
            abort.abort();
        }
    });
    (registry, handle)
}

#[test]
fn abort_raised_between_ticks_still_cancels_the_run() {
    init_tracing();

    let recorder = Recorder::new();
    let (registry, handle) = aborting_registry(&recorder);
    let graph = GraphBuilder::new()
        .with_task("stop", &[])
        .with_task("never", &["stop"])
        .build_shared(&registry);

    let mut manager = TaskManager::new(graph, (), OutputSlot::new()).with_workers(2);
    handle.set(manager.abort_handle()).unwrap();

    let (result, never) = with_timeout(move || {
        let result = manager.run();
        (result, manager.state_of("never"))
    });

    assert!(matches!(result, Err(TaskflowError::Cancelled)), "got {result:?}");
    assert!(recorder.calls().is_empty(), "dependent ran after abort");
    assert_eq!(never, Some(TaskState::Ready));
}

#[test]
fn abort_inside_inline_sweep_skips_remaining_tasks() {
    let recorder = Recorder::new();
    let (registry, handle) = aborting_registry(&recorder);
    // "never" comes right after "stop" in the same sweep.
    let graph = GraphBuilder::new()
        .with_task("stop", &[])
        .with_task("never", &["stop"])
        .build_shared(&registry);

    let mut manager = TaskManager::<InlinePool>::build(graph, (), OutputSlot::new());
    handle.set(manager.abort_handle()).unwrap();

    assert!(matches!(manager.run(), Err(TaskflowError::Cancelled)));
    assert!(recorder.calls().is_empty());
    assert_eq!(manager.state_of("stop"), Some(TaskState::Finished));
}

#[test]
fn abort_by_the_last_task_is_still_reported() {
    let handle: Arc<OnceLock<AbortHandle>> = Arc::new(OnceLock::new());
    let slot = Arc::clone(&handle);
    let mut registry = FunctionRegistry::new();
    registry.register("only", move |_ctx: &TaskContext| {
        if let Some(abort) = slot.get() {
            abort.abort();
        }
    });
    let graph = GraphBuilder::new().with_task("only", &[]).build_shared(&registry);

    let mut manager = TaskManager::<InlinePool>::build(graph, (), OutputSlot::new());
    handle.set(manager.abort_handle()).unwrap();

    assert!(matches!(manager.run(), Err(TaskflowError::Cancelled)));
}

#[test]
fn abort_before_run_dispatches_nothing() {
    let recorder = Recorder::new();
    let registry = recorder.registry(&["a"]);
    let graph = GraphBuilder::new().with_task("a", &[]).build_shared(&registry);

    let mut manager = TaskManager::<InlinePool>::build(graph, (), OutputSlot::new());
    manager.abort_handle().abort();

    assert!(matches!(manager.run(), Err(TaskflowError::Cancelled)));
    assert!(recorder.calls().is_empty());
    assert_eq!(manager.state_of("a"), Some(TaskState::Ready));
}

#[test]
fn manager_is_single_use() {
    let graph = GraphBuilder::new()
        .with_task("a", &[])
        .build_shared(&FunctionRegistry::new());

    let mut manager = TaskManager::<InlinePool>::build(graph, (), OutputSlot::new());
    assert!(manager.run().is_ok());

    assert!(matches!(manager.run(), Err(TaskflowError::InvalidState(_))));
    assert!(matches!(manager.init(), Err(TaskflowError::InvalidState(_))));
}

#[test]
fn cleared_manager_rejects_further_use() {
    let graph = GraphBuilder::new()
        .with_task("a", &[])
        .build_shared(&FunctionRegistry::new());

    let mut manager = TaskManager::<InlinePool>::build(graph, (), OutputSlot::new());
    manager.init().unwrap();
    manager.clear();

    assert!(manager.graph().is_none());
    assert_eq!(manager.state_of("a"), None);
    assert!(matches!(manager.run(), Err(TaskflowError::InvalidState(_))));
}

#[test]
fn zero_workers_is_a_config_error() {
    let graph = GraphBuilder::new()
        .with_task("a", &[])
        .build_shared(&FunctionRegistry::new());

    let mut manager = TaskManager::new(graph, (), OutputSlot::new()).with_workers(0);
    assert!(matches!(manager.init(), Err(TaskflowError::ConfigError(_))));
    assert_eq!(manager.state_of("a"), None);
}
