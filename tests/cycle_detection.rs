// tests/cycle_detection.rs

use std::sync::{Arc, Mutex, OnceLock};

use taskflow::TaskflowError;
use taskflow::dag::{FunctionRegistry, Graph, OutputSlot, TaskContext};
use taskflow::engine::TaskManager;
use taskflow::types::TaskState;
use taskflow_test_utils::builders::{GraphBuilder, Recorder};
use taskflow_test_utils::init_tracing;
use taskflow_test_utils::inline_pool::InlinePool;

#[test]
fn three_cycle_fails_init_and_runs_nothing() {
    init_tracing();

    let recorder = Recorder::new();
    let registry = recorder.registry(&["a", "b", "c"]);
    let graph = GraphBuilder::new()
        .with_task("a", &["c"])
        .with_task("b", &["a"])
        .with_task("c", &["b"])
        .build_shared(&registry);

    assert!(graph.cycle_check());

    let mut manager = TaskManager::new(graph, (), OutputSlot::new()).with_workers(2);
    let err = manager.init().unwrap_err();

    match err {
        TaskflowError::DagCycle(msg) => {
            assert!(msg.contains("cycle detected"), "unexpected message: {msg}");
            for name in ["a", "b", "c"] {
                assert!(msg.contains(name), "{name} missing from: {msg}");
            }
        }
        other => panic!("expected DagCycle, got {other:?}"),
    }

    // No run state was created and no task was touched.
    assert_eq!(manager.state_of("a"), None);
    assert_eq!(manager.remaining_dependencies("a"), None);
    assert!(manager.finished_tasks().is_empty());
    assert!(recorder.calls().is_empty());
}

#[test]
fn run_without_init_also_rejects_a_cycle() {
    let recorder = Recorder::new();
    let registry = recorder.registry(&["start", "x", "y"]);
    let graph = GraphBuilder::new()
        .with_task("start", &[])
        .with_task("x", &["start", "y"])
        .with_task("y", &["x"])
        .build_shared(&registry);

    let mut manager = TaskManager::<InlinePool>::build(graph, (), OutputSlot::new());
    let err = manager.run().unwrap_err();

    assert!(matches!(err, TaskflowError::DagCycle(_)), "got {err:?}");
    // "start" is acyclic on its own, but nothing runs once the check fails.
    assert!(recorder.calls().is_empty());
}

#[test]
fn self_dependency_is_a_cycle() {
    let graph = GraphBuilder::new()
        .with_task("solo", &["solo"])
        .build(&FunctionRegistry::new());

    assert!(graph.cycle_check());
    assert_eq!(graph.cycle_members(), vec![vec!["solo".to_string()]]);
    assert!(matches!(
        graph.ensure_acyclic(),
        Err(TaskflowError::DagCycle(_))
    ));
}

#[test]
fn cycle_members_excludes_downstream_tasks() {
    let graph = GraphBuilder::new()
        .with_task("p", &["q"])
        .with_task("q", &["p"])
        .with_task("after", &["q"])
        .with_task("free", &[])
        .build(&FunctionRegistry::new());

    assert_eq!(
        graph.cycle_members(),
        vec![vec!["p".to_string(), "q".to_string()]]
    );

    let stuck = graph.resolution_sweeps().unwrap_err();
    assert_eq!(stuck, vec!["p", "q", "after"]);
}

#[test]
fn cycle_check_is_repeatable() {
    let acyclic = GraphBuilder::new()
        .with_task("a", &[])
        .with_task("b", &["a"])
        .build(&FunctionRegistry::new());
    let cyclic = GraphBuilder::new()
        .with_task("a", &["b"])
        .with_task("b", &["a"])
        .build(&FunctionRegistry::new());

    for _ in 0..3 {
        assert!(!acyclic.cycle_check());
        assert!(cyclic.cycle_check());
    }
    // Checking never consumes the graph's own counts.
    assert_eq!(acyclic.dependency_count("b"), Some(1));
    assert_eq!(cyclic.dependency_count("a"), Some(1));
}

#[test]
fn resolution_sweeps_follow_construction_order() {
    // "b" is declared before its prerequisite, so it needs a second sweep.
    let graph = GraphBuilder::new()
        .with_task("b", &["a"])
        .with_task("a", &[])
        .with_task("c", &["a"])
        .build(&FunctionRegistry::new());

    let sweeps = graph.resolution_sweeps().unwrap();
    assert_eq!(sweeps, vec![vec!["a", "c"], vec!["b"]]);
}

#[test]
fn acyclic_graph_initialises_and_is_reusable_for_init() {
    let graph = GraphBuilder::new()
        .with_task("a", &[])
        .build_shared(&FunctionRegistry::new());

    let mut manager = TaskManager::<InlinePool>::build(graph, (), OutputSlot::new());
    assert!(manager.init().is_ok());
    // Second init is a no-op.
    assert!(manager.init().is_ok());
    assert!(manager.run().is_ok());
}

#[test]
fn cycle_check_leaves_live_run_state_alone() {
    let graph_slot: Arc<OnceLock<Arc<Graph>>> = Arc::new(OnceLock::new());
    let seen = Arc::new(Mutex::new(None));

    let mut registry = FunctionRegistry::new();
    {
        let graph_slot = Arc::clone(&graph_slot);
        let seen = Arc::clone(&seen);
        registry.register("b", move |_ctx: &TaskContext| {
            if let Some(graph) = graph_slot.get() {
                *seen.lock().unwrap() = Some(graph.cycle_check());
            }
        });
    }

    let graph = GraphBuilder::new()
        .with_task("a", &[])
        .with_task("b", &["a"])
        .with_task("c", &["b"])
        .build_shared(&registry);
    graph_slot.set(Arc::clone(&graph)).unwrap();

    let mut manager = TaskManager::<InlinePool>::build(Arc::clone(&graph), (), OutputSlot::new());
    manager.init().unwrap();

    let snapshot = |m: &TaskManager<InlinePool>| {
        ["a", "b", "c"]
            .iter()
            .map(|n| (m.remaining_dependencies(n), m.state_of(n)))
            .collect::<Vec<_>>()
    };

    let before = snapshot(&manager);
    assert!(!graph.cycle_check());
    assert!(!graph.cycle_check());
    assert_eq!(snapshot(&manager), before);
    assert_eq!(before[2], (Some(1), Some(TaskState::Blocked)));

    // Checked again from inside a task body while the run is live.
    let summary = manager.run().unwrap();
    assert_eq!(*seen.lock().unwrap(), Some(false));
    assert_eq!(summary.completed, vec!["a", "b", "c"]);
    for name in ["a", "b", "c"] {
        assert_eq!(manager.remaining_dependencies(name), Some(0));
        assert_eq!(manager.state_of(name), Some(TaskState::Finished));
    }
}
