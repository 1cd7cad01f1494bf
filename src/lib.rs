// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{GraphFile, load_and_validate, validate_jobs_strict};
use crate::dag::{FunctionRegistry, Graph, OutputSlot, TaskContext};
use crate::engine::TaskManager;

pub use crate::dag::{Job, Task};
pub use crate::engine::{AbortHandle, RunSummary};
pub use crate::errors::TaskflowError;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - graph description loading (+ optional strict validation)
/// - graph construction with a registry of logging task bodies
/// - the task manager, run on a blocking thread
/// - Ctrl-C handling (aborts the run)
pub async fn run(args: CliArgs) -> Result<()> {
    let graph_path = PathBuf::from(&args.graph);
    let cfg = load_and_validate(&graph_path)?;

    if args.strict && !cfg.config().strict {
        validate_jobs_strict(cfg.tasks())?;
    }

    let workers = args.workers.unwrap_or(cfg.config().workers);
    let registry = logging_registry(&cfg);
    let graph = Arc::new(Graph::from_config(&cfg, &registry));

    if args.dry_run {
        print_dry_run(&graph, workers);
        graph.ensure_acyclic()?;
        return Ok(());
    }

    let output = OutputSlot::new();
    let mut manager = TaskManager::new(Arc::clone(&graph), graph_path, output.clone())
        .with_workers(workers);
    manager.init()?;

    // Ctrl-C -> abort the run; running tasks are allowed to finish.
    {
        let abort = manager.abort_handle();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl-C received; aborting run");
            abort.abort();
        });
    }

    let summary = tokio::task::spawn_blocking(move || manager.run()).await??;

    println!("completed {} task(s):", summary.completed.len());
    for name in &summary.completed {
        println!("  - {name}");
    }
    if let Some(last) = output.get::<String>() {
        debug!(last = %last, "global output");
    }

    Ok(())
}

/// Registry used by the CLI: every task logs its start and records its name
/// as its output.
fn logging_registry(cfg: &GraphFile) -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();
    for job in cfg.tasks() {
        let name = job.task_name.clone();
        registry.register(job.task_name.clone(), move |ctx: &TaskContext| {
            info!(task = %name, "running task");
            ctx.set_output(&name, name.clone());
            ctx.global_output().set(name.clone());
        });
    }
    registry
}

/// Simple dry-run output: print tasks, deps and resolution sweeps.
fn print_dry_run(graph: &Graph, workers: usize) {
    println!("taskflow dry-run");
    println!("  workers = {workers}");
    println!();

    println!("tasks ({}):", graph.len());
    for task in graph.tasks() {
        println!("  - {}", task.name());
        let deps = graph.dependencies_of(task.name());
        if !deps.is_empty() {
            println!("      after: {:?}", deps);
        }
    }
    println!();

    match graph.resolution_sweeps() {
        Ok(sweeps) => {
            println!("resolution sweeps ({}):", sweeps.len());
            for (i, sweep) in sweeps.iter().enumerate() {
                println!("  {}: {:?}", i + 1, sweep);
            }
        }
        Err(stuck) => {
            println!("unresolvable tasks: {:?}", stuck);
            for group in graph.cycle_members() {
                println!("  cycle: {}", group.join(" -> "));
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
