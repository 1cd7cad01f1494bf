// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `taskflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskflow",
    version,
    about = "Validate and run a task dependency graph on a pool of workers.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the graph description (JSON, or TOML by `.toml` extension).
    #[arg(long, value_name = "PATH", default_value = "taskflow.json")]
    pub graph: String,

    /// Number of worker threads. Overrides `config.workers`.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Reject unknown, self-referencing and duplicate task names.
    #[arg(long)]
    pub strict: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolution order, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
