// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::types::TaskName;

#[derive(Error, Debug)]
pub enum TaskflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("Task '{task}' panicked: {message}")]
    TaskPanicked { task: TaskName, message: String },

    #[error("Worker unavailable: {0}")]
    WorkerUnavailable(String),

    #[error("Run stalled with unfinished tasks: {0:?}")]
    Stalled(Vec<TaskName>),

    #[error("Run was cancelled before all tasks finished")]
    Cancelled,

    #[error("Invalid task manager state: {0}")]
    InvalidState(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskflowError>;
