// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{GraphFile, RawGraphFile, RunSection};
use crate::dag::Job;
use crate::errors::{Result, TaskflowError};

impl TryFrom<RawGraphFile> for GraphFile {
    type Error = crate::errors::TaskflowError;

    fn try_from(raw: RawGraphFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(GraphFile::new_unchecked(raw.config, raw.tasks))
    }
}

fn validate_raw_config(cfg: &RawGraphFile) -> Result<()> {
    validate_run_section(&cfg.config)?;
    if cfg.config.strict {
        validate_jobs_strict(&cfg.tasks)?;
    }
    Ok(())
}

fn validate_run_section(section: &RunSection) -> Result<()> {
    if section.workers == 0 {
        return Err(TaskflowError::ConfigError(
            "config.workers must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

/// Checks that are tolerated by default but rejected in strict mode.
///
/// Cycles are not checked here; the task manager does that with the same
/// resolution rule it runs with.
pub fn validate_jobs_strict(jobs: &[Job]) -> Result<()> {
    ensure_has_tasks(jobs)?;
    ensure_unique_names(jobs)?;
    validate_task_dependencies(jobs)?;
    Ok(())
}

fn ensure_has_tasks(jobs: &[Job]) -> Result<()> {
    if jobs.is_empty() {
        return Err(TaskflowError::ConfigError(
            "graph must contain at least one task".to_string(),
        ));
    }
    Ok(())
}

fn ensure_unique_names(jobs: &[Job]) -> Result<()> {
    let mut seen = HashSet::new();
    for job in jobs {
        if !seen.insert(job.task_name.as_str()) {
            return Err(TaskflowError::ConfigError(format!(
                "task '{}' is defined more than once",
                job.task_name
            )));
        }
    }
    Ok(())
}

fn validate_task_dependencies(jobs: &[Job]) -> Result<()> {
    let names: HashSet<&str> = jobs.iter().map(|j| j.task_name.as_str()).collect();

    for job in jobs {
        for dep in &job.dependencies {
            if dep == &job.task_name {
                return Err(TaskflowError::ConfigError(format!(
                    "task '{}' cannot depend on itself",
                    job.task_name
                )));
            }
            if !names.contains(dep.as_str()) {
                return Err(TaskflowError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}'",
                    job.task_name, dep
                )));
            }
        }
    }
    Ok(())
}
