// src/config/mod.rs

//! Graph description loading and validation.
//!
//! Responsibilities:
//! - Define the serde-backed data model (`model.rs`).
//! - Load a description from disk as JSON or TOML (`loader.rs`).
//! - Validate run options and, in strict mode, task names (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{from_json_str, from_toml_str, load_and_validate, load_from_path};
pub use model::{GraphFile, RawGraphFile, RunSection};
pub use validate::validate_jobs_strict;
