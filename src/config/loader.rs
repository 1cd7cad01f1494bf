// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{GraphFile, RawGraphFile};
use crate::errors::Result;

/// Serialization format of a graph description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    /// `.toml` files are TOML; everything else is treated as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Format::Toml,
            _ => Format::Json,
        }
    }
}

/// Parse a JSON graph description without semantic validation.
pub fn from_json_str(contents: &str) -> Result<RawGraphFile> {
    Ok(serde_json::from_str(contents)?)
}

/// Parse a TOML graph description without semantic validation.
pub fn from_toml_str(contents: &str) -> Result<RawGraphFile> {
    Ok(toml::from_str(contents)?)
}

/// Load a graph description from a given path and return the raw
/// `RawGraphFile`.
///
/// This only performs deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawGraphFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    match Format::from_path(path) {
        Format::Json => from_json_str(&contents),
        Format::Toml => from_toml_str(&contents),
    }
}

/// Load a graph description from path and run validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads JSON or TOML (by file extension).
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks run options, and in strict mode the task names.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<GraphFile> {
    let raw = load_from_path(&path)?;
    let graph_file = GraphFile::try_from(raw)?;
    Ok(graph_file)
}
