//! Run loader.
//!
//! Discovers result files in a flat directory and parses each into a
//! [`SimRecord`]. Files are returned sorted by path; parse failures are kept
//! per file so the caller decides whether to skip or tally them.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LoadError, SchemaError};
use crate::types::{record_name, SimRecord};

/// Where and what to load.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Directory holding one result file per run.
    pub dir: PathBuf,
    /// Extension (without the dot) that marks a result file.
    pub extension: String,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./tests/out"),
            extension: "json".to_string(),
        }
    }
}

impl LoadConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }
}

/// One result file and its parse outcome.
#[derive(Debug, Clone)]
pub struct LoadedRun {
    /// File name without extension.
    pub name: String,
    pub path: PathBuf,
    pub record: Result<SimRecord, SchemaError>,
}

/// Lists result files directly inside `config.dir`, sorted by path.
///
/// A missing directory is treated like an empty one.
pub fn discover(config: &LoadConfig) -> Result<Vec<PathBuf>, LoadError> {
    let no_input = || LoadError::NoInput {
        dir: config.dir.clone(),
        extension: config.extension.clone(),
    };

    if !config.dir.is_dir() {
        return Err(no_input());
    }

    let io_err = |source| LoadError::Io {
        dir: config.dir.clone(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(&config.dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == config.extension.as_str()) {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(no_input());
    }

    files.sort();
    log::debug!(
        "found {} result files in {}",
        files.len(),
        config.dir.display()
    );
    Ok(files)
}

/// Reads and parses one result file.
pub fn load_run(path: &Path) -> LoadedRun {
    let file = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

    let record = fs::read_to_string(path)
        .map_err(|e| SchemaError::Unreadable {
            file: file.clone(),
            reason: e.to_string(),
        })
        .and_then(|content| SimRecord::from_json(&file, &content));

    if let Err(e) = &record {
        log::debug!("rejected {}: {e}", path.display());
    }

    LoadedRun {
        name: record_name(&file),
        path: path.to_path_buf(),
        record,
    }
}

/// Discovers and parses every result file, in path order.
pub fn load_runs(config: &LoadConfig) -> Result<Vec<LoadedRun>, LoadError> {
    Ok(discover(config)?.iter().map(|p| load_run(p)).collect())
}
