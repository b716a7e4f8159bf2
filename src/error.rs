//! Error taxonomy for loading and parsing simulator results.
//!
//! Invariant violations are not errors; see [`crate::checker::Violation`].

use std::path::PathBuf;

use thiserror::Error;

/// A result file that cannot be turned into a [`crate::types::SimRecord`].
///
/// Every variant names the file it came from so the diagnostic can be
/// attributed without extra context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{file}: cannot read file: {reason}")]
    Unreadable { file: String, reason: String },

    #[error("{file}: not a valid JSON document: {reason}")]
    InvalidJson { file: String, reason: String },

    #[error("{file}: missing required field `{field}`")]
    MissingField { file: String, field: String },

    #[error("{file}: malformed field `{field}`: {reason}")]
    MalformedField {
        file: String,
        field: String,
        reason: String,
    },

    #[error("{file}: record has no cores (`{field}` is empty)")]
    NoCores { file: String, field: String },

    #[error("{file}: `{field}` has {found} entries, expected {expected} (one per core)")]
    CoreCountMismatch {
        file: String,
        field: String,
        expected: usize,
        found: usize,
    },

    #[error("{file}: single-core validation requires exactly 1 core, found {cores}")]
    NotSingleCore { file: String, cores: usize },

    #[error("{file}: multi-core validation requires at least 2 cores, found {cores}")]
    NotMultiCore { file: String, cores: usize },
}

impl SchemaError {
    /// The file the error is attributed to.
    pub fn file(&self) -> &str {
        match self {
            Self::Unreadable { file, .. }
            | Self::InvalidJson { file, .. }
            | Self::MissingField { file, .. }
            | Self::MalformedField { file, .. }
            | Self::NoCores { file, .. }
            | Self::CoreCountMismatch { file, .. }
            | Self::NotSingleCore { file, .. }
            | Self::NotMultiCore { file, .. } => file,
        }
    }
}

/// Failure to produce any input at all.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("No {} files in {}", extension.to_uppercase(), dir.display())]
    NoInput { dir: PathBuf, extension: String },

    #[error("failed to list {}: {source}", dir.display())]
    Io {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
