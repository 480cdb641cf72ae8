//! Policy error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or validating the constitution.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The constitution file does not exist.
    #[error("constitution file not found: {path}")]
    NotFound {
        /// The path that was searched.
        path: PathBuf,
    },

    /// The constitution file could not be read.
    #[error("failed to read constitution {path}: {source}")]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The constitution file is not valid YAML.
    #[error("failed to parse constitution {path}: {source}")]
    Parse {
        /// The file being parsed.
        path: PathBuf,
        /// The underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// The constitution parsed but failed validation.
    #[error("invalid constitution: {0}")]
    Validation(String),
}

/// Result type for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;
