//! Error type for the I/O and configuration layers.
//!
//! The numeric core never fails; it yields [`crate::types::Estimate::Undefined`]
//! instead. Errors here come from reading configuration and writing outputs.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised outside the computation layer.
#[derive(Debug, Error)]
pub enum LabError {
    /// Configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid YAML for [`crate::config::LabConfig`].
    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_yaml_ng::Error),

    /// A configuration value is out of range.
    #[error("invalid config value for `{field}`: {reason}")]
    ConfigValue { field: &'static str, reason: String },

    /// Filesystem error while writing an output.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV serialization failed.
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Temporary output could not be moved into place (e.g. destination locked).
    #[error("could not replace {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Chart backend failure.
    #[error("chart rendering failed for {view}: {reason}")]
    Chart { view: String, reason: String },
}

pub type Result<T> = std::result::Result<T, LabError>;
