//! Error types for the consistency pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A `DATE` cell did not match `YYYY-MM-DDTHH:MM:SS`.
    #[error("malformed timestamp '{value}' on data row {row}")]
    MalformedTimestamp { row: usize, value: String },

    /// The station table has no `DATE` column to group by.
    #[error("station table has no '{column}' column")]
    MissingDateColumn { column: String },

    /// A monthly table on disk does not have one row per calendar month.
    #[error("monthly table has {rows} rows, expected 12")]
    MalformedSeries { rows: usize },

    /// Ground-truth and computed listings cannot be paired one-to-one.
    #[error("cannot pair ground truth with computed outputs: {reason}")]
    PairingMismatch { reason: String },

    /// A parameter in the configuration has an invalid value.
    #[error("invalid configuration value for '{field}': {reason}")]
    Config { field: String, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// A per-file failure recorded by a batch stage instead of aborting the batch.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FileFailure {
    pub file: String,
    pub error: String,
}

impl FileFailure {
    pub fn new(file: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            file: file.into(),
            error: error.to_string(),
        }
    }
}
