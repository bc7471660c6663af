use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the subscription LTV analytics.
#[derive(Error, Debug)]
pub enum LtvError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV document could not be parsed.
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A row violates one of the record invariants.
    #[error("Invalid record at line {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },

    /// A status string is not one of the recognised lifecycle states.
    #[error("Invalid subscription status: {0}")]
    InvalidStatus(String),

    /// An epoch-millisecond value could not be turned into a timestamp.
    #[error("Invalid timestamp: {0}")]
    TimestampParse(String),

    /// The input path does not exist.
    #[error("Input path not found: {0}")]
    InputNotFound(PathBuf),

    /// No CSV files were found under the given directory.
    #[error("No CSV files found in {0}")]
    NoDataFiles(PathBuf),

    /// The input contained no usable records.
    #[error("Dataset is empty")]
    EmptyDataset,

    /// A chart could not be drawn or written.
    #[error("Chart error: {0}")]
    Chart(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be produced or parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the LTV crates.
pub type Result<T> = std::result::Result<T, LtvError>;
