use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the rainfall normalizer and its hosts.
#[derive(Error, Debug)]
pub enum PluvioError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The delimited text could not be split into rows.
    #[error("Failed to parse delimited text: {0}")]
    Csv(#[from] csv::Error),

    /// The batch as a whole cannot be normalized (too few rows, no columns).
    #[error("Malformed batch: {0}")]
    MalformedBatch(String),

    /// A history export holds no series for the requested entity.
    #[error("No history found for entity {0}")]
    EntityNotFound(String),

    /// A timestamp string did not match any recognised format.
    #[error("Invalid timestamp format: {0}")]
    TimestampParse(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the pluvio crates.
pub type Result<T> = std::result::Result<T, PluvioError>;
