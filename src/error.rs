use std::path::PathBuf;

use thiserror::Error;

/// Structural problems in CSV or JSON input.
///
/// Malformed *numeric* cells are never a `ParseError`; they read as `0.0`.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("input has no header row")]
    MissingHeader,

    #[error("header column {index} has an empty name")]
    EmptyColumn { index: usize },

    #[error("duplicate column name '{0}' in header")]
    DuplicateColumn(String),

    #[error("line {line}: expected at most {expected} fields, found {found}")]
    TooManyFields {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("record {index} has no value in any column and cannot be written as CSV")]
    EmptyRecord { index: usize },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a top-level JSON array of records")]
    NotAnArray,

    #[error("JSON row {index} is not an object")]
    NotAnObject { index: usize },
}

/// Failure to obtain a dataset. The previously loaded dataset stays active.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("unsupported data format: {0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("load worker stopped before reporting a result")]
    Disconnected,
}
