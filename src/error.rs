//! Error types for rankprep.
//!
//! Every failure here aborts the current batch run. Unknown n-grams and
//! unknown terms are not errors and never reach this module.

use thiserror::Error;

/// Errors raised while reading records or computing features and metrics.
#[derive(Debug, Error)]
pub enum Error {
    /// A record did not have the expected number of tab-separated fields
    #[error("Malformed row at line {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    /// A required key was absent from a model file
    #[error("Missing required key: {0}")]
    MissingKey(String),
    /// A key that must appear once was repeated in a model file
    #[error("Duplicate key {key:?} at line {line}")]
    DuplicateKey { line: usize, key: String },
    /// Marks, predictions and group ids are not aligned
    #[error(
        "Length mismatch: {marks} marks, {predictions} predictions, {groups} group ids"
    )]
    LengthMismatch {
        marks: usize,
        predictions: usize,
        groups: usize,
    },
    /// Nothing to reduce over
    #[error("Empty input: {0}")]
    EmptyInput(&'static str),
    /// A field that must be numeric could not be parsed
    #[error("Invalid number at line {line}: {value:?}")]
    InvalidNumber { line: usize, value: String },
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Config JSON could not be parsed
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
