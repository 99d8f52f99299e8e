use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------
//
// Validation and filter-construction failures must reach the caller
// distinguishably from "zero matches", so every layer gets its own typed
// error and the facade composes them into `QueryError`.

/// One bad field in one raw row. Recoverable at load time; the loader
/// decides whether it aborts the load or skips the row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("column '{column}': {reason}")]
pub struct SchemaViolation {
    pub column: String,
    pub reason: String,
}

impl SchemaViolation {
    pub fn new(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            reason: reason.into(),
        }
    }
}

/// Fatal outcome of one load attempt: unreadable source, missing schema
/// columns, or more malformed rows than the policy tolerates.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed delimited source: {0}")]
    Csv(#[from] csv::Error),

    #[error("source header is missing schema column '{0}'")]
    MissingColumn(String),

    #[error("{invalid_rows} of {total_rows} rows failed validation")]
    TooManyInvalid {
        invalid_rows: usize,
        total_rows: usize,
    },
}

/// Caller misuse of the filter engine. Surfaced immediately so a
/// misconfigured filter never masquerades as "no matches".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("unknown filter field '{0}'")]
    UnknownField(String),

    #[error("invalid range for '{field}': min {min} > max {max}")]
    InvalidRange { field: String, min: i64, max: i64 },

    #[error("range predicate on non-integer field '{0}'")]
    RangeOnNonInteger(String),
}

/// The prediction subsystem is not ready: the artifact failed to load, or it
/// does not line up with the record it was asked to score. The service fails
/// closed with this error rather than inventing a default label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("model unavailable: {reason}")]
pub struct ModelUnavailable {
    pub reason: String,
}

impl ModelUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Everything a `query` call can fail with, as seen by the presentation
/// layer.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A previous load attempt failed; the dataset stays unavailable until an
    /// explicit reload.
    #[error("dataset unavailable: {0}")]
    DatasetUnavailable(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Model(#[from] ModelUnavailable),
}
