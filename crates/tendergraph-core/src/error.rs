//! Centralized error types for the sync pipeline.

use thiserror::Error;

/// A single document could not be mapped to graph elements.
///
/// Recovered locally by the sync engine: the document is skipped and the
/// failure is recorded in the report. Never aborts a batch.
#[derive(Error, Debug)]
pub enum MapperError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' has unexpected type: expected {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("{0}")]
    Invalid(String),
}

impl MapperError {
    /// Create a generic invalid-document error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Invalid run configuration, detected before any I/O. Fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no mapper registered for collection '{0}'")]
    UnknownCollection(String),

    #[error("unknown enrichment rule '{0}'")]
    UnknownRule(String),

    #[error("batch size must be positive")]
    InvalidBatchSize,

    #[error("retry policy must allow at least one attempt")]
    InvalidRetryPolicy,
}
