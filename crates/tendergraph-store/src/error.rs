//! Store-layer errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("document store returned {status} for {url}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("collection '{0}' not found")]
    CollectionNotFound(String),

    #[error("malformed document store response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("checkpoint storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Transient errors are worth retrying; the rest fail immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            StoreError::UnexpectedStatus { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}
