//! Failure taxonomy for the quote pipeline.
//!
//! Outbound calls fail with [`QuoteError`]. Storage failures are a separate
//! type, [`PersistenceError`], and there is deliberately no conversion between
//! the two: a failed write must never surface through the request's error path.

use std::time::Duration;
use thiserror::Error;

/// Why an outbound HTTP call did not produce a body.
#[derive(Error, Debug)]
pub enum RequestFailure {
    /// The HTTP client itself could not be built.
    #[error("could not build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    /// Connection, TLS or body-read error.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The peer answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    /// The call was cancelled because its deadline passed.
    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// Errors surfaced by the upstream fetch and by the bounded requester.
#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("request to {url} failed: {cause}")]
    RequestFailed {
        url: String,
        #[source]
        cause: RequestFailure,
    },

    #[error("failed to decode response: {0}")]
    DecodeFailed(String),
}

impl QuoteError {
    pub(crate) fn request(url: &str, cause: RequestFailure) -> Self {
        QuoteError::RequestFailed {
            url: url.to_string(),
            cause,
        }
    }

    /// True when the failure was the deadline firing rather than the peer misbehaving.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(
            self,
            QuoteError::RequestFailed {
                cause: RequestFailure::DeadlineExceeded(_),
                ..
            }
        )
    }
}

impl From<serde_json::Error> for QuoteError {
    fn from(err: serde_json::Error) -> Self {
        QuoteError::DecodeFailed(err.to_string())
    }
}

/// Errors from the best-effort storage write.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("could not open quote store: {0}")]
    Connect(#[source] rusqlite::Error),

    #[error("insert statement failed: {0}")]
    Statement(#[source] rusqlite::Error),

    #[error("insert exceeded its {0:?} budget")]
    DeadlineExceeded(Duration),

    /// The blocking worker running the insert panicked or was aborted.
    #[error("storage worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
