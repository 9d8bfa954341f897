//! Client error types.

use std::time::Duration;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by the control and data clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP call itself failed (connection refused, malformed URL, ...).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered, but not with the status the operation requires.
    #[error("unexpected status {status} (wanted success): {body}")]
    UnexpectedStatus {
        /// Status code the server returned.
        status: u16,
        /// Response body, verbatim, for the failure report.
        body: String,
    },

    /// A response body failed to parse as the expected JSON shape.
    #[error("malformed response body: {0}")]
    Json(#[from] serde_json::Error),

    /// A symbolic route position does not exist in the current listing.
    #[error("no {position} route in a listing of {len}")]
    PositionOutOfRange {
        /// The word form of the position ("first", "second", "last").
        position: &'static str,
        /// Number of routes the listing held.
        len: usize,
    },

    /// The background request task failed before producing a response.
    #[error("background request failed: {0}")]
    Background(String),

    /// Joining a background request exceeded its deadline.
    #[error("background request not finished after {0:?}")]
    JoinTimeout(Duration),
}

impl ClientError {
    /// Creates an unexpected-status error from a snapshot's parts.
    #[must_use]
    pub fn unexpected_status(status: u16, body: impl Into<String>) -> Self {
        Self::UnexpectedStatus {
            status,
            body: body.into(),
        }
    }
}
