//! Harness error types.

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Errors from server bootstrap and scenario wiring.
///
/// Setup failures and protocol violations are fatal and abort the
/// scenario; nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The server under test never became ready.
    #[error("boot failure: {0}")]
    Boot(String),

    /// The server process misbehaved after boot.
    #[error("server error: {0}")]
    Server(String),

    /// Graceful shutdown did not complete.
    #[error("shutdown error: {0}")]
    Shutdown(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] encuentro_core::ConfigError),

    /// Synchronization protocol error.
    #[error("sync error: {0}")]
    Sync(#[from] encuentro_sync::SyncError),

    /// Control- or data-plane client error.
    #[error("client error: {0}")]
    Client(#[from] encuentro_client::ClientError),

    /// Raw HTTP error from the readiness probe.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Creates a boot error.
    #[must_use]
    pub fn boot(msg: impl Into<String>) -> Self {
        Self::Boot(msg.into())
    }

    /// Creates a server error.
    #[must_use]
    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    /// Creates a shutdown error.
    #[must_use]
    pub fn shutdown(msg: impl Into<String>) -> Self {
        Self::Shutdown(msg.into())
    }
}
