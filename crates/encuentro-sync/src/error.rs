//! Synchronization error types.
//!
//! Per the harness's propagation policy, none of these are retried: every
//! failure in a synchronization primitive terminates the scenario.

use std::time::Duration;

/// Result type alias for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors from the rendezvous, discovery, and lifecycle primitives.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A bounded wait ran out of time.
    #[error("synchronization timed out waiting for {waiting_for} after {deadline:?}")]
    TimedOut {
        /// What the driver was waiting on.
        waiting_for: &'static str,
        /// The deadline that elapsed.
        deadline: Duration,
    },

    /// A handshake line arrived but could not be parsed.
    #[error("malformed handshake: {0}")]
    Handshake(String),

    /// The handler process no longer exists; release is terminal.
    #[error("handler process {0} is already gone")]
    HandlerGone(i32),

    /// Signal delivery failed for a reason other than a dead process.
    #[error("signal delivery failed: {0}")]
    Signal(String),

    /// The mailbox directory or a marker inside it is unusable.
    #[error("mailbox error: {0}")]
    Mailbox(String),

    /// The filesystem watcher could not be installed.
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    /// I/O error on the FIFO or a marker file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The joined background request failed.
    #[error("request error: {0}")]
    Client(#[from] encuentro_client::ClientError),
}

impl SyncError {
    /// Creates a timed-out error.
    #[must_use]
    pub const fn timed_out(waiting_for: &'static str, deadline: Duration) -> Self {
        Self::TimedOut {
            waiting_for,
            deadline,
        }
    }

    /// Creates a malformed-handshake error.
    #[must_use]
    pub fn handshake(msg: impl Into<String>) -> Self {
        Self::Handshake(msg.into())
    }

    /// Creates a mailbox error.
    #[must_use]
    pub fn mailbox(msg: impl Into<String>) -> Self {
        Self::Mailbox(msg.into())
    }

    /// Returns true if this is a deadline expiry rather than a protocol
    /// violation.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_out_display() {
        let err = SyncError::timed_out("handshake", Duration::from_secs(5));
        assert_eq!(
            err.to_string(),
            "synchronization timed out waiting for handshake after 5s"
        );
        assert!(err.is_timeout());
    }

    #[test]
    fn test_handler_gone_display() {
        let err = SyncError::HandlerGone(4242);
        assert!(err.to_string().contains("4242"));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no fifo");
        let err: SyncError = io.into();
        assert!(err.to_string().contains("I/O error"));
    }
}
