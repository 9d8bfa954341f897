//! Releasing held-open handlers and joining their requests.

use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use encuentro_client::{PendingRequest, ResponseSnapshot};
use encuentro_core::types::HandlerId;

use crate::error::{Result, SyncError};
use crate::rendezvous::Handshake;

/// Capability for one live handler instance.
///
/// The server-minted handler id is the identity used for control-plane
/// lookups; the process id is retained only as the OS-level termination
/// mechanism. Holding the pair keeps "the handler I rendezvoused with" and
/// "the process I am about to signal" the same thing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerHandle {
    handler_id: HandlerId,
    pid: i32,
}

impl HandlerHandle {
    /// Creates a handle from a handler id and its process id.
    #[must_use]
    pub fn new(handler_id: HandlerId, pid: i32) -> Self {
        Self { handler_id, pid }
    }

    /// Returns the server-minted handler id.
    #[must_use]
    pub fn handler_id(&self) -> &HandlerId {
        &self.handler_id
    }

    /// Returns the handler's OS process id.
    #[must_use]
    pub const fn pid(&self) -> i32 {
        self.pid
    }
}

impl From<Handshake> for HandlerHandle {
    fn from(shake: Handshake) -> Self {
        Self::new(shake.handler_id, shake.pid)
    }
}

impl std::fmt::Display for HandlerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (pid {})", self.handler_id, self.pid)
    }
}

/// Coordinates the release of a handler that is intentionally holding its
/// request open.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleController;

impl LifecycleController {
    /// Creates a controller.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns true if the handler's process still exists (signal-0 probe).
    #[must_use]
    pub fn is_alive(&self, handle: &HandlerHandle) -> bool {
        kill(Pid::from_raw(handle.pid), None).is_ok()
    }

    /// Delivers SIGTERM to the handler, unblocking it.
    ///
    /// Release is terminal: a second release of the same handler reports
    /// [`SyncError::HandlerGone`]. A dead handler at first release is the
    /// same error, because it means the rendezvous lied about what was
    /// live, which is a protocol violation upstream.
    ///
    /// # Errors
    /// [`SyncError::HandlerGone`] if the process no longer exists,
    /// [`SyncError::Signal`] for any other delivery failure.
    pub fn release(&self, handle: &HandlerHandle) -> Result<()> {
        tracing::debug!(handler = %handle, "releasing handler");
        match kill(Pid::from_raw(handle.pid), Signal::SIGTERM) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => Err(SyncError::HandlerGone(handle.pid)),
            Err(errno) => Err(SyncError::Signal(format!(
                "SIGTERM to pid {} failed: {errno}",
                handle.pid
            ))),
        }
    }

    /// Releases the handler, then joins the request it was holding open.
    ///
    /// After this returns, the HTTP response is fully received and safe to
    /// assert against.
    ///
    /// # Errors
    /// Fails if signal delivery fails or the join exceeds `deadline`.
    pub async fn release_and_join(
        &self,
        handle: &HandlerHandle,
        pending: PendingRequest,
        deadline: Duration,
    ) -> Result<ResponseSnapshot> {
        self.release(handle)?;
        let snapshot = pending.join(deadline).await?;
        tracing::debug!(handler = %handle, status = snapshot.status, "request joined");
        Ok(snapshot)
    }
}
