//! Data-plane client: foreground and background requests.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::error::{ClientError, Result};
use crate::response::ResponseSnapshot;

/// Client for the dispatch server's data path.
///
/// Foreground requests are awaited inline. Background requests run on a
/// spawned task so the driver can keep operating against the still-open
/// request; the task is joined through the returned [`PendingRequest`].
#[derive(Debug, Clone)]
pub struct DataClient {
    user_base: String,
    data_base: String,
    http: reqwest::Client,
}

impl DataClient {
    /// Creates a client for the user-facing endpoint at `user_base` and the
    /// data API at `data_base`.
    #[must_use]
    pub fn new(user_base: impl Into<String>, data_base: impl Into<String>) -> Self {
        Self {
            user_base: trim_base(user_base.into()),
            data_base: trim_base(data_base.into()),
            http: reqwest::Client::new(),
        }
    }

    /// Issues a foreground GET through the user-facing endpoint.
    ///
    /// # Errors
    /// Fails only on transport errors; the status is surfaced verbatim.
    pub async fn get(&self, path: &str) -> Result<ResponseSnapshot> {
        let url = join_url(&self.user_base, path);
        tracing::debug!(%url, "foreground request");
        ResponseSnapshot::capture(self.http.get(&url).send().await?).await
    }

    /// Issues a foreground GET through the data API.
    ///
    /// # Errors
    /// Fails only on transport errors.
    pub async fn get_data(&self, path: &str) -> Result<ResponseSnapshot> {
        let url = join_url(&self.data_base, path);
        tracing::debug!(%url, "foreground data request");
        ResponseSnapshot::capture(self.http.get(&url).send().await?).await
    }

    /// Fires a GET through the user-facing endpoint on a background task.
    #[must_use]
    pub fn get_in_background(&self, path: &str) -> PendingRequest {
        self.spawn_background(join_url(&self.user_base, path))
    }

    /// Fires a GET through the data API on a background task.
    #[must_use]
    pub fn get_data_in_background(&self, path: &str) -> PendingRequest {
        self.spawn_background(join_url(&self.data_base, path))
    }

    fn spawn_background(&self, url: String) -> PendingRequest {
        tracing::debug!(%url, "background request");
        let http = self.http.clone();
        let task_url = url.clone();
        let task = tokio::spawn(async move {
            ResponseSnapshot::capture(http.get(&task_url).send().await?).await
        });
        PendingRequest { url, task }
    }
}

/// One in-flight HTTP call issued on a background task.
///
/// Owned exclusively by the step that created it; consumed by [`join`],
/// which makes double-joining impossible by construction.
///
/// [`join`]: PendingRequest::join
#[derive(Debug)]
pub struct PendingRequest {
    url: String,
    task: JoinHandle<Result<ResponseSnapshot>>,
}

impl PendingRequest {
    /// Returns the target URL of the in-flight call.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns true once the underlying task has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the response, bounded by `deadline`.
    ///
    /// After this returns `Ok`, the response is fully received and every
    /// snapshot field is safe to assert against.
    ///
    /// # Errors
    /// Fails with [`ClientError::JoinTimeout`] if the call does not finish
    /// in time, or [`ClientError::Background`] if the task itself died.
    pub async fn join(self, deadline: Duration) -> Result<ResponseSnapshot> {
        match tokio::time::timeout(deadline, self.task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(ClientError::Background(join_error.to_string())),
            Err(_elapsed) => Err(ClientError::JoinTimeout(deadline)),
        }
    }

    /// Abandons the in-flight call without waiting for it.
    pub fn abandon(self) {
        tracing::warn!(url = %self.url, "abandoning in-flight request");
        self.task.abort();
    }
}

fn trim_base(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}

fn join_url(base: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
