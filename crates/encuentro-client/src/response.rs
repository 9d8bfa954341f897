//! Captured HTTP responses.

use encuentro_core::json::is_subset;
use serde_json::Value;

use crate::error::{ClientError, Result};

/// A fully-received HTTP response, detached from the connection.
///
/// Snapshots are plain values: once one exists, the round-trip is over and
/// every field is safe to assert against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase for the status code.
    ///
    /// This is the canonical phrase for the code, not the bytes from the
    /// wire: hyper does not retain the server's phrase, so a non-standard
    /// one is not observable here. Empty for codes without a canonical
    /// phrase.
    pub reason: String,
    /// Response body, verbatim.
    pub body: String,
}

impl ResponseSnapshot {
    /// Drains a `reqwest` response into a snapshot.
    ///
    /// # Errors
    /// Returns an error if the body cannot be read.
    pub async fn capture(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let reason = status.canonical_reason().unwrap_or_default().to_string();
        let body = response.text().await?;
        Ok(Self {
            status: status.as_u16(),
            reason,
            body,
        })
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    /// Returns an error if the body is not valid JSON.
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Parses the body as a typed value.
    ///
    /// # Errors
    /// Returns an error if the body does not deserialize into `T`.
    pub fn json_as<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Returns true if the JSON body contains `expected` as a structural
    /// subset. A non-JSON body never matches.
    #[must_use]
    pub fn body_contains(&self, expected: &Value) -> bool {
        self.json()
            .map_or(false, |actual| is_subset(expected, &actual))
    }

    /// Converts the snapshot into an error unless the status is 2xx.
    ///
    /// # Errors
    /// Returns [`ClientError::UnexpectedStatus`] for non-success statuses.
    pub fn into_success(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::unexpected_status(self.status, self.body))
        }
    }
}
