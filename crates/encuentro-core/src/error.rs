//! Error types for encuentro-core.

/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration errors.
///
/// Every variant is fatal: a harness with a broken configuration cannot
/// meaningfully run a scenario, so there is no recovery path.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held a value the harness cannot use.
    #[error("invalid value for {var}: {reason}")]
    Invalid {
        /// The environment variable name.
        var: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A required setting is missing or empty.
    #[error("missing configuration: {0}")]
    Missing(String),
}

impl ConfigError {
    /// Creates an invalid-value error.
    #[must_use]
    pub fn invalid(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Creates a missing-setting error.
    #[must_use]
    pub fn missing(msg: impl Into<String>) -> Self {
        Self::Missing(msg.into())
    }
}
