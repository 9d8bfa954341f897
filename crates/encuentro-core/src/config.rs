//! Environment-driven harness configuration.
//!
//! The harness is configured the way the surrounding test runner launches
//! it: through `ENCUENTRO_*` environment variables with defaults that match
//! a dispatch server listening on localhost. Values are validated at load
//! time so a misconfigured scenario fails before any process is spawned.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// How to launch the dispatch server under test.
pub const ENV_SERVER_CMD: &str = "ENCUENTRO_SERVER_CMD";
/// Base URL of the control API.
pub const ENV_CONTROL_URL: &str = "ENCUENTRO_CONTROL_URL";
/// Base URL of the data API.
pub const ENV_DATA_URL: &str = "ENCUENTRO_DATA_URL";
/// Base URL of the user-facing endpoint.
pub const ENV_USER_URL: &str = "ENCUENTRO_USER_URL";
/// Boot-readiness timeout, plain seconds or a humantime string.
pub const ENV_BOOT_TIMEOUT: &str = "ENCUENTRO_BOOT_TIMEOUT";
/// Verbose-logging flag.
pub const ENV_DEBUG: &str = "ENCUENTRO_DEBUG";
/// Parent directory for per-scenario mailbox directories.
pub const ENV_MAILBOX_BASE: &str = "ENCUENTRO_MAILBOX_BASE";

/// Harness configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Command line used to launch the dispatch server.
    pub server_cmd: String,

    /// Base URL of the control API (route CRUD, handler resources).
    pub control_url: String,

    /// Base URL of the data API.
    pub data_url: String,

    /// Base URL of the user-facing endpoint end-user traffic goes through.
    pub user_url: String,

    /// How long to wait for the server's APIs to become reachable.
    pub boot_timeout: Duration,

    /// Turns the default log filter up to `debug`.
    pub debug: bool,

    /// Parent directory under which scenario mailboxes are created.
    pub mailbox_base: PathBuf,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            server_cmd: "dispatchd".to_string(),
            control_url: "http://localhost:8081".to_string(),
            data_url: "http://localhost:8080".to_string(),
            user_url: "http://localhost:8080".to_string(),
            boot_timeout: Duration::from_secs(10),
            debug: false,
            mailbox_base: PathBuf::from("/tmp/wip"),
        }
    }
}

impl HarnessConfig {
    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if a variable holds an unparseable value or the
    /// resulting configuration fails validation.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns an error if a value cannot be parsed or validation fails.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            server_cmd: lookup(ENV_SERVER_CMD).unwrap_or(defaults.server_cmd),
            control_url: lookup(ENV_CONTROL_URL).unwrap_or(defaults.control_url),
            data_url: lookup(ENV_DATA_URL).unwrap_or(defaults.data_url),
            user_url: lookup(ENV_USER_URL).unwrap_or(defaults.user_url),
            boot_timeout: match lookup(ENV_BOOT_TIMEOUT) {
                Some(raw) => parse_timeout(&raw)?,
                None => defaults.boot_timeout,
            },
            debug: match lookup(ENV_DEBUG) {
                Some(raw) => parse_flag(&raw)?,
                None => defaults.debug,
            },
            mailbox_base: lookup(ENV_MAILBOX_BASE)
                .map_or(defaults.mailbox_base, PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if any setting is empty or malformed.
    pub fn validate(&self) -> Result<()> {
        if self.server_cmd.split_whitespace().next().is_none() {
            return Err(ConfigError::missing("server command is empty"));
        }
        for (var, url) in [
            (ENV_CONTROL_URL, &self.control_url),
            (ENV_DATA_URL, &self.data_url),
            (ENV_USER_URL, &self.user_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::invalid(var, format!("not an http url: {url}")));
            }
        }
        if self.boot_timeout.is_zero() {
            return Err(ConfigError::invalid(ENV_BOOT_TIMEOUT, "must be non-zero"));
        }
        if self.mailbox_base.as_os_str().is_empty() {
            return Err(ConfigError::invalid(ENV_MAILBOX_BASE, "must be non-empty"));
        }
        Ok(())
    }
}

/// Parses a timeout given either as plain seconds (`"10"`) or as a
/// humantime string (`"10s"`, `"1m 30s"`).
fn parse_timeout(raw: &str) -> Result<Duration> {
    if let Ok(secs) = raw.trim().parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(raw.trim())
        .map_err(|e| ConfigError::invalid(ENV_BOOT_TIMEOUT, e.to_string()))
}

/// Parses a boolean flag.
fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(ENV_DEBUG, format!("not a flag: {other}"))),
    }
}
