//! Client configuration.
//!
//! Loaded from environment variables (after `.env`, see the binary) with
//! defaults for everything.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors loading configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed
    #[error("Invalid value {value:?} for {name}: expected {expected}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Value found
        value: String,
        /// What was expected
        expected: &'static str,
    },
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the todos server
    pub server_url: String,
    /// Directory the list is persisted in
    pub data_dir: PathBuf,
    /// Timeout for submitting one item, in seconds
    pub sync_timeout_secs: u64,
    /// Whether new items are submitted to the server at all
    pub sync_enabled: bool,
}

impl ClientConfig {
    /// Default server URL
    pub const DEFAULT_SERVER_URL: &'static str = "http://localhost:49185";

    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a variable is set to an unusable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_url =
            lookup("TODOS_SERVER_URL").unwrap_or_else(|| Self::DEFAULT_SERVER_URL.to_string());

        let data_dir = lookup("TODOS_DATA_DIR").map_or_else(default_data_dir, PathBuf::from);

        let sync_timeout_secs = match lookup("TODOS_SYNC_TIMEOUT_SECS") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "TODOS_SYNC_TIMEOUT_SECS",
                        value,
                        expected: "a positive whole number of seconds",
                    });
                },
            },
            None => 10,
        };

        let sync_enabled = match lookup("TODOS_SYNC_ENABLED") {
            Some(value) => parse_bool(&value).ok_or(ConfigError::Invalid {
                name: "TODOS_SYNC_ENABLED",
                value,
                expected: "true or false",
            })?,
            None => true,
        };

        Ok(Self {
            server_url,
            data_dir,
            sync_timeout_secs,
            sync_enabled,
        })
    }

    /// Submission timeout as a [`Duration`]
    #[must_use]
    pub const fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout_secs)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("todos")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
