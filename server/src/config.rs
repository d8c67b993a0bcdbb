//! Server configuration.
//!
//! Loaded from environment variables (after `.env`, see the binary). Every
//! setting has a default; the base path falls back to the directory of the
//! running executable so a deployed binary finds the `public/` directory next
//! to it.

use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
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

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Per-request handler timeout, in seconds
    pub request_timeout_secs: u64,
    /// Items buffered per observer before a slow socket starts lagging
    pub feed_capacity: usize,
    /// How long shutdown waits for open connections, in seconds
    pub shutdown_timeout_secs: u64,
    /// Directory containing `public/`
    pub base_path: PathBuf,
}

impl ServerConfig {
    /// Default port, shared with the client's default server URL
    pub const DEFAULT_PORT: u16 = 49185;

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
        let host = lookup("TODOS_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "TODOS_PORT", Self::DEFAULT_PORT, "a port number")?;
        let request_timeout_secs = parse_or(
            &lookup,
            "TODOS_REQUEST_TIMEOUT_SECS",
            30,
            "a whole number of seconds",
        )?;
        let feed_capacity = parse_or(&lookup, "TODOS_FEED_CAPACITY", 64, "a positive number")?;
        if feed_capacity == 0 {
            return Err(ConfigError::Invalid {
                name: "TODOS_FEED_CAPACITY",
                value: "0".to_string(),
                expected: "a positive number",
            });
        }
        let shutdown_timeout_secs = parse_or(
            &lookup,
            "TODOS_SHUTDOWN_TIMEOUT_SECS",
            10,
            "a whole number of seconds",
        )?;
        let base_path = lookup("TODOS_BASE_PATH").map_or_else(executable_dir, PathBuf::from);

        Ok(Self {
            host,
            port,
            request_timeout_secs,
            feed_capacity,
            shutdown_timeout_secs,
            base_path,
        })
    }

    /// Address to bind, as `host:port`
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parsed bind address, if `host` is an IP literal
    #[must_use]
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.bind_address().parse().ok()
    }

    /// Directory static assets are served from
    #[must_use]
    pub fn public_dir(&self) -> PathBuf {
        self.base_path.join("public")
    }

    /// Per-request timeout as a [`Duration`]
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Shutdown wait as a [`Duration`]
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn parse_or<F, T>(
    lookup: &F,
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            name,
            value,
            expected,
        }),
        None => Ok(default),
    }
}

fn executable_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
