//! Server error type.

use crate::config::ConfigError;
use std::time::Duration;
use thiserror::Error;
use todos_runtime::metrics::MetricsError;
use todos_web::RouteError;

/// Errors starting or stopping the server
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The route table could not be built
    #[error("Routing error: {0}")]
    Route(#[from] RouteError),

    /// The metrics recorder could not be installed
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    /// Binding or serving failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server task panicked or was cancelled
    #[error("Server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Connections were still open when the shutdown wait ran out
    #[error("Shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),
}
