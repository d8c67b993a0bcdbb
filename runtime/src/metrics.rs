//! Prometheus metrics for observability and monitoring.
//!
//! Components record through the `metrics` facade; this module installs the
//! Prometheus recorder once per process and describes every metric the
//! workspace emits:
//! - Store reducer execution and effects
//! - HTTP requests dispatched by the request router
//! - Items accepted by the server's create endpoint
//! - Remote sync submissions
//! - Push channel messages
//!
//! # Example
//!
//! ```rust,no_run
//! use todos_runtime::metrics::install_recorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = install_recorder()?;
//! println!("{}", handle.render());
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

// Re-export metrics macros for use in other crates
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Install the global Prometheus recorder and return a handle for rendering.
///
/// # Errors
///
/// Returns [`MetricsError::Install`] if a recorder is already installed in this
/// process, or [`MetricsError::Build`] if the histogram buckets are rejected.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[
                0.000_1, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    register_metrics();
    tracing::info!("Prometheus metrics recorder installed");

    Ok(handle)
}

/// Register all metric descriptions.
fn register_metrics() {
    // Store
    describe_counter!("store.actions.total", "Total number of actions sent to stores");
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time taken to execute reducers"
    );
    describe_counter!("store.effects.executed", "Effects executed, by type");
    describe_counter!(
        "store.shutdown.rejected_actions",
        "Actions rejected because the store was shutting down"
    );

    // Router
    describe_counter!("http.requests.total", "Requests dispatched, by status");
    describe_histogram!(
        "http.request.duration_seconds",
        "Time taken by route handlers"
    );

    // Server
    describe_counter!("todos.created.total", "Items accepted by the create endpoint");

    // Client
    describe_counter!("sync.submissions.total", "Remote item submissions, by outcome");
    describe_counter!("push.messages.total", "Push channel messages, by outcome");
}
