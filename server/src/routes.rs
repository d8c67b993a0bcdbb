//! Route table for the todos server.

use crate::config::ServerConfig;
use crate::handlers::{assets, metrics, todos};
use crate::repository::TodoRepository;
use axum::extract::Request;
use http::Method;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use todos_web::{RequestRouter, RouteError, handlers::health, handlers::observers};
use tokio::sync::broadcast;

/// Shared state captured by the route handlers
#[derive(Clone)]
pub struct AppState {
    /// Items created through the API
    pub repository: Arc<TodoRepository>,
    /// Directory static assets are served from
    pub public_dir: Arc<PathBuf>,
    /// Prometheus handle; `/metrics` is only routed when set
    pub metrics: Option<PrometheusHandle>,
    /// Fires once when the server starts shutting down
    pub shutdown: broadcast::Sender<()>,
}

impl AppState {
    /// Create state for `config`, without metrics
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            repository: Arc::new(TodoRepository::new(config.feed_capacity)),
            public_dir: Arc::new(config.public_dir()),
            metrics: None,
            shutdown,
        }
    }

    /// Expose `handle` at `GET /metrics`
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("repository", &self.repository)
            .field("public_dir", &self.public_dir)
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

/// Build the route table
///
/// Routes are registered most specific first; the static asset route is a
/// catch-all and must stay last.
///
/// # Errors
///
/// Returns [`RouteError`] if a pattern is invalid.
pub fn build_router(state: &AppState, timeout: Duration) -> Result<RequestRouter, RouteError> {
    let mut router = RequestRouter::new().with_timeout(timeout);

    router.register(Method::GET, "/health", health::health_check)?;

    let repository = Arc::clone(&state.repository);
    router.register(Method::GET, "/api/todos", move |_request: Request| {
        todos::list(Arc::clone(&repository))
    })?;

    let repository = Arc::clone(&state.repository);
    router.register(Method::POST, "/api/todos", move |request: Request| {
        todos::create(Arc::clone(&repository), request)
    })?;

    let repository = Arc::clone(&state.repository);
    let shutdown = state.shutdown.clone();
    router.register(Method::GET, "/api/observers", move |request: Request| {
        observers::stream(request, repository.subscribe(), shutdown.subscribe())
    })?;

    if let Some(handle) = state.metrics.clone() {
        router.register(Method::GET, "/metrics", move |_request: Request| {
            metrics::render(handle.clone())
        })?;
    }

    let public_dir = Arc::clone(&state.public_dir);
    router.register(Method::GET, "/*path", move |request: Request| {
        assets::serve(Arc::clone(&public_dir), request)
    })?;

    Ok(router)
}
