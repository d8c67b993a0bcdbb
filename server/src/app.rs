//! Server lifecycle: bind, serve, shut down.

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::routes::{AppState, build_router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::future::{Future, IntoFuture};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// A configured todos server
#[derive(Debug)]
pub struct TodoServer {
    config: ServerConfig,
    state: AppState,
}

impl TodoServer {
    /// Create a server for `config`
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let state = AppState::new(&config);
        Self { config, state }
    }

    /// Serve Prometheus metrics at `GET /metrics`
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.state = self.state.with_metrics(handle);
        self
    }

    /// Shared handler state
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Server configuration
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The complete axum application
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Route`] if the route table cannot be built.
    pub fn app(&self) -> Result<axum::Router, ServerError> {
        let router = build_router(&self.state, self.config.request_timeout())?;
        info!(routes = router.len(), "Route table built");
        Ok(router.into_app())
    }

    /// Bind the configured address
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the address cannot be bound.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = self.config.bind_address();
        info!(address = %address, "Starting HTTP server");
        Ok(TcpListener::bind(&address).await?)
    }

    /// Serve on `listener` until `signal` completes
    ///
    /// When `signal` completes, observer sockets are told to close and the
    /// server stops accepting connections. In-flight requests then get up to
    /// the configured shutdown timeout to finish.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if serving fails and
    /// [`ServerError::ShutdownTimeout`] if connections outlive the shutdown
    /// timeout.
    pub async fn run<F>(self, listener: TcpListener, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.app()?;
        info!(address = %listener.local_addr()?, "Server listening");

        let notify = self.state.shutdown.clone();
        let mut stopping = self.state.shutdown.subscribe();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            signal.await;
            info!("Closing observer sockets");
            let _ = notify.send(());
        });
        let mut task = tokio::spawn(server.into_future());

        tokio::select! {
            result = &mut task => return Ok(result??),
            _ = stopping.recv() => {},
        }

        let grace = self.config.shutdown_timeout();
        if let Ok(result) = tokio::time::timeout(grace, &mut task).await {
            result??;
            info!("Server stopped");
            Ok(())
        } else {
            warn!(timeout_secs = grace.as_secs(), "Connections still open, aborting server");
            task.abort();
            Err(ServerError::ShutdownTimeout(grace))
        }
    }
}

/// Completes on Ctrl+C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
