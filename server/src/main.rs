//! `todos-server` - serves the todos API, observer socket and static assets.
//!
//! # Environment Variables
//!
//! - `TODOS_HOST`, `TODOS_PORT`: bind address (default `0.0.0.0:49185`)
//! - `TODOS_BASE_PATH`: directory containing `public/` (default: next to the binary)
//! - `TODOS_REQUEST_TIMEOUT_SECS`, `TODOS_SHUTDOWN_TIMEOUT_SECS`, `TODOS_FEED_CAPACITY`
//! - `RUST_LOG`: log filter

use todos_runtime::metrics::install_recorder;
use todos_server::{ServerConfig, TodoServer, shutdown_signal};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file (if present)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todos_server=info,todos_web=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    info!("Starting todos server");

    let config = ServerConfig::from_env()?;
    info!(
        address = %config.bind_address(),
        public_dir = %config.public_dir().display(),
        "Configuration loaded"
    );

    let metrics = install_recorder()?;
    let server = TodoServer::new(config).with_metrics(metrics);

    let listener = server.bind().await?;
    server.run(listener, shutdown_signal()).await?;

    info!("Shutdown complete");
    Ok(())
}
