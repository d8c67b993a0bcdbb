//! # Todos Server
//!
//! HTTP side of the todos system: one catch-all entry point dispatching
//! through a [`todos_web::RequestRouter`] to
//!
//! - `GET /health`
//! - `GET /api/todos` and `POST /api/todos`, backed by an in-memory
//!   [`TodoRepository`]
//! - `GET /api/observers`, a websocket that pushes every created item
//! - `GET /metrics`, when a Prometheus recorder is installed
//! - `GET /*path`, static assets from `<base>/public`
//!
//! # Example
//!
//! ```no_run
//! use todos_server::{ServerConfig, TodoServer, shutdown_signal};
//!
//! # async fn example() -> Result<(), todos_server::ServerError> {
//! let server = TodoServer::new(ServerConfig::from_env()?);
//! let listener = server.bind().await?;
//! server.run(listener, shutdown_signal()).await?;
//! # Ok(())
//! # }
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod repository;
pub mod routes;

pub use app::{TodoServer, shutdown_signal};
pub use config::{ConfigError, ServerConfig};
pub use error::ServerError;
pub use repository::TodoRepository;
pub use routes::{AppState, build_router};
