//! Request routing for the todos server.
//!
//! The server exposes a single catch-all entry point. Every inbound request is
//! handed to a [`RequestRouter`], which matches it against a route table built
//! once at startup and dispatches it to an asynchronous handler.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at the axum fallback handler
//! 2. **Match** method and path against the route table (first registered wins)
//! 3. **Capture** path parameters into the request extensions
//! 4. **Invoke** the handler under the router's request timeout
//! 5. **Return** the handler's response unchanged, or a 404 / 405 / 408 error
//!
//! # Example
//!
//! ```
//! use todos_web::{RequestRouter, handlers::health};
//! use http::Method;
//!
//! # fn main() -> Result<(), todos_web::RouteError> {
//! let mut router = RequestRouter::new();
//! router.register(Method::GET, "/health", health::health_check)?;
//! let app: axum::Router = router.into_app();
//! # Ok(())
//! # }
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod router;

pub use error::AppError;
pub use router::{Handler, PathParams, RequestRouter, RouteError, RoutePattern};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
