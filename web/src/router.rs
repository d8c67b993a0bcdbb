//! Method and path based request dispatch.
//!
//! A [`RequestRouter`] owns an ordered route table. Routes are registered at
//! startup and the table is read-only once the router is turned into an axum
//! app with [`RequestRouter::into_app`].
//!
//! # Pattern syntax
//!
//! Patterns are `/`-separated segments:
//!
//! - `literal` matches exactly that segment
//! - `:name` captures one segment
//! - `*name` (last segment only) captures the remainder, possibly empty
//!
//! Trailing slashes are insignificant: `/api/todos/` and `/api/todos` are the
//! same path. When several routes match, the one registered first wins.

use crate::error::AppError;
use axum::{
    Router,
    extract::Request,
    response::{IntoResponse, Response},
};
use http::Method;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{debug, warn};

/// Boxed response future returned by [`Handler::call`]
pub type BoxResponseFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// An asynchronous request handler
///
/// Implemented for every `Fn(Request) -> impl Future<Output = impl IntoResponse>`
/// that is `Send + Sync + 'static`, so plain `async fn`s and closures can be
/// registered directly.
pub trait Handler: Send + Sync + 'static {
    /// Handle one request
    fn call(&self, request: Request) -> BoxResponseFuture;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    fn call(&self, request: Request) -> BoxResponseFuture {
        let response = self(request);
        Box::pin(async move { response.await.into_response() })
    }
}

/// Errors raised while building the route table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The pattern does not follow the route pattern syntax
    #[error("Invalid route pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The rejected pattern
        pattern: String,
        /// What is wrong with it
        reason: &'static str,
    },
}

impl RouteError {
    fn invalid(pattern: &str, reason: &'static str) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Rest(String),
}

/// A parsed route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Parse a pattern such as `/api/todos/:index` or `/*path`
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] if the pattern does not start with
    /// `/`, has an empty or repeated capture name, or has a `*` capture that is
    /// not the last segment.
    pub fn parse(pattern: &str) -> Result<Self, RouteError> {
        if !pattern.starts_with('/') {
            return Err(RouteError::invalid(pattern, "must start with '/'"));
        }

        let parts: Vec<&str> = split_path(pattern).collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut names: Vec<&str> = Vec::new();

        for (position, part) in parts.iter().enumerate() {
            let segment = if let Some(name) = part.strip_prefix(':') {
                Self::capture_name(pattern, name, &mut names)?;
                Segment::Param(name.to_string())
            } else if let Some(name) = part.strip_prefix('*') {
                if position + 1 != parts.len() {
                    return Err(RouteError::invalid(pattern, "'*' capture must be last"));
                }
                Self::capture_name(pattern, name, &mut names)?;
                Segment::Rest(name.to_string())
            } else {
                Segment::Literal((*part).to_string())
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    fn capture_name<'a>(
        pattern: &str,
        name: &'a str,
        seen: &mut Vec<&'a str>,
    ) -> Result<(), RouteError> {
        if name.is_empty() {
            return Err(RouteError::invalid(pattern, "empty capture name"));
        }
        if seen.contains(&name) {
            return Err(RouteError::invalid(pattern, "repeated capture name"));
        }
        seen.push(name);
        Ok(())
    }

    /// The pattern as registered
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a request path, returning the captured parameters
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<&str> = split_path(path).collect();
        let mut params = PathParams::default();

        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Rest(name) => {
                    let rest = parts.get(position..).unwrap_or_default().join("/");
                    params.insert(name, rest);
                    return Some(params);
                },
                Segment::Literal(literal) => {
                    if parts.get(position) != Some(&literal.as_str()) {
                        return None;
                    }
                },
                Segment::Param(name) => {
                    params.insert(name, (*parts.get(position)?).to_string());
                },
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }

    /// Whether two patterns match exactly the same paths
    fn same_shape(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    (Segment::Param(_), Segment::Param(_)) | (Segment::Rest(_), Segment::Rest(_)) => {
                        true
                    },
                    _ => false,
                })
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Path parameters captured by the matched route
///
/// Inserted into the request extensions before the handler runs.
///
/// ```ignore
/// let params = request.extensions().get::<PathParams>().cloned().unwrap_or_default();
/// let path = params.get("path").unwrap_or_default();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    fn insert(&mut self, name: &str, value: String) {
        self.0.insert(name.to_string(), value);
    }

    /// Value captured for `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Number of captured parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing was captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

struct Route {
    method: Method,
    pattern: RoutePattern,
    handler: Arc<dyn Handler>,
}

enum Resolution<'a> {
    Matched(&'a Route, PathParams),
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// Ordered route table with method and path dispatch
///
/// # Example
///
/// ```
/// use axum::extract::Request;
/// use todos_web::RequestRouter;
/// use http::Method;
/// use std::time::Duration;
///
/// # fn main() -> Result<(), todos_web::RouteError> {
/// let mut router = RequestRouter::new().with_timeout(Duration::from_secs(5));
/// router
///     .register(Method::GET, "/api/todos", |_req: Request| async { "[]" })?
///     .register(Method::POST, "/api/todos", |_req: Request| async { "created" })?;
/// assert_eq!(router.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct RequestRouter {
    routes: Vec<Route>,
    timeout: Duration,
}

impl RequestRouter {
    /// Handler timeout used unless [`RequestRouter::with_timeout`] is called
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create an empty router
    #[must_use]
    pub const fn new() -> Self {
        Self {
            routes: Vec::new(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Set the per-request handler timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of registered routes
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no route has been registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Register a handler for `method` and `pattern`
    ///
    /// Routes are tried in registration order. A route identical to an
    /// earlier one is accepted but can never be reached; this is logged.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] if the pattern cannot be parsed.
    pub fn register<H: Handler>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RouteError> {
        let pattern = RoutePattern::parse(pattern)?;

        if let Some(existing) = self
            .routes
            .iter()
            .find(|route| route.method == method && route.pattern.same_shape(&pattern))
        {
            warn!(
                method = %method,
                pattern = pattern.as_str(),
                shadowed_by = existing.pattern.as_str(),
                "Route is shadowed by an earlier registration and will never match"
            );
        }

        debug!(method = %method, pattern = pattern.as_str(), "Route registered");
        self.routes.push(Route {
            method,
            pattern,
            handler: Arc::new(handler),
        });
        Ok(self)
    }

    fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        let mut allowed: Vec<Method> = Vec::new();
        let mut get_fallback: Option<(&Route, PathParams)> = None;

        for route in &self.routes {
            let Some(params) = route.pattern.matches(path) else {
                continue;
            };
            if route.method == *method {
                return Resolution::Matched(route, params);
            }
            if *method == Method::HEAD && route.method == Method::GET && get_fallback.is_none() {
                get_fallback = Some((route, params));
            }
            if !allowed.contains(&route.method) {
                allowed.push(route.method.clone());
            }
        }

        if let Some((route, params)) = get_fallback {
            return Resolution::Matched(route, params);
        }

        if allowed.is_empty() {
            Resolution::NotFound
        } else {
            if allowed.contains(&Method::GET) && !allowed.contains(&Method::HEAD) {
                allowed.push(Method::HEAD);
            }
            Resolution::MethodNotAllowed(allowed)
        }
    }

    /// Dispatch one request
    ///
    /// Returns the matched handler's response unchanged. Unmatched paths get
    /// 404, paths registered only under other methods get 405 with an `Allow`
    /// header, and handlers exceeding the timeout get 408.
    pub async fn execute(&self, mut request: Request) -> Response {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let response = match self.resolve(&method, &path) {
            Resolution::Matched(route, params) => {
                debug!(method = %method, path = %path, pattern = route.pattern.as_str(), "Dispatching request");
                request.extensions_mut().insert(params);
                let handler = Arc::clone(&route.handler);

                match tokio::time::timeout(self.timeout, handler.call(request)).await {
                    Ok(response) => response,
                    Err(_) => {
                        warn!(
                            method = %method,
                            path = %path,
                            timeout_ms = self.timeout.as_millis(),
                            "Handler timed out"
                        );
                        AppError::timeout(format!("{method} {path} timed out")).into_response()
                    },
                }
            },
            Resolution::MethodNotAllowed(allowed) => {
                debug!(method = %method, path = %path, "Method not allowed");
                AppError::method_not_allowed(&method, allowed).into_response()
            },
            Resolution::NotFound => {
                debug!(method = %method, path = %path, "No route matched");
                AppError::not_found(&path).into_response()
            },
        };

        metrics::counter!("http.requests.total", "status" => response.status().as_u16().to_string())
            .increment(1);
        metrics::histogram!("http.request.duration_seconds").record(start.elapsed().as_secs_f64());

        response
    }

    /// Wrap the router in a single axum catch-all handler
    ///
    /// Adds request ids (`x-request-id`), request tracing and a permissive CORS
    /// policy.
    pub fn into_app(self) -> Router {
        let router = Arc::new(self);

        Router::new()
            .fallback(move |request: Request| {
                let router = Arc::clone(&router);
                async move { router.execute(request).await }
            })
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                }),
            )
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(CorsLayer::permissive())
    }
}

impl Default for RequestRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RequestRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let routes: Vec<String> = self
            .routes
            .iter()
            .map(|route| format!("{} {}", route.method, route.pattern.as_str()))
            .collect();
        f.debug_struct("RequestRouter")
            .field("routes", &routes)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{StatusCode, header};
    use tower::ServiceExt;

    fn request(method: Method, uri: &str) -> Request {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn pattern_rejects_invalid_syntax() {
        assert!(RoutePattern::parse("api/todos").is_err());
        assert!(RoutePattern::parse("/api/:").is_err());
        assert!(RoutePattern::parse("/*rest/more").is_err());
        assert!(RoutePattern::parse("/:a/:a").is_err());
        assert!(RoutePattern::parse("/").is_ok());
    }

    #[test]
    fn trailing_slash_is_insignificant() {
        let pattern = RoutePattern::parse("/api/todos").unwrap();
        assert!(pattern.matches("/api/todos/").is_some());
        assert!(pattern.matches("/api/todos").is_some());
        assert!(pattern.matches("/api/todos/1").is_none());
        assert!(pattern.matches("/api").is_none());
    }

    #[test]
    fn captures_named_segments_and_remainder() {
        let pattern = RoutePattern::parse("/items/:index/*rest").unwrap();
        let params = pattern.matches("/items/3/a/b.css").unwrap();
        assert_eq!(params.get("index"), Some("3"));
        assert_eq!(params.get("rest"), Some("a/b.css"));

        let root = RoutePattern::parse("/*path").unwrap();
        assert_eq!(root.matches("/").unwrap().get("path"), Some(""));
    }

    #[tokio::test]
    async fn health_returns_handler_response_unchanged() {
        let mut router = RequestRouter::new();
        router
            .register(Method::GET, "/health", crate::handlers::health_check)
            .unwrap();

        let response = router.execute(request(Method::GET, "/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");
    }

    #[tokio::test]
    async fn unmatched_path_is_not_found() {
        let mut router = RequestRouter::new();
        router
            .register(Method::GET, "/health", crate::handlers::health_check)
            .unwrap();

        let response = router.execute(request(Method::GET, "/nope")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("\"code\":\"NOT_FOUND\""));
    }

    #[tokio::test]
    async fn wrong_method_is_not_allowed() {
        let mut router = RequestRouter::new();
        router
            .register(Method::GET, "/api/todos", |_req: Request| async { "list" })
            .unwrap()
            .register(Method::POST, "/api/todos", |_req: Request| async { "create" })
            .unwrap();

        let response = router.execute(request(Method::DELETE, "/api/todos")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.headers().get(header::ALLOW).unwrap(),
            "GET, POST, HEAD"
        );
    }

    #[tokio::test]
    async fn first_registered_route_wins() {
        let mut router = RequestRouter::new();
        router
            .register(Method::GET, "/api/todos", |_req: Request| async { "first" })
            .unwrap()
            .register(Method::GET, "/api/todos/", |_req: Request| async { "second" })
            .unwrap()
            .register(Method::GET, "/*path", |_req: Request| async { "static" })
            .unwrap();

        let response = router.execute(request(Method::GET, "/api/todos/")).await;
        assert_eq!(body_text(response).await, "first");

        let response = router.execute(request(Method::GET, "/index.html")).await;
        assert_eq!(body_text(response).await, "static");
    }

    #[tokio::test]
    async fn head_falls_back_to_get() {
        let mut router = RequestRouter::new();
        router
            .register(Method::GET, "/health", crate::handlers::health_check)
            .unwrap();

        let response = router.execute(request(Method::HEAD, "/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn handler_sees_path_params() {
        let mut router = RequestRouter::new();
        router
            .register(Method::GET, "/files/*path", |req: Request| async move {
                req.extensions()
                    .get::<PathParams>()
                    .and_then(|params| params.get("path").map(str::to_string))
                    .unwrap_or_default()
            })
            .unwrap();

        let response = router.execute(request(Method::GET, "/files/css/app.css")).await;
        assert_eq!(body_text(response).await, "css/app.css");
    }

    #[tokio::test]
    async fn slow_handler_times_out() {
        let mut router = RequestRouter::new().with_timeout(Duration::from_millis(20));
        router
            .register(Method::GET, "/slow", |_req: Request| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            })
            .unwrap();

        let response = router.execute(request(Method::GET, "/slow")).await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn app_adds_request_id() {
        let mut router = RequestRouter::new();
        router
            .register(Method::GET, "/health", crate::handlers::health_check)
            .unwrap();

        let response = router
            .into_app()
            .oneshot(request(Method::GET, "/health"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }
}
