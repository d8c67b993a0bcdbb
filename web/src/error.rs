//! Error types for web handlers.
//!
//! [`AppError`] bridges handler and routing failures to HTTP responses with a
//! JSON body of the form `{"code": "...", "message": "..."}`.

use axum::{
    Json,
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// Implements axum's `IntoResponse`, so handlers can return
/// `Result<T, AppError>` directly.
///
/// # Examples
///
/// ```ignore
/// async fn create(request: Request) -> Result<Json<TodoItem>, AppError> {
///     let item = parse(request).await.map_err(AppError::bad_request)?;
///     Ok(Json(item))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Methods accepted by the resource, sent as `Allow` on 405
    allow: Vec<Method>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            allow: Vec::new(),
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status this error renders as.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "BAD_REQUEST".to_string(),
        )
    }

    /// Create a 404 Not Found error for a path no route matches.
    #[must_use]
    pub fn not_found(path: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("No route for {path}"),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 405 Method Not Allowed error.
    ///
    /// `allow` lists the methods registered for the path; it is rendered as
    /// the `Allow` response header.
    #[must_use]
    pub fn method_not_allowed(method: &Method, allow: Vec<Method>) -> Self {
        let mut error = Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            format!("Method {method} not allowed"),
            "METHOD_NOT_ALLOWED".to_string(),
        );
        error.allow = allow;
        error
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            message.into(),
            "VALIDATION_ERROR".to_string(),
        )
    }

    /// Create a 408 Request Timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::REQUEST_TIMEOUT,
            message.into(),
            "TIMEOUT".to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log internal errors
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let allow = self
            .allow
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        let mut response = (self.status, Json(body)).into_response();
        if !allow.is_empty() {
            if let Ok(value) = allow.parse() {
                response.headers_mut().insert(header::ALLOW, value);
            }
        }
        response
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::bad_request("Invalid input");
        assert_eq!(err.to_string(), "[BAD_REQUEST] Invalid input");
    }

    #[test]
    fn test_not_found() {
        let err = AppError::not_found("/nowhere");
        assert_eq!(err.to_string(), "[NOT_FOUND] No route for /nowhere");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation() {
        let err = AppError::validation("Title is required");
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_timeout() {
        let err = AppError::timeout("Request timed out");
        assert_eq!(err.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(err.code(), "TIMEOUT");
    }

    #[test]
    fn test_method_not_allowed_sets_allow_header() {
        let response =
            AppError::method_not_allowed(&Method::DELETE, vec![Method::GET, Method::POST])
                .into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "GET, POST");
    }

    #[test]
    fn test_anyhow_maps_to_internal() {
        let err = AppError::from(anyhow::anyhow!("disk on fire"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(std::error::Error::source(&err).is_some());
    }
}
