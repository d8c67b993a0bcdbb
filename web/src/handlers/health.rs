//! Health check endpoint.
//!
//! Used by load balancers and monitoring systems to verify the process is up.

use axum::{extract::Request, http::StatusCode};

/// Simple health check endpoint (for basic liveness).
///
/// Returns 200 OK to indicate the service is running.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)] // Handler signature requires async
pub async fn health_check(_request: Request) -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check(Request::new(Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
