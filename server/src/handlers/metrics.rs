//! Prometheus scrape endpoint.

use axum::response::IntoResponse;
use http::header;
use metrics_exporter_prometheus::PrometheusHandle;

/// `GET /metrics`: every recorded metric in Prometheus text format
pub async fn render(handle: PrometheusHandle) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
}
