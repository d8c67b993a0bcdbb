//! Static assets.
//!
//! Files under the public directory are served by request path, with
//! `index.html` standing in for directories (including `/`). Paths that try
//! to leave the public directory are rejected before touching the filesystem.

use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};
use http::header;
use std::io;
use percent_encoding::percent_decode_str;
use std::path::PathBuf;
use std::sync::Arc;
use todos_web::{AppError, PathParams, WebResult};
use tracing::debug;

const INDEX: &str = "index.html";

/// `GET /*path`: serve a file from `public_dir`
///
/// # Errors
///
/// - 400 if the decoded path contains `..`, `.` or a backslash segment
/// - 404 if no such file exists
/// - 500 if the file exists but cannot be read
pub async fn serve(public_dir: Arc<PathBuf>, request: Request) -> WebResult<Response> {
    let captured = request
        .extensions()
        .get::<PathParams>()
        .and_then(|params| params.get("path"))
        .unwrap_or_default();
    let requested = percent_decode_str(captured).decode_utf8_lossy().into_owned();

    let relative = sanitize(&requested)
        .ok_or_else(|| AppError::bad_request(format!("Invalid asset path: {requested}")))?;

    let mut file = public_dir.join(relative);
    if tokio::fs::metadata(&file).await.is_ok_and(|meta| meta.is_dir()) {
        file.push(INDEX);
    }

    match tokio::fs::read(&file).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(&file).first_or_octet_stream();
            debug!(path = %file.display(), size = bytes.len(), %mime, "Serving asset");
            Ok(([(header::CONTENT_TYPE, mime.to_string())], bytes).into_response())
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(AppError::not_found(request.uri().path()))
        },
        Err(e) => Err(AppError::internal(format!("Failed to read asset {requested}"))
            .with_source(e.into())),
    }
}

/// Relative path for `requested`, or `None` if it escapes the public directory
fn sanitize(requested: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for segment in requested.split('/').filter(|segment| !segment.is_empty()) {
        if segment == "." || segment == ".." || segment.contains(['\\', ':', '\0']) {
            return None;
        }
        relative.push(segment);
    }
    Some(relative)
}
