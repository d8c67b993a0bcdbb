//! Server routes exercised through the full axum app.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::Value;
use std::path::Path;
use todos_core::TodoItem;
use todos_server::{ServerConfig, TodoServer};
use tower::ServiceExt;

fn server(base: &Path) -> TodoServer {
    let base = base.display().to_string();
    let config = ServerConfig::from_lookup(|name: &str| match name {
        "TODOS_HOST" => Some("127.0.0.1".to_string()),
        "TODOS_BASE_PATH" => Some(base.clone()),
        _ => None,
    })
    .unwrap();
    TodoServer::new(config)
}

fn app(server: &TodoServer) -> Router {
    server.app().unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn health_returns_handler_response() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(&server(dir.path())).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn created_items_are_listed_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let server = server(dir.path());
    let app = app(&server);

    let response = app
        .clone()
        .oneshot(post("/api/todos/", r#"{"title":"buy milk","completed":false}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: TodoItem = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(created, TodoItem::new("buy milk"));

    let response = app
        .clone()
        .oneshot(post("/api/todos", r#"{"title":"call mom","completed":true}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.oneshot(get("/api/todos")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let items: Vec<TodoItem> = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(
        items,
        vec![
            TodoItem::new("buy milk"),
            TodoItem::with_completed("call mom", true)
        ]
    );
    assert_eq!(server.state().repository.len().await, 2);
}

#[tokio::test]
async fn invalid_items_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let server = server(dir.path());
    let app = app(&server);

    let response = app.clone().oneshot(post("/api/todos", "{oops")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(error["code"], "BAD_REQUEST");

    let response = app
        .oneshot(post("/api/todos", r#"{"title":"","completed":false}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    assert!(server.state().repository.is_empty().await);
}

#[tokio::test]
async fn wrong_method_lists_allowed_methods() {
    let dir = tempfile::tempdir().unwrap();
    let request = Request::builder()
        .method("DELETE")
        .uri("/api/todos")
        .body(Body::empty())
        .unwrap();

    let response = app(&server(dir.path())).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[header::ALLOW], "GET, POST, HEAD");
}

#[tokio::test]
async fn observer_route_requires_an_upgrade() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(&server(dir.path()))
        .oneshot(get("/api/observers"))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn metrics_route_is_absent_without_a_recorder() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(&server(dir.path())).oneshot(get("/metrics")).await.unwrap();

    // Falls through to the asset route, which has no such file
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn static_assets_are_served_from_public() {
    let dir = tempfile::tempdir().unwrap();
    let public = dir.path().join("public");
    std::fs::create_dir_all(public.join("css")).unwrap();
    std::fs::write(public.join("index.html"), "<h1>todos</h1>").unwrap();
    std::fs::write(public.join("css/app.css"), "body {}").unwrap();
    std::fs::write(dir.path().join("secret.txt"), "hidden").unwrap();
    let app = app(&server(dir.path()));

    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
    assert_eq!(body_text(response).await, "<h1>todos</h1>");

    let response = app.clone().oneshot(get("/css/app.css")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");

    let response = app.clone().oneshot(get("/css")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.clone().oneshot(get("/missing.js")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/../secret.txt")).await.unwrap();
    assert_ne!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn asset_types_and_escaped_names() {
    let dir = tempfile::tempdir().unwrap();
    let public = dir.path().join("public");
    std::fs::create_dir_all(&public).unwrap();
    std::fs::write(public.join("font.woff"), [0u8; 4]).unwrap();
    std::fs::write(public.join("my list.txt"), "milk").unwrap();
    std::fs::write(dir.path().join("secret.txt"), "hidden").unwrap();
    let app = app(&server(dir.path()));

    let response = app.clone().oneshot(get("/font.woff")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "font/woff");

    let response = app.clone().oneshot(get("/my%20list.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    assert_eq!(body_text(response).await, "milk");

    let response = app.oneshot(get("/..%2Fsecret.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
