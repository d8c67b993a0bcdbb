//! Push channel streaming over a real loopback server.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use axum::extract::Request;
use futures::StreamExt;
use http::Method;
use std::time::Duration;
use todos_web::{RequestRouter, handlers::observers};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;

#[tokio::test]
async fn observer_receives_published_values_and_closes_on_shutdown() {
    let (feed_tx, _) = broadcast::channel::<serde_json::Value>(8);
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let mut router = RequestRouter::new();
    let feed = feed_tx.clone();
    let stop = shutdown_tx.clone();
    router
        .register(Method::GET, "/api/observers", move |request: Request| {
            observers::stream(request, feed.subscribe(), stop.subscribe())
        })
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router.into_app()).await.unwrap();
    });

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/api/observers"))
        .await
        .unwrap();

    // The subscription exists once the handshake has completed
    feed_tx
        .send(serde_json::json!({"title": "call mom", "completed": false}))
        .unwrap();

    let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let Message::Text(text) = message else {
        panic!("expected a text message, got {message:?}");
    };
    let pushed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(pushed["title"], "call mom");
    assert_eq!(pushed["completed"], false);

    shutdown_tx.send(()).unwrap();
    let closing = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .unwrap();
    assert!(matches!(closing, Some(Ok(Message::Close(_))) | None));
}
