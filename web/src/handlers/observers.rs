//! Websocket push channel.
//!
//! Streams every value published on a broadcast feed to a connected websocket
//! client, one bare JSON document per text message:
//!
//! ```text
//! Client          Observer socket            Feed
//!   │                    │                     │
//!   ├─ Upgrade ─────────>│                     │
//!   │                    │<── publish ─────────┤
//!   │<─ {"title":..} ────┤                     │
//!   │                    │                     │
//!   │<─ Close ───────────┤<── shutdown         │
//! ```
//!
//! Messages sent by the client are ignored; the channel is one-way.

use axum::{
    extract::{
        FromRequestParts, Request, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, stream::StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

/// Upgrade `request` to a websocket that streams `feed`
///
/// `feed` should be subscribed before this is called so nothing published
/// after the upgrade response is missed. The socket is closed when `shutdown`
/// fires, the feed closes, or the client goes away.
///
/// Requests that are not websocket upgrades are rejected with the upgrade
/// extractor's error response.
///
/// # Example
///
/// ```ignore
/// router.register(Method::GET, "/api/observers", move |request| {
///     let feed = repository.subscribe();
///     let shutdown = shutdown_tx.subscribe();
///     observers::stream(request, feed, shutdown)
/// })?;
/// ```
pub async fn stream<T>(
    request: Request,
    feed: broadcast::Receiver<T>,
    shutdown: broadcast::Receiver<()>,
) -> Response
where
    T: Serialize + Clone + Send + 'static,
{
    let (mut parts, _body) = request.into_parts();
    match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        Ok(ws) => {
            info!("Observer connection requested");
            ws.on_upgrade(move |socket| forward(socket, feed, shutdown))
        },
        Err(rejection) => {
            debug!(%rejection, "Observer request was not a websocket upgrade");
            rejection.into_response()
        },
    }
}

#[allow(clippy::cognitive_complexity)] // One select loop over three sources
async fn forward<T>(
    socket: WebSocket,
    mut feed: broadcast::Receiver<T>,
    mut shutdown: broadcast::Receiver<()>,
) where
    T: Serialize + Clone + Send + 'static,
{
    info!("Observer connected");
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            published = feed.recv() => match published {
                Ok(value) => {
                    let text = match serde_json::to_string(&value) {
                        Ok(text) => text,
                        Err(e) => {
                            error!(error = %e, "Failed to serialize pushed value");
                            continue;
                        },
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        debug!("Observer went away while sending");
                        break;
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Observer lagged behind the feed");
                },
                Err(RecvError::Closed) => {
                    debug!("Feed closed");
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                },
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_)) | Err(_)) | None => {
                    debug!("Observer closed the connection");
                    break;
                },
                Some(Ok(_)) => {},
            },
            _ = shutdown.recv() => {
                debug!("Shutting down observer connection");
                let _ = sender.send(Message::Close(None)).await;
                break;
            },
        }
    }

    info!("Observer disconnected");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn plain_request_is_rejected() {
        let (_tx, feed) = broadcast::channel::<u32>(4);
        let (_stop, shutdown) = broadcast::channel(1);

        let response = stream(Request::new(Body::empty()), feed, shutdown).await;

        assert!(response.status().is_client_error());
        assert_ne!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
    }
}
