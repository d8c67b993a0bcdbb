//! Push channel client.
//!
//! Listens on the server's observer socket for items created elsewhere and
//! feeds each one into the controller as [`TodoAction::Received`]. Every
//! text message is one bare JSON item; anything that does not parse is logged
//! and dropped.
//!
//! [`TodoAction::Received`]: crate::types::TodoAction::Received

use crate::controller::TodoController;
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use todos_core::{TodoItem, environment::KeyValueStore};
use todos_runtime::StoreError;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Path of the observer socket, relative to the server URL
pub const OBSERVERS_PATH: &str = "/api/observers";

/// Errors ending a push channel session
#[derive(Error, Debug)]
pub enum PushError {
    /// Connecting or reading the socket failed
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The controller stopped accepting items
    #[error("Controller rejected pushed item: {0}")]
    Controller(#[from] StoreError),
}

/// An open connection to the observer socket
pub struct PushChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    url: String,
}

impl PushChannel {
    /// Observer socket URL for a server base URL
    ///
    /// ```
    /// use todos_client::push::PushChannel;
    ///
    /// assert_eq!(
    ///     PushChannel::observers_url("http://localhost:49185/"),
    ///     "ws://localhost:49185/api/observers"
    /// );
    /// ```
    #[must_use]
    pub fn observers_url(server_url: &str) -> String {
        let base = server_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{base}{OBSERVERS_PATH}")
    }

    /// Open the observer socket at `url` (`ws://host/api/observers`)
    ///
    /// # Errors
    ///
    /// Returns [`PushError::WebSocket`] if the handshake fails.
    pub async fn connect(url: &str) -> Result<Self, PushError> {
        let (stream, response) = connect_async(url).await?;
        info!(url, status = %response.status(), "Push channel connected");
        Ok(Self {
            stream,
            url: url.to_string(),
        })
    }

    /// URL this channel is connected to
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Deliver pushed items to `controller` until shutdown or close
    ///
    /// Messages are handled one at a time in arrival order. Returns the number
    /// of items delivered when `shutdown` fires or the server closes the
    /// socket.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::WebSocket`] on a transport error and
    /// [`PushError::Controller`] if the controller has been shut down.
    pub async fn run<K>(
        self,
        controller: &TodoController<K>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<usize, PushError>
    where
        K: KeyValueStore + 'static,
    {
        let (mut sink, mut messages) = self.stream.split();
        let mut delivered = 0;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!(url = %self.url, "Closing push channel");
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                },
                message = messages.next() => match message {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<TodoItem>(&text) {
                        Ok(item) => {
                            debug!(title = %item.title, "Pushed item received");
                            controller.receive(item).await?;
                            metrics::counter!("push.messages.total", "outcome" => "delivered").increment(1);
                            delivered += 1;
                        },
                        Err(e) => {
                            warn!(error = %e, payload = %text, "Dropping malformed pushed item");
                            metrics::counter!("push.messages.total", "outcome" => "malformed").increment(1);
                        },
                    },
                    Some(Ok(Message::Binary(_))) => {
                        debug!("Ignoring binary push message");
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        info!(url = %self.url, "Push channel closed by server");
                        break;
                    },
                    Some(Ok(_)) => {},
                    Some(Err(e)) => return Err(e.into()),
                },
            }
        }

        Ok(delivered)
    }
}

impl std::fmt::Debug for PushChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushChannel")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}
