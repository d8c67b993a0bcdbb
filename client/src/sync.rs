//! Remote sync client.
//!
//! Submits newly created items to the server's create endpoint. Only the
//! response status matters: any 2xx is success, everything else (including
//! transport errors and timeouts) is failure. There is no retry.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use todos_core::{TodoItem, environment::RemoteSync};
use tracing::{debug, warn};

/// Path of the create endpoint, relative to the server URL
pub const SUBMIT_PATH: &str = "/api/todos/";

/// Errors building the sync client
#[derive(Error, Debug)]
pub enum SyncError {
    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP implementation of [`RemoteSync`]
#[derive(Clone, Debug)]
pub struct HttpSyncClient {
    client: Client,
    submit_url: String,
}

impl HttpSyncClient {
    /// Create a client for `server_url` (e.g. `http://localhost:49185`)
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Client`] if the HTTP client cannot be built.
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            submit_url: format!("{}{SUBMIT_PATH}", server_url.trim_end_matches('/')),
        })
    }

    /// Full URL items are posted to
    #[must_use]
    pub fn submit_url(&self) -> &str {
        &self.submit_url
    }
}

#[async_trait]
impl RemoteSync for HttpSyncClient {
    async fn submit(&self, item: &TodoItem) -> bool {
        let result = self.client.post(&self.submit_url).json(item).send().await;

        let success = match result {
            Ok(response) if response.status().is_success() => {
                debug!(title = %item.title, status = %response.status(), "Item submitted");
                true
            },
            Ok(response) => {
                warn!(title = %item.title, status = %response.status(), "Remote rejected item");
                false
            },
            Err(e) => {
                warn!(
                    title = %item.title,
                    error = %e,
                    timeout = e.is_timeout(),
                    "Failed to reach remote"
                );
                false
            },
        };

        let outcome = if success { "success" } else { "failure" };
        metrics::counter!("sync.submissions.total", "outcome" => outcome).increment(1);
        success
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn submit_url_joins_without_double_slash() {
        let client = HttpSyncClient::new("http://localhost:49185/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.submit_url(), "http://localhost:49185/api/todos/");
    }

    #[tokio::test]
    async fn unreachable_server_is_failure() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client =
            HttpSyncClient::new(&format!("http://127.0.0.1:{port}"), Duration::from_secs(2)).unwrap();
        assert!(!client.submit(&TodoItem::new("a")).await);
    }
}
