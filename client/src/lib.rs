//! Todo list client.
//!
//! Owns the list for one session, persists every change locally, submits new
//! items to the server and appends items other clients created.
//!
//! - [`storage`]: the [`ItemStore`] and its key-value backends
//! - [`sync`]: [`HttpSyncClient`], posting new items to the server
//! - [`controller`]: [`TodoController`], the list controller
//! - [`push`]: [`PushChannel`], the server-to-client item feed
//! - [`config`]: [`ClientConfig`] from environment variables
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use todos_client::{
//!     FileKeyValueStore, HttpSyncClient, ItemStore, TodoController, TodoEnvironment,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sync = HttpSyncClient::new("http://localhost:49185", Duration::from_secs(10))?;
//! let controller = TodoController::new(
//!     ItemStore::new(FileKeyValueStore::new("/tmp/todos")),
//!     TodoEnvironment::new(Arc::new(sync)),
//! );
//!
//! controller.add("buy milk").await?;
//! controller.mark_all(true).await?;
//!
//! let state = controller.snapshot().await;
//! assert_eq!(state.remaining_count, 0);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod push;
pub mod reducer;
pub mod storage;
pub mod sync;
pub mod types;

pub use config::{ClientConfig, ConfigError};
pub use controller::{TodoController, TodoStore};
pub use push::{PushChannel, PushError};
pub use reducer::{TodoEnvironment, TodoReducer};
pub use storage::{FileKeyValueStore, ItemStore, MemoryKeyValueStore, STORAGE_KEY};
pub use sync::{HttpSyncClient, SyncError};
pub use types::{Filter, TodoAction, TodoState};
pub use todos_core::TodoItem;
