//! The list controller.
//!
//! [`TodoController`] is the application context: it owns the runtime
//! [`Store`] running [`TodoReducer`], loads the list from an [`ItemStore`] on
//! construction and writes it back after every change. View code talks to
//! it through one method per user event and refreshes itself through
//! [`TodoController::on_change`].
//!
//! Writes run on the blocking thread pool, serialized by a lock that also
//! remembers the last persisted revision, so the file always ends up holding
//! the newest list even when operations race.

use crate::reducer::{TodoEnvironment, TodoReducer};
use crate::storage::ItemStore;
use crate::types::{TodoAction, TodoState};
use std::sync::Arc;
use std::time::Duration;
use todos_core::{TodoItem, environment::KeyValueStore};
use todos_runtime::{EffectHandle, ObserverId, Store, StoreError};
use tokio::sync::{Mutex, broadcast};

/// Runtime store specialised for the todo list
pub type TodoStore = Store<TodoState, TodoAction, TodoEnvironment, TodoReducer>;

/// Application context for one todo list session
///
/// Every operation returns once the action has been reduced and the new list
/// has been written to the item store, so the persisted list always equals
/// the in-memory one between calls. Remote submissions run in the background;
/// wait on the returned [`EffectHandle`] to observe their outcome.
pub struct TodoController<K> {
    store: TodoStore,
    items: Arc<ItemStore<K>>,
    /// Revision last written to `items`
    persisted: Arc<Mutex<u64>>,
}

impl<K> Clone for TodoController<K> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            items: Arc::clone(&self.items),
            persisted: Arc::clone(&self.persisted),
        }
    }
}

impl<K: KeyValueStore + 'static> TodoController<K> {
    /// Load the persisted list and start a session over it
    #[must_use]
    pub fn new(items: ItemStore<K>, environment: TodoEnvironment) -> Self {
        let state = TodoState::with_items(items.load());
        tracing::info!(count = state.count(), "Todo list loaded");

        Self {
            store: Store::new(state, TodoReducer::new(), environment),
            items: Arc::new(items),
            persisted: Arc::new(Mutex::new(0)),
        }
    }

    /// Send any action to the list
    ///
    /// Returns after the action is reduced and, if it changed the items,
    /// after the new list has been written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`TodoController::shutdown`].
    pub async fn send(&self, action: TodoAction) -> Result<EffectHandle, StoreError> {
        let handle = self.store.send(action).await?;
        self.persist().await;
        Ok(handle)
    }

    /// Write the current list if it is newer than the last write
    ///
    /// Storage failures are logged; the in-memory list stays authoritative.
    async fn persist(&self) {
        let mut persisted = self.persisted.lock().await;
        let (revision, items) = self
            .store
            .state(|state| (state.revision, state.items.clone()))
            .await;
        if revision <= *persisted {
            return;
        }

        let writer = Arc::clone(&self.items);
        match tokio::task::spawn_blocking(move || writer.save(&items)).await {
            Ok(Ok(())) => tracing::trace!(revision, "Items persisted"),
            Ok(Err(e)) => tracing::error!(error = %e, revision, "Failed to persist items"),
            Err(e) => tracing::error!(error = %e, revision, "Persistence task failed"),
        }
        *persisted = revision;
    }

    /// Add a new item; blank titles are ignored
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn add(&self, title: impl Into<String>) -> Result<EffectHandle, StoreError> {
        self.send(TodoAction::Add {
            title: title.into(),
        })
        .await
    }

    /// Put the item at `index` into edit mode
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn edit_start(&self, index: usize) -> Result<EffectHandle, StoreError> {
        self.send(TodoAction::EditStart { index }).await
    }

    /// Finish editing the item at `index`; a blank title removes it
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn edit_commit(
        &self,
        index: usize,
        title: impl Into<String>,
    ) -> Result<EffectHandle, StoreError> {
        self.send(TodoAction::EditCommit {
            index,
            title: title.into(),
        })
        .await
    }

    /// Leave edit mode without changes
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn edit_cancel(&self) -> Result<EffectHandle, StoreError> {
        self.send(TodoAction::EditCancel).await
    }

    /// Flip the completion flag of the item at `index`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn toggle(&self, index: usize) -> Result<EffectHandle, StoreError> {
        self.send(TodoAction::Toggle { index }).await
    }

    /// Remove the item at `index`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn remove(&self, index: usize) -> Result<EffectHandle, StoreError> {
        self.send(TodoAction::Remove { index }).await
    }

    /// Remove every completed item
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn clear_completed(&self) -> Result<EffectHandle, StoreError> {
        self.send(TodoAction::ClearCompleted).await
    }

    /// Set every item's completion flag
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn mark_all(&self, completed: bool) -> Result<EffectHandle, StoreError> {
        self.send(TodoAction::MarkAll { completed }).await
    }

    /// Select the display filter from a location path
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn set_filter(&self, path: impl Into<String>) -> Result<EffectHandle, StoreError> {
        self.send(TodoAction::SetFilter { path: path.into() }).await
    }

    /// Append an item that arrived over the push channel
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn receive(&self, item: TodoItem) -> Result<EffectHandle, StoreError> {
        self.send(TodoAction::Received { item }).await
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> TodoState {
        self.store.state(Clone::clone).await
    }

    /// Items shown under the current filter, with their list positions
    pub async fn visible_items(&self) -> Vec<(usize, TodoItem)> {
        self.store
            .state(|state| {
                state
                    .visible_items()
                    .into_iter()
                    .map(|(index, item)| (index, item.clone()))
                    .collect()
            })
            .await
    }

    /// Call `callback` with the new state after every action
    ///
    /// Callbacks run before the triggering operation returns and must not
    /// call back into the controller.
    pub fn on_change<F>(&self, callback: F) -> ObserverId
    where
        F: Fn(&TodoState) + Send + Sync + 'static,
    {
        self.store.observe(callback)
    }

    /// Stop calling a callback registered with [`TodoController::on_change`]
    pub fn remove_on_change(&self, id: ObserverId) -> bool {
        self.store.remove_observer(id)
    }

    /// Every action reduced by this controller, in order
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<TodoAction> {
        self.store.subscribe_actions()
    }

    /// The item store the list is persisted to
    #[must_use]
    pub fn item_store(&self) -> &ItemStore<K> {
        &self.items
    }

    /// Reject further operations and wait for pending submissions
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if submissions are still
    /// running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }
}
