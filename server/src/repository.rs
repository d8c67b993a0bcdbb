//! In-memory item repository.
//!
//! Holds every item created through the API and publishes each new one on a
//! broadcast feed that observer sockets subscribe to.

use todos_core::TodoItem;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

/// Items created through the API, plus the feed announcing them
#[derive(Debug)]
pub struct TodoRepository {
    items: RwLock<Vec<TodoItem>>,
    feed: broadcast::Sender<TodoItem>,
}

impl TodoRepository {
    /// Create an empty repository
    ///
    /// `feed_capacity` is how many items a subscriber may fall behind before
    /// it starts missing items.
    #[must_use]
    pub fn new(feed_capacity: usize) -> Self {
        let (feed, _) = broadcast::channel(feed_capacity.max(1));
        Self {
            items: RwLock::new(Vec::new()),
            feed,
        }
    }

    /// Append `item` and announce it to every subscriber
    pub async fn create(&self, item: TodoItem) -> TodoItem {
        let mut items = self.items.write().await;
        items.push(item.clone());

        // No subscribers is not an error
        let observers = self.feed.send(item.clone()).unwrap_or(0);
        debug!(title = %item.title, total = items.len(), observers, "Item created");
        item
    }

    /// Snapshot of every item in creation order
    pub async fn list(&self) -> Vec<TodoItem> {
        self.items.read().await.clone()
    }

    /// Number of stored items
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Whether nothing has been created yet
    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Receive every item created from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TodoItem> {
        self.feed.subscribe()
    }

    /// Number of open subscriptions
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.feed.receiver_count()
    }
}

impl Default for TodoRepository {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_appends_and_publishes() {
        let repository = TodoRepository::new(8);
        let mut feed = repository.subscribe();

        repository.create(TodoItem::new("buy milk")).await;
        repository.create(TodoItem::with_completed("call mom", true)).await;

        assert_eq!(
            repository.list().await,
            vec![
                TodoItem::new("buy milk"),
                TodoItem::with_completed("call mom", true)
            ]
        );
        assert_eq!(feed.recv().await.unwrap(), TodoItem::new("buy milk"));
        assert_eq!(feed.recv().await.unwrap().title, "call mom");
    }

    #[tokio::test]
    async fn create_without_observers_still_stores() {
        let repository = TodoRepository::default();
        assert!(repository.is_empty().await);
        assert_eq!(repository.observer_count(), 0);

        repository.create(TodoItem::new("a")).await;

        assert_eq!(repository.len().await, 1);
    }

    #[tokio::test]
    async fn late_subscribers_only_see_new_items() {
        let repository = TodoRepository::new(8);
        repository.create(TodoItem::new("before")).await;

        let mut feed = repository.subscribe();
        repository.create(TodoItem::new("after")).await;

        assert_eq!(feed.recv().await.unwrap().title, "after");
        assert!(feed.try_recv().is_err());
    }
}
