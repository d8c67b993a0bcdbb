//! # Todos Testing
//!
//! Testing utilities and helpers for reducers and controllers.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given-When-Then harness for reducers
//! - Mock implementations of environment traits
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use todos_testing::{ReducerTest, assertions};
//!
//! ReducerTest::new(TodoReducer::new())
//!     .with_env(TodoEnvironment::offline())
//!     .given_state(TodoState::default())
//!     .when_action(TodoAction::Add { title: "buy milk".into() })
//!     .then_state(|state| assert_eq!(state.items.len(), 1))
//!     .then_effects(assertions::assert_no_effects)
//!     .run();
//! ```


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of environment traits
pub mod mocks {
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Mutex, PoisonError};
    use todos_core::environment::{KeyValueStore, RemoteSync};
    use todos_core::{StorageError, TodoItem};

    /// Remote sync double that records every submitted item
    ///
    /// Answers every submission with the configured outcome.
    ///
    /// ```
    /// use todos_testing::mocks::RecordingSync;
    ///
    /// let sync = RecordingSync::failing();
    /// assert!(sync.submitted().is_empty());
    /// ```
    #[derive(Debug, Default)]
    pub struct RecordingSync {
        submitted: Mutex<Vec<TodoItem>>,
        fail: AtomicBool,
    }

    impl RecordingSync {
        /// A remote that accepts every item
        #[must_use]
        pub fn succeeding() -> Self {
            Self::default()
        }

        /// A remote that rejects every item
        #[must_use]
        pub fn failing() -> Self {
            Self {
                submitted: Mutex::new(Vec::new()),
                fail: AtomicBool::new(true),
            }
        }

        /// Switch the outcome of later submissions
        pub fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        /// Items submitted so far, in submission order
        #[must_use]
        pub fn submitted(&self) -> Vec<TodoItem> {
            self.submitted
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    #[async_trait]
    impl RemoteSync for RecordingSync {
        async fn submit(&self, item: &TodoItem) -> bool {
            self.submitted
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(item.clone());
            !self.fail.load(Ordering::SeqCst)
        }
    }

    /// Key-value backend whose reads and writes always fail
    #[derive(Debug, Default, Clone, Copy)]
    pub struct FailingKeyValueStore;

    impl KeyValueStore for FailingKeyValueStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Backend("read refused".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Backend("write refused".to_string()))
        }
    }
}

pub use mocks::{FailingKeyValueStore, RecordingSync};

#[cfg(test)]
mod tests {
    use super::*;
    use todos_core::TodoItem;
    use todos_core::environment::{KeyValueStore, RemoteSync};

    #[tokio::test]
    async fn recording_sync_follows_configured_outcome() {
        let sync = RecordingSync::failing();
        assert!(!sync.submit(&TodoItem::new("a")).await);
        sync.set_failing(false);
        assert!(sync.submit(&TodoItem::new("b")).await);
        assert_eq!(sync.submitted().len(), 2);
    }

    #[test]
    fn failing_store_fails_both_ways() {
        assert!(FailingKeyValueStore.get("todos").is_err());
        assert!(FailingKeyValueStore.set("todos", "[]").is_err());
    }
}
