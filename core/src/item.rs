//! The todo item model.
//!
//! Items carry no identity beyond their position in the owning list. The
//! serialized form is exactly `{"title": "...", "completed": false}` and is
//! shared by local storage, the create endpoint and the push channel.

use serde::{Deserialize, Serialize};

/// A single todo entry
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TodoItem {
    /// Title/description of the todo
    pub title: String,
    /// Whether the todo is completed
    pub completed: bool,
}

impl TodoItem {
    /// Creates an item that is not yet completed
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            completed: false,
        }
    }

    /// Creates an item with an explicit completion flag
    #[must_use]
    pub fn with_completed(title: impl Into<String>, completed: bool) -> Self {
        Self {
            title: title.into(),
            completed,
        }
    }
}
