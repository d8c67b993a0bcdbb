//! Domain types for the todo list.
//!
//! The list is an ordered `Vec<TodoItem>`; items are addressed by position.
//! Counters are derived from the items and recomputed by the reducer after
//! every mutation.

use serde::{Deserialize, Serialize};
use todos_core::TodoItem;

/// Display filter selected by the view's location path
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Filter {
    /// Every item (`/`)
    #[default]
    All,
    /// Items not yet completed (`/active`)
    Active,
    /// Completed items (`/completed`)
    Completed,
}

impl Filter {
    /// Map a location path to a filter; unknown paths show everything
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        match path.trim().trim_matches('/') {
            "active" => Self::Active,
            "completed" => Self::Completed,
            _ => Self::All,
        }
    }

    /// The location path selecting this filter
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::All => "/",
            Self::Active => "/active",
            Self::Completed => "/completed",
        }
    }

    /// Whether `item` is shown under this filter
    #[must_use]
    pub const fn matches(self, item: &TodoItem) -> bool {
        match self {
            Self::All => true,
            Self::Active => !item.completed,
            Self::Completed => item.completed,
        }
    }
}

/// State of the todo list owned by the controller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoState {
    /// Items in insertion order
    pub items: Vec<TodoItem>,
    /// Active display filter
    pub filter: Filter,
    /// Index of the item being edited, if any
    pub editing: Option<usize>,
    /// Items not yet completed
    pub remaining_count: usize,
    /// Completed items
    pub completed_count: usize,
    /// True when nothing remains to be done (also true for an empty list)
    pub all_checked: bool,
    /// Bumped on every change to `items`
    pub revision: u64,
    /// Remote submissions that failed so far
    pub sync_failures: usize,
    /// Why the last action was rejected
    pub last_error: Option<String>,
}

impl TodoState {
    /// Creates an empty list
    #[must_use]
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    /// Creates a state around previously loaded items
    #[must_use]
    pub fn with_items(items: Vec<TodoItem>) -> Self {
        let mut state = Self {
            items,
            filter: Filter::All,
            editing: None,
            remaining_count: 0,
            completed_count: 0,
            all_checked: true,
            revision: 0,
            sync_failures: 0,
            last_error: None,
        };
        state.recount();
        state
    }

    /// Recompute the derived counters from `items`
    pub(crate) fn recount(&mut self) {
        self.completed_count = self.items.iter().filter(|item| item.completed).count();
        self.remaining_count = self.items.len() - self.completed_count;
        self.all_checked = self.remaining_count == 0;
    }

    /// Number of items
    #[must_use]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Items shown under the active filter, with their list positions
    #[must_use]
    pub fn visible_items(&self) -> Vec<(usize, &TodoItem)> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| self.filter.matches(item))
            .collect()
    }
}

impl Default for TodoState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events sent to the list controller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TodoAction {
    /// Append a new item; blank titles are ignored
    Add {
        /// Title as typed; trimmed before use
        title: String,
    },

    /// Enter edit mode for an item
    EditStart {
        /// Position of the item
        index: usize,
    },

    /// Leave edit mode, storing the new title; a blank title removes the item
    EditCommit {
        /// Position of the item
        index: usize,
        /// Title as typed; trimmed before use
        title: String,
    },

    /// Leave edit mode without changes
    EditCancel,

    /// Flip the completion flag of an item
    Toggle {
        /// Position of the item
        index: usize,
    },

    /// Delete an item
    Remove {
        /// Position of the item
        index: usize,
    },

    /// Delete every completed item
    ClearCompleted,

    /// Set every item's completion flag
    MarkAll {
        /// New flag for all items
        completed: bool,
    },

    /// Change the display filter from a location path
    SetFilter {
        /// Location path such as `/active`
        path: String,
    },

    /// An item created elsewhere arrived over the push channel
    Received {
        /// The pushed item
        item: TodoItem,
    },

    /// Outcome of submitting a new item to the remote
    SyncCompleted {
        /// Title of the submitted item
        title: String,
        /// Whether the remote accepted it
        success: bool,
    },
}
