//! Reducer logic for the todo list.
//!
//! Every list operation is a [`TodoAction`]. Mutations recompute the derived
//! counters and bump [`TodoState::revision`], which is what the controller's
//! write-through observer keys persistence on. Rejected actions only set
//! [`TodoState::last_error`].

use crate::types::{Filter, TodoAction, TodoState};
use std::sync::Arc;
use todos_core::{
    SmallVec, TodoItem, async_effect, effect::Effect, environment::RemoteSync, reducer::Reducer,
    smallvec,
};

/// Environment dependencies for the todo reducer
#[derive(Clone)]
pub struct TodoEnvironment {
    /// Remote endpoint new items are submitted to; `None` keeps the list local
    pub sync: Option<Arc<dyn RemoteSync>>,
}

impl TodoEnvironment {
    /// Creates an environment that submits new items to `sync`
    #[must_use]
    pub fn new(sync: Arc<dyn RemoteSync>) -> Self {
        Self { sync: Some(sync) }
    }

    /// Creates an environment without a remote
    #[must_use]
    pub const fn offline() -> Self {
        Self { sync: None }
    }
}

impl std::fmt::Debug for TodoEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoEnvironment")
            .field("sync", &self.sync.is_some())
            .finish()
    }
}

/// Reducer for the todo list
#[derive(Clone, Debug, Default)]
pub struct TodoReducer;

impl TodoReducer {
    /// Creates a new `TodoReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Rejects positions outside the list, recording why
    fn validate_index(state: &mut TodoState, index: usize) -> bool {
        if index < state.items.len() {
            true
        } else {
            state.last_error = Some(format!(
                "No item at position {index} (list has {} items)",
                state.items.len()
            ));
            false
        }
    }

    /// Remove the item at `index`, keeping `editing` on the same item
    fn remove_item(state: &mut TodoState, index: usize) {
        state.items.remove(index);
        state.editing = match state.editing {
            Some(editing) if editing == index => None,
            Some(editing) if editing > index => Some(editing - 1),
            other => other,
        };
    }

    /// Bookkeeping after `items` changed
    fn items_changed(state: &mut TodoState) {
        state.recount();
        state.revision += 1;
        state.last_error = None;
        if state.editing.is_some_and(|index| index >= state.items.len()) {
            state.editing = None;
        }
    }

    fn submit(env: &TodoEnvironment, item: TodoItem) -> SmallVec<[Effect<TodoAction>; 4]> {
        let Some(sync) = env.sync.as_ref().map(Arc::clone) else {
            return SmallVec::new();
        };

        smallvec![async_effect! {
            let success = sync.submit(&item).await;
            Some(TodoAction::SyncCompleted {
                title: item.title,
                success,
            })
        }]
    }
}

impl Reducer for TodoReducer {
    type State = TodoState;
    type Action = TodoAction;
    type Environment = TodoEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TodoAction::Add { title } => {
                let title = title.trim();
                if title.is_empty() {
                    return SmallVec::new();
                }

                let item = TodoItem::new(title);
                state.items.push(item.clone());
                Self::items_changed(state);
                Self::submit(env, item)
            },

            TodoAction::EditStart { index } => {
                if Self::validate_index(state, index) {
                    state.editing = Some(index);
                    state.last_error = None;
                }
                SmallVec::new()
            },

            TodoAction::EditCommit { index, title } => {
                if !Self::validate_index(state, index) {
                    return SmallVec::new();
                }

                if state.editing == Some(index) {
                    state.editing = None;
                }
                let title = title.trim();
                if title.is_empty() {
                    Self::remove_item(state, index);
                    Self::items_changed(state);
                } else if state.items.get(index).is_some_and(|item| item.title == title) {
                    state.last_error = None;
                } else if let Some(item) = state.items.get_mut(index) {
                    title.clone_into(&mut item.title);
                    Self::items_changed(state);
                }
                SmallVec::new()
            },

            TodoAction::EditCancel => {
                state.editing = None;
                SmallVec::new()
            },

            TodoAction::Toggle { index } => {
                if let Some(item) = state.items.get_mut(index) {
                    item.completed = !item.completed;
                    Self::items_changed(state);
                } else {
                    Self::validate_index(state, index);
                }
                SmallVec::new()
            },

            TodoAction::Remove { index } => {
                if Self::validate_index(state, index) {
                    Self::remove_item(state, index);
                    Self::items_changed(state);
                }
                SmallVec::new()
            },

            TodoAction::ClearCompleted => {
                if state.completed_count == 0 {
                    return SmallVec::new();
                }

                state.editing = state.editing.and_then(|editing| {
                    let kept = state.items.get(editing).is_some_and(|item| !item.completed);
                    kept.then(|| {
                        state.items[..editing]
                            .iter()
                            .filter(|item| !item.completed)
                            .count()
                    })
                });
                state.items.retain(|item| !item.completed);
                Self::items_changed(state);
                SmallVec::new()
            },

            TodoAction::MarkAll { completed } => {
                if state.items.iter().all(|item| item.completed == completed) {
                    return SmallVec::new();
                }

                for item in &mut state.items {
                    item.completed = completed;
                }
                Self::items_changed(state);
                SmallVec::new()
            },

            TodoAction::SetFilter { path } => {
                state.filter = Filter::from_path(&path);
                SmallVec::new()
            },

            TodoAction::Received { item } => {
                state.items.push(item);
                Self::items_changed(state);
                SmallVec::new()
            },

            TodoAction::SyncCompleted { title, success } => {
                if success {
                    tracing::debug!(title = %title, "Item accepted by remote");
                } else {
                    state.sync_failures += 1;
                    tracing::warn!(
                        title = %title,
                        failures = state.sync_failures,
                        "Remote rejected item; it stays local only"
                    );
                }
                SmallVec::new()
            },
        }
    }
}
