//! # Todos Core
//!
//! Core traits and types shared by every crate in the workspace.
//!
//! ## Core Concepts
//!
//! - **Item**: [`TodoItem`], the single entry persisted locally and sent over the wire
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions, executed later by the runtime
//! - **Environment**: Injected dependencies (local key-value storage, remote sync)
//!
//! ## Example
//!
//! ```
//! use todos_core::{effect::Effect, reducer::Reducer, SmallVec};
//!
//! #[derive(Default)]
//! struct Counter {
//!     count: u32,
//! }
//!
//! enum CounterAction {
//!     Increment,
//! }
//!
//! struct CounterReducer;
//!
//! impl Reducer for CounterReducer {
//!     type State = Counter;
//!     type Action = CounterAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut Counter,
//!         action: CounterAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<CounterAction>; 4]> {
//!         match action {
//!             CounterAction::Increment => state.count += 1,
//!         }
//!         SmallVec::new()
//!     }
//! }
//!
//! let mut state = Counter::default();
//! let effects = CounterReducer.reduce(&mut state, CounterAction::Increment, &());
//! assert_eq!(state.count, 1);
//! assert!(effects.is_empty());
//! ```

pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Declarative macros for building effects
pub mod effect_macros;

/// Storage error type shared by all key-value backends
pub mod error;

/// The item model exchanged between client, storage and server
pub mod item;

pub use error::StorageError;
pub use item::TodoItem;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They contain all list logic and are deterministic and testable.
pub mod reducer {
    use super::SmallVec;
    use super::effect::Effect;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values, not execution.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Returns `true` for `Effect::None`
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter, so reducers and controllers can be
/// exercised against in-memory fakes.
pub mod environment {
    use super::{StorageError, TodoItem};
    use async_trait::async_trait;

    /// Synchronous string key-value storage (the local persistence backend)
    ///
    /// Values are opaque text; callers own the encoding.
    pub trait KeyValueStore: Send + Sync {
        /// Read the value stored under `key`, `Ok(None)` if absent
        ///
        /// # Errors
        ///
        /// Returns [`StorageError`] when the backend cannot be read.
        fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

        /// Overwrite the value stored under `key`
        ///
        /// # Errors
        ///
        /// Returns [`StorageError`] when the backend cannot be written.
        fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    }

    /// Remote endpoint accepting newly created items
    #[async_trait]
    pub trait RemoteSync: Send + Sync {
        /// Submit one item; `true` on success, `false` on any failure
        async fn submit(&self, item: &TodoItem) -> bool;
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;

    #[test]
    fn effect_debug_hides_future() {
        let effect: Effect<u8> = Effect::Future(Box::pin(async { Some(1) }));
        assert_eq!(format!("{effect:?}"), "Effect::Future(<future>)");
    }

    #[test]
    fn effect_is_none() {
        assert!(Effect::<u8>::None.is_none());
        assert!(!Effect::<u8>::Future(Box::pin(async { None })).is_none());
    }
}
