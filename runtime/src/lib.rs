//! # Todos Runtime
//!
//! Runtime implementation for reducers defined with `todos-core`.
//!
//! ## Core Components
//!
//! - **Store**: Owns the state, runs the reducer and executes effects
//! - **Observers**: Explicit callback list notified synchronously after every action
//! - **Effect Executor**: Executes effect descriptions and feeds actions back to the reducer
//!
//! ## Example
//!
//! ```ignore
//! use todos_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Refresh the view after every change
//! store.observe(|state| render(state));
//!
//! // Send an action
//! store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field).await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use todos_core::{effect::Effect, reducer::Reducer};
use tokio::sync::{RwLock, watch};

/// Prometheus metrics for observability
pub mod metrics;

pub use error::StoreError;
pub use store::{ObserverId, Store};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for effects to complete
        #[error("Timeout waiting for effects")]
        Timeout,
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects of that
/// action to complete. Effects that feed an action back into the store are
/// considered complete once the fed-back action has been reduced.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // All effects from Action::Start are now complete
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a new effect handle and the tracking context feeding it
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (handle, _tracking) = Self::new();
        handle
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                // Every tracking context is gone, nothing can still be running
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Internal: Effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    /// Increment the effect counter (effect started)
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the effect counter (effect completed)
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements the effect counter on drop
///
/// Keeps the counter accurate even if the effect panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store runtime for coordinating reducer execution, observers and effects.
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicU64, AtomicUsize, DecrementGuard, Duration,
        Effect, EffectHandle, EffectTracking, Ordering, Reducer, RwLock, StoreError,
    };
    use std::sync::{Mutex, PoisonError};
    use tokio::sync::broadcast;

    /// Callback invoked with the new state after every reduced action
    type Observer<S> = Arc<dyn Fn(&S) + Send + Sync>;

    /// Identifies a registered observer so it can be removed again
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ObserverId(u64);

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`; the reducer runs under the write lock)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Observers (explicit callbacks run after each action, in registration order)
    /// 5. Effect execution (with feedback loop)
    ///
    /// Cloning a Store yields another handle to the same state.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        observers: Arc<Mutex<Vec<(ObserverId, Observer<S>)>>>,
        next_observer: Arc<AtomicU64>,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Every reduced action, in reduction order.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// The action broadcast keeps the last 16 actions for slow subscribers;
        /// use [`Store::with_broadcast_capacity`] to change that.
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(initial_state, reducer, environment, 16)
        }

        /// Create a new store with a custom action broadcast capacity
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                observers: Arc::new(Mutex::new(Vec::new())),
                next_observer: Arc::new(AtomicU64::new(0)),
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
            }
        }

        /// Register an observer called with the state after every action
        ///
        /// Observers run synchronously under the state write lock, in
        /// registration order, before [`Store::send`] returns. They must not
        /// call back into the store.
        pub fn observe<F>(&self, observer: F) -> ObserverId
        where
            F: Fn(&S) + Send + Sync + 'static,
        {
            let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
            self.observers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((id, Arc::new(observer)));
            tracing::debug!(observer = id.0, "Observer registered");
            id
        }

        /// Remove a previously registered observer
        ///
        /// Returns `false` if the observer was not registered.
        pub fn remove_observer(&self, id: ObserverId) -> bool {
            let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
            let before = observers.len();
            observers.retain(|(registered, _)| *registered != id);
            before != observers.len()
        }

        /// Initiate graceful shutdown of the store
        ///
        /// Rejects new actions, then waits for running effects to finish.
        /// Actions produced by those effects are still reduced.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(20);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timed out");
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Whether [`Store::shutdown`] has been called
        #[must_use]
        pub fn is_shutting_down(&self) -> bool {
            self.shutdown.load(Ordering::Acquire)
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls the reducer with (state, action, environment)
        /// 3. Notifies observers with the new state
        /// 4. Broadcasts the action to subscribers
        /// 5. Starts the returned effects; their actions come back into the store
        ///
        /// `send()` returns after starting effect execution, not completion.
        /// Use the returned [`EffectHandle`] to wait for effects.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            Ok(self.dispatch(action).await)
        }

        /// Reduce `action` and start its effects, ignoring the shutdown gate
        ///
        /// Actions fed back by running effects take this path so that
        /// [`Store::shutdown`] still reduces the results it waits for.
        async fn dispatch(&self, action: A) -> EffectHandle {
            metrics::counter!("store.actions.total").increment(1);

            let (handle, tracking) = EffectHandle::new();

            let effects = {
                let mut state = self.state.write().await;

                let start = std::time::Instant::now();
                let effects = self
                    .reducer
                    .reduce(&mut *state, action.clone(), &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                self.notify_observers(&state);
                effects
            };

            // No subscribers is fine
            let _ = self.action_broadcast.send(action);

            tracing::trace!("Executing {} effects", effects.len());
            for effect in effects {
                self.execute_effect(effect, &tracking);
            }

            handle
        }

        /// Subscribe to every action reduced by this store
        ///
        /// Slow receivers skip old actions and observe
        /// [`broadcast::error::RecvError::Lagged`].
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let count = store.state(|s| s.items.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Access the injected environment
        #[must_use]
        pub fn environment(&self) -> &E {
            &self.environment
        }

        fn notify_observers(&self, state: &S) {
            // Snapshot so observers may register further observers
            let observers: Vec<Observer<S>> = self
                .observers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .map(|(_, observer)| Arc::clone(observer))
                .collect();

            for observer in observers {
                observer(state);
            }
        }

        /// Execute an effect with tracking
        ///
        /// - `None`: No-op
        /// - `Future`: Executes async computation, dispatches resulting action if `Some`
        ///
        /// The resulting action is reduced even while the store is shutting
        /// down; shutdown waits for it.
        fn execute_effect(&self, effect: Effect<A>, tracking: &EffectTracking) {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    let (guard, pending_guard) = self.track(tracking);
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = guard;
                        let _pending_guard = pending_guard;

                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, dispatching");
                            store.dispatch(action).await;
                        }
                    });
                },
            }
        }

        /// Count one running effect against both the handle and shutdown
        fn track(&self, tracking: &EffectTracking) -> (DecrementGuard, AtomicCounterGuard) {
            tracking.increment();
            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            (
                DecrementGuard(tracking.clone()),
                AtomicCounterGuard(Arc::clone(&self.pending_effects)),
            )
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                observers: Arc::clone(&self.observers),
                next_observer: Arc::clone(&self.next_observer),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use todos_core::{SmallVec, async_effect, smallvec};

    #[derive(Clone, Debug, Default)]
    struct TestState {
        value: i32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Increment,
        IncrementLater,
        IncrementAfter(Duration),
    }

    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut TestState,
            action: TestAction,
            _env: &(),
        ) -> SmallVec<[Effect<TestAction>; 4]> {
            match action {
                TestAction::Increment => {
                    state.value += 1;
                    SmallVec::new()
                },
                TestAction::IncrementLater => smallvec![async_effect! {
                    Some(TestAction::Increment)
                }],
                TestAction::IncrementAfter(delay) => smallvec![async_effect! {
                    tokio::time::sleep(delay).await;
                    Some(TestAction::Increment)
                }],
            }
        }
    }

    fn store() -> Store<TestState, TestAction, (), TestReducer> {
        Store::new(TestState::default(), TestReducer, ())
    }

    #[tokio::test]
    async fn send_runs_reducer() {
        let store = store();
        store.send(TestAction::Increment).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn observers_see_every_state_in_order() {
        let store = store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.observe(move |state: &TestState| sink.lock().unwrap().push(state.value));

        store.send(TestAction::Increment).await.unwrap();
        store.send(TestAction::Increment).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn removed_observer_is_not_called() {
        let store = store();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let id = store.observe(move |_: &TestState| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.send(TestAction::Increment).await.unwrap();
        assert!(store.remove_observer(id));
        assert!(!store.remove_observer(id));
        store.send(TestAction::Increment).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn future_effect_feeds_action_back() {
        let store = store();
        let mut handle = store.send(TestAction::IncrementLater).await.unwrap();
        handle
            .wait_with_timeout(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn shutdown_reduces_actions_from_running_effects() {
        let store = store();
        store
            .send(TestAction::IncrementAfter(Duration::from_millis(100)))
            .await
            .unwrap();

        store.shutdown(Duration::from_secs(2)).await.unwrap();

        assert_eq!(store.state(|s| s.value).await, 1);
        assert!(store.send(TestAction::Increment).await.is_err());
    }

    #[tokio::test]
    async fn shutdown_times_out_on_slow_effects() {
        let store = store();
        store
            .send(TestAction::IncrementAfter(Duration::from_secs(5)))
            .await
            .unwrap();

        assert!(matches!(
            store.shutdown(Duration::from_millis(50)).await,
            Err(StoreError::ShutdownTimeout(1))
        ));
    }

    #[tokio::test]
    async fn actions_are_broadcast_after_reduction() {
        let store = store();
        let mut rx = store.subscribe_actions();

        let mut handle = store.send(TestAction::IncrementLater).await.unwrap();
        handle.wait().await;

        assert_eq!(rx.recv().await.unwrap(), TestAction::IncrementLater);
        assert_eq!(rx.recv().await.unwrap(), TestAction::Increment);
    }

    #[tokio::test]
    async fn shutdown_rejects_new_actions() {
        let store = store();
        store.shutdown(Duration::from_secs(1)).await.unwrap();
        assert!(store.is_shutting_down());
        assert!(matches!(
            store.send(TestAction::Increment).await,
            Err(StoreError::ShutdownInProgress)
        ));
    }

    #[tokio::test]
    async fn completed_handle_does_not_block() {
        let mut handle = EffectHandle::completed();
        assert_eq!(handle.pending(), 0);
        handle.wait_with_timeout(Duration::from_millis(50)).await.unwrap();
    }
}
