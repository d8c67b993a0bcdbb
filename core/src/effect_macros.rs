//! Declarative macros for ergonomic effect construction

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```
/// use todos_core::{async_effect, effect::Effect};
///
/// let effect: Effect<u32> = async_effect! {
///     Some(42)
/// };
/// assert!(matches!(effect, Effect::Future(_)));
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

#[cfg(test)]
mod tests {
    use crate::effect::Effect;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        AsyncResult { value: i32 },
    }

    #[tokio::test]
    async fn test_async_effect_macro() {
        let effect = async_effect! {
            Some(TestAction::AsyncResult { value: 42 })
        };

        let Effect::Future(fut) = effect else {
            unreachable!("async_effect! always builds Effect::Future");
        };
        assert_eq!(fut.await, Some(TestAction::AsyncResult { value: 42 }));
    }
}
