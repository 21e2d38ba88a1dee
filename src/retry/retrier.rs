//! The retry engine.

use std::time::Duration;

use crate::dispatch::{scan_errors, Args, BoxError, MethodTable, ReturnValue, Target};
use crate::retry::outcome::Outcome;
use crate::retry::policy::RetryPolicy;
use crate::retry::state::{AttemptFailure, RetryState};

/// Re-executes an operation until it succeeds or the retry budget runs out.
///
/// A `Retrier` only holds its [`RetryPolicy`]. Attempt counters, the growing
/// wait and the error list live in a fresh state value per call, so one
/// instance can be reused for any number of independent calls.
///
/// # Examples
///
/// ```rust
/// use retrier::Retrier;
/// use std::time::Duration;
///
/// let retrier = Retrier::new(Duration::ZERO, 5, 1);
///
/// let mut calls = 0;
/// let outcome = retrier.execute_func(|| {
///     calls += 1;
///     if calls < 3 { Err("not yet") } else { Ok(calls) }
/// });
///
/// assert!(outcome.is_success());
/// assert_eq!(outcome.value(), Some(&3));
/// assert_eq!(outcome.errors().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Retrier {
    policy: RetryPolicy,
}

impl Retrier {
    /// Create a retrier; see [`RetryPolicy::new`] for the clamping rules.
    pub fn new(base_wait: Duration, max_retries: u32, exponent: u32) -> Self {
        Self::with_policy(RetryPolicy::new(base_wait, max_retries, exponent))
    }

    /// Create a retrier from an existing policy.
    pub fn with_policy(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The policy this retrier applies.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Retry a closure until it returns `Ok`.
    ///
    /// The closure's type name identifies the operation in the exhaustion
    /// error; use [`execute_func_named`](Self::execute_func_named) for a
    /// readable name.
    pub fn execute_func<T, E, F>(&self, operation: F) -> Outcome<T, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        self.execute_func_named(std::any::type_name::<F>(), operation)
    }

    /// Retry a closure, naming it `name` in the exhaustion error.
    pub fn execute_func_named<T, E, F>(&self, name: &str, mut operation: F) -> Outcome<T, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        self.drive(name, || {
            operation().map_err(|error| AttemptFailure::Retryable(vec![error]))
        })
    }

    /// Retry `target.method(args...)`, resolving the method by name.
    ///
    /// Every return position is scanned for errors. On success the full
    /// return list is handed back in declaration order. An unknown method or
    /// a malformed argument list stops immediately with a fatal error and
    /// consumes no budget.
    pub fn execute_method<O>(
        &self,
        mut target: O,
        method: &str,
        args: Args,
    ) -> Outcome<Vec<ReturnValue>, BoxError>
    where
        O: Target,
    {
        let table = MethodTable::<O::Receiver>::of();
        self.drive(method, || {
            let mut receiver = target.resolve();
            invoke_once(&table, &mut *receiver, method, &args)
        })
    }

    fn drive<T, E, F>(&self, operation: &str, mut attempt: F) -> Outcome<T, E>
    where
        F: FnMut() -> Result<T, AttemptFailure<E>>,
    {
        let span = tracing::debug_span!(
            "retry",
            operation,
            max_retries = self.policy.max_retries()
        );
        let _entered = span.enter();

        let mut state = RetryState::new(self.policy);
        loop {
            if state.budget_exhausted() {
                tracing::warn!(
                    attempts = state.attempts_made(),
                    "max retries reached for '{}'",
                    operation
                );
                return state.exhaust(operation);
            }

            match attempt() {
                Ok(value) => return state.succeed(value),
                Err(AttemptFailure::Fatal(error)) => {
                    tracing::warn!(%error, "call cannot be dispatched, not retrying");
                    return state.fail(error);
                }
                Err(AttemptFailure::Retryable(errors)) => {
                    tracing::debug!(
                        attempt = state.attempts_made() + 1,
                        errors = errors.len(),
                        "attempt failed"
                    );
                    state.record(errors);
                }
            }

            let pause = state.pause();
            tracing::trace!(?pause, wait = ?state.current_wait(), "backing off");
            std::thread::sleep(pause);
            state.back_off();
        }
    }

    /// Async form of [`execute_func`](Self::execute_func). Waits suspend the
    /// task through `tokio::time::sleep` instead of blocking the thread.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use retrier::testing::Flaky;
    /// use retrier::Retrier;
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let retrier = Retrier::new(Duration::from_millis(1), 4, 2);
    /// let mut flaky = Flaky::new(2);
    ///
    /// let outcome = retrier
    ///     .execute_func_async(|| std::future::ready(flaky.call()))
    ///     .await;
    ///
    /// assert_eq!(outcome.value(), Some(&3));
    /// assert_eq!(outcome.errors().len(), 2); // two failed attempts before success
    /// # });
    /// ```
    #[cfg(feature = "async")]
    pub async fn execute_func_async<T, E, F, Fut>(&self, operation: F) -> Outcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        self.execute_func_named_async(std::any::type_name::<F>(), operation)
            .await
    }

    /// Async form of [`execute_func_named`](Self::execute_func_named).
    #[cfg(feature = "async")]
    pub async fn execute_func_named_async<T, E, F, Fut>(
        &self,
        name: &str,
        mut operation: F,
    ) -> Outcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        use futures::FutureExt;

        self.drive_async(name, || {
            operation().map(|result| result.map_err(|error| AttemptFailure::Retryable(vec![error])))
        })
        .await
    }

    /// Async form of [`execute_method`](Self::execute_method). The method
    /// itself runs synchronously; only the waits between attempts suspend.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use retrier::dispatch::ByValue;
    /// use retrier::testing::Flaky;
    /// use retrier::{args, Retrier};
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let retrier = Retrier::new(Duration::from_millis(1), 3, 1);
    ///
    /// // A fresh copy per attempt never gets past its first failure
    /// let outcome = retrier
    ///     .execute_method_async(ByValue(Flaky::new(1)), "Call", args![])
    ///     .await;
    ///
    /// assert!(outcome.exhausted().is_some());
    /// assert_eq!(outcome.errors().len(), 4);
    /// # });
    /// ```
    #[cfg(feature = "async")]
    pub async fn execute_method_async<O>(
        &self,
        mut target: O,
        method: &str,
        args: Args,
    ) -> Outcome<Vec<ReturnValue>, BoxError>
    where
        O: Target,
    {
        let table = MethodTable::<O::Receiver>::of();
        self.drive_async(method, || {
            let mut receiver = target.resolve();
            futures::future::ready(invoke_once(&table, &mut *receiver, method, &args))
        })
        .await
    }

    #[cfg(feature = "async")]
    async fn drive_async<T, E, F, Fut>(&self, operation: &str, mut attempt: F) -> Outcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, AttemptFailure<E>>>,
    {
        use tracing::Instrument;

        let span = tracing::debug_span!(
            "retry",
            operation,
            max_retries = self.policy.max_retries()
        );

        async move {
            let mut state = RetryState::new(self.policy);
            loop {
                if state.budget_exhausted() {
                    tracing::warn!(
                        attempts = state.attempts_made(),
                        "max retries reached for '{}'",
                        operation
                    );
                    return state.exhaust(operation);
                }

                match attempt().await {
                    Ok(value) => return state.succeed(value),
                    Err(AttemptFailure::Fatal(error)) => {
                        tracing::warn!(%error, "call cannot be dispatched, not retrying");
                        return state.fail(error);
                    }
                    Err(AttemptFailure::Retryable(errors)) => {
                        tracing::debug!(
                            attempt = state.attempts_made() + 1,
                            errors = errors.len(),
                            "attempt failed"
                        );
                        state.record(errors);
                    }
                }

                let pause = state.pause();
                tracing::trace!(?pause, wait = ?state.current_wait(), "backing off");
                tokio::time::sleep(pause).await;
                state.back_off();
            }
        }
        .instrument(span)
        .await
    }
}

fn invoke_once<T>(
    table: &MethodTable<T>,
    receiver: &mut T,
    method: &str,
    args: &Args,
) -> Result<Vec<ReturnValue>, AttemptFailure<BoxError>> {
    let values = table
        .invoke(receiver, method, args)
        .map_err(AttemptFailure::Fatal)?;
    scan_errors(values).map_err(AttemptFailure::Retryable)
}

/// The retry engine as a trait, so callers can be generic over it and swap
/// in a test double.
///
/// # Example
///
/// ```rust
/// use retrier::{Retrier, Retry};
/// use std::time::Duration;
///
/// fn load<R: Retry>(retrier: &R) -> Option<u32> {
///     retrier.retry_func(|| Ok::<_, String>(7)).into_value()
/// }
///
/// assert_eq!(load(&Retrier::new(Duration::ZERO, 1, 1)), Some(7));
/// ```
pub trait Retry {
    /// Retry a closure until it returns `Ok`.
    fn retry_func<T, E, F>(&self, operation: F) -> Outcome<T, E>
    where
        F: FnMut() -> Result<T, E>;

    /// Retry a method invoked by name.
    fn retry_method<O>(
        &self,
        target: O,
        method: &str,
        args: Args,
    ) -> Outcome<Vec<ReturnValue>, BoxError>
    where
        O: Target;
}

impl Retry for Retrier {
    fn retry_func<T, E, F>(&self, operation: F) -> Outcome<T, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        self.execute_func(operation)
    }

    fn retry_method<O>(
        &self,
        target: O,
        method: &str,
        args: Args,
    ) -> Outcome<Vec<ReturnValue>, BoxError>
    where
        O: Target,
    {
        self.execute_method(target, method, args)
    }
}
