//! Per-invocation retry state.
//!
//! A fresh [`RetryState`] is built for every top-level call and dropped when
//! it returns, so nothing leaks between calls on the same `Retrier`, even
//! when the operation panics.

use std::time::Duration;

use crate::dispatch::DispatchError;
use crate::retry::error::{MaxRetriesError, RetryError};
use crate::retry::outcome::Outcome;
use crate::retry::policy::{jittered, RetryPolicy};

/// Why a single attempt did not produce a value.
#[derive(Debug)]
pub(crate) enum AttemptFailure<E> {
    /// Errors from the operation, in the order they were found.
    Retryable(Vec<E>),
    /// The call could not be made; stop without consuming budget.
    Fatal(DispatchError),
}

#[derive(Debug)]
pub(crate) struct RetryState<E> {
    policy: RetryPolicy,
    attempts_made: u32,
    current_wait: Duration,
    errors: Vec<RetryError<E>>,
}

impl<E> RetryState<E> {
    pub(crate) fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts_made: 0,
            current_wait: policy.base_wait(),
            errors: Vec::new(),
        }
    }

    pub(crate) fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    pub(crate) fn current_wait(&self) -> Duration {
        self.current_wait
    }

    pub(crate) fn budget_exhausted(&self) -> bool {
        self.attempts_made >= self.policy.max_retries()
    }

    pub(crate) fn record(&mut self, errors: Vec<E>) {
        self.errors.extend(errors.into_iter().map(RetryError::Attempt));
    }

    /// Jittered pause to take before the next attempt.
    pub(crate) fn pause(&self) -> Duration {
        jittered(self.current_wait)
    }

    /// Grow the wait and consume one attempt. Call after sleeping.
    pub(crate) fn back_off(&mut self) {
        self.current_wait = self.current_wait.saturating_mul(self.policy.exponent());
        self.attempts_made += 1;
    }

    pub(crate) fn succeed<T>(self, value: T) -> Outcome<T, E> {
        Outcome::new(Some(value), self.errors)
    }

    pub(crate) fn exhaust<T>(mut self, operation: &str) -> Outcome<T, E> {
        self.errors.push(RetryError::Exhausted(MaxRetriesError::new(
            operation,
            self.current_wait,
            self.policy.max_retries(),
        )));
        Outcome::new(None, self.errors)
    }

    pub(crate) fn fail<T>(mut self, error: DispatchError) -> Outcome<T, E> {
        self.errors.push(RetryError::Fatal(error));
        Outcome::new(None, self.errors)
    }
}

#[cfg(test)]
mod state_tests {
    use super::*;

    #[test]
    fn test_back_off_matches_policy_delay() {
        let policy = RetryPolicy::new(Duration::from_millis(5), 6, 2);
        let mut state: RetryState<()> = RetryState::new(policy);

        for failures in 0..6 {
            assert_eq!(state.attempts_made(), failures);
            assert_eq!(state.current_wait(), policy.delay_for_attempt(failures));
            state.back_off();
        }
        assert!(state.budget_exhausted());
    }

    #[test]
    fn test_exhaust_appends_single_marker() {
        let policy = RetryPolicy::new(Duration::from_millis(1), 2, 3);
        let mut state: RetryState<&str> = RetryState::new(policy);
        state.record(vec!["one"]);
        state.back_off();
        state.record(vec!["two", "three"]);
        state.back_off();

        let outcome: Outcome<(), &str> = state.exhaust("op");
        let errors = outcome.errors();
        assert_eq!(errors.len(), 4);
        assert!(errors[..3].iter().all(RetryError::is_attempt));
        let marker = outcome.exhausted().expect("marker");
        assert_eq!(marker.wait(), Duration::from_millis(9));
        assert_eq!(marker.max_retries(), 2);
    }

    #[test]
    fn test_zero_wait_pause_is_zero() {
        let state: RetryState<()> = RetryState::new(RetryPolicy::new(Duration::ZERO, 3, 4));
        assert_eq!(state.pause(), Duration::ZERO);
    }
}
