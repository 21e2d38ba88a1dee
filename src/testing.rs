//! Testing utilities for code that retries calls.
//!
//! This module provides assertion macros for [`Outcome`](crate::Outcome)s and
//! a [`Flaky`] fixture that fails a fixed number of times before succeeding.
//!
//! # Examples
//!
//! ```rust
//! use retrier::testing::Flaky;
//! use retrier::{assert_exhausted, assert_succeeded, Retrier};
//! use std::time::Duration;
//!
//! let retrier = Retrier::new(Duration::ZERO, 3, 1);
//!
//! let mut flaky = Flaky::new(2);
//! assert_succeeded!(retrier.execute_func(|| flaky.call()));
//!
//! let mut broken = Flaky::always_failing();
//! assert_exhausted!(retrier.execute_func(|| broken.call()));
//! assert_eq!(broken.calls(), 3);
//! ```

use std::fmt;

use crate::dispatch::{Call, Dispatch, MethodTable, ReturnValue};

/// Error returned by [`Flaky`] while it is still failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlakyError {
    /// 1-based number of the call that failed.
    pub call: u32,
}

impl fmt::Display for FlakyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flaky call {} failed", self.call)
    }
}

impl std::error::Error for FlakyError {}

/// Fails the first `failures` calls, then returns the call number.
///
/// Callable directly via [`Flaky::call`] or by name as `"Call"` through
/// [`Dispatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flaky {
    failures: u32,
    calls: u32,
}

impl Flaky {
    /// Fail the first `failures` calls.
    pub fn new(failures: u32) -> Self {
        Self { failures, calls: 0 }
    }

    /// Never succeed.
    pub fn always_failing() -> Self {
        Self::new(u32::MAX)
    }

    /// Make one call.
    pub fn call(&mut self) -> Result<u32, FlakyError> {
        self.calls = self.calls.saturating_add(1);
        if self.calls <= self.failures {
            Err(FlakyError { call: self.calls })
        } else {
            Ok(self.calls)
        }
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> u32 {
        self.calls
    }
}

impl Dispatch for Flaky {
    fn methods(table: &mut MethodTable<Self>) {
        table.register("Call", 0, |flaky: &mut Flaky, _: &Call<'_>| {
            Ok(ReturnValue::from_result(flaky.call()).into())
        });
    }
}

/// Assert that a retried call succeeded.
///
/// Panics with the accumulated errors otherwise.
///
/// # Example
///
/// ```rust
/// use retrier::{assert_succeeded, Retrier};
/// use std::time::Duration;
///
/// let outcome = Retrier::new(Duration::ZERO, 1, 1).execute_func(|| Ok::<_, String>(1));
/// assert_succeeded!(outcome);
/// ```
#[macro_export]
macro_rules! assert_succeeded {
    ($outcome:expr) => {
        match &$outcome {
            outcome if outcome.is_success() => {}
            outcome => {
                panic!("Expected success, got errors: {:?}", outcome.errors());
            }
        }
    };
}

/// Assert that a retried call ran out of retries.
///
/// # Example
///
/// ```rust
/// use retrier::{assert_exhausted, Retrier};
/// use std::time::Duration;
///
/// let outcome = Retrier::new(Duration::ZERO, 2, 1).execute_func(|| Err::<(), _>("down"));
/// assert_exhausted!(outcome);
/// ```
#[macro_export]
macro_rules! assert_exhausted {
    ($outcome:expr) => {
        match &$outcome {
            outcome if outcome.exhausted().is_some() => {}
            outcome => {
                panic!(
                    "Expected retries to be exhausted, got success={} errors={:?}",
                    outcome.is_success(),
                    outcome.errors()
                );
            }
        }
    };
}

/// Assert that a retried call hit a non-retryable dispatch fault.
///
/// # Example
///
/// ```rust
/// use retrier::testing::Flaky;
/// use retrier::{args, assert_fatal, Retrier};
/// use std::time::Duration;
///
/// let mut flaky = Flaky::new(0);
/// let outcome = Retrier::new(Duration::ZERO, 3, 1).execute_method(&mut flaky, "Nope", args![]);
/// assert_fatal!(outcome);
/// ```
#[macro_export]
macro_rules! assert_fatal {
    ($outcome:expr) => {
        match &$outcome {
            outcome if outcome.fatal().is_some() => {}
            outcome => {
                panic!(
                    "Expected a dispatch fault, got success={} errors={:?}",
                    outcome.is_success(),
                    outcome.errors()
                );
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Args;

    #[test]
    fn test_flaky_fails_then_succeeds() {
        let mut flaky = Flaky::new(2);
        assert_eq!(flaky.call(), Err(FlakyError { call: 1 }));
        assert_eq!(flaky.call(), Err(FlakyError { call: 2 }));
        assert_eq!(flaky.call(), Ok(3));
        assert_eq!(flaky.calls(), 3);
    }

    #[test]
    fn test_flaky_dispatch_returns_value_and_error_positions() {
        let table = MethodTable::<Flaky>::of();
        let mut flaky = Flaky::new(1);

        let failed = table.invoke(&mut flaky, "Call", &Args::new()).unwrap();
        assert_eq!(failed.len(), 2);
        assert!(failed[1].is_error());

        let ok = table.invoke(&mut flaky, "Call", &Args::new()).unwrap();
        assert_eq!(ok[0].downcast_ref::<u32>(), Some(&2));
        assert!(!ok[1].is_error());
    }

    #[test]
    #[should_panic(expected = "Expected success")]
    fn test_assert_succeeded_panics_on_failure() {
        let outcome = crate::Retrier::new(std::time::Duration::ZERO, 1, 1)
            .execute_func(|| Err::<(), _>("nope"));
        assert_succeeded!(outcome);
    }
}
