//! Result shaping for retried calls.

use crate::dispatch::DispatchError;
use crate::retry::error::{MaxRetriesError, RetryError};

/// What a retried call produced.
///
/// Errors are kept oldest first and are returned in full even when a later
/// attempt succeeded, so callers can see how many attempts failed.
#[derive(Debug)]
pub struct Outcome<T, E> {
    value: Option<T>,
    errors: Vec<RetryError<E>>,
}

impl<T, E> Outcome<T, E> {
    pub(crate) fn new(value: Option<T>, errors: Vec<RetryError<E>>) -> Self {
        Self { value, errors }
    }

    /// Returns true if an attempt succeeded.
    pub fn is_success(&self) -> bool {
        self.value.is_some()
    }

    /// Value of the successful attempt, if any.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Extract the value of the successful attempt, if any.
    pub fn into_value(self) -> Option<T> {
        self.value
    }

    /// Every accumulated error, oldest first.
    pub fn errors(&self) -> &[RetryError<E>] {
        &self.errors
    }

    /// Extract the accumulated errors.
    pub fn into_errors(self) -> Vec<RetryError<E>> {
        self.errors
    }

    /// The exhaustion marker, if the budget ran out.
    pub fn exhausted(&self) -> Option<&MaxRetriesError> {
        match self.errors.last() {
            Some(RetryError::Exhausted(e)) => Some(e),
            _ => None,
        }
    }

    /// The dispatch fault, if the call could not be made.
    pub fn fatal(&self) -> Option<&DispatchError> {
        match self.errors.last() {
            Some(RetryError::Fatal(e)) => Some(e),
            _ => None,
        }
    }

    /// Split into `(value, errors, succeeded)`.
    pub fn into_parts(self) -> (Option<T>, Vec<RetryError<E>>, bool) {
        let succeeded = self.value.is_some();
        (self.value, self.errors, succeeded)
    }

    /// Convert to a `Result`, discarding the errors of earlier failed
    /// attempts on success.
    pub fn into_result(self) -> Result<T, Vec<RetryError<E>>> {
        match self.value {
            Some(value) => Ok(value),
            None => Err(self.errors),
        }
    }
}
