//! Error types for retry operations.

use std::fmt;
use std::time::Duration;

use crate::dispatch::DispatchError;

/// Synthetic error appended when the retry budget runs out.
///
/// It is always the last entry of an exhausted [`Outcome`](crate::Outcome),
/// which lets callers tell "gave up" apart from the operation's own errors.
///
/// # Examples
///
/// ```rust
/// use retrier::Retrier;
/// use std::time::Duration;
///
/// let outcome = Retrier::new(Duration::ZERO, 2, 1)
///     .execute_func_named("fetch", || Err::<(), _>("unreachable"));
///
/// let exhausted = outcome.exhausted().expect("budget should be exhausted");
/// assert_eq!(exhausted.operation(), "fetch");
/// assert_eq!(exhausted.max_retries(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxRetriesError {
    operation: String,
    wait: Duration,
    max_retries: u32,
}

impl MaxRetriesError {
    /// Create a new MaxRetriesError.
    pub fn new(operation: impl Into<String>, wait: Duration, max_retries: u32) -> Self {
        Self {
            operation: operation.into(),
            wait,
            max_retries,
        }
    }

    /// Name of the operation that was given up on.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Wait time reached when the budget ran out (after backoff growth).
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Configured maximum number of attempts.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

impl fmt::Display for MaxRetriesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tried calling '{}' with wait {:?} but reached max retries of {}",
            self.operation, self.wait, self.max_retries
        )
    }
}

impl std::error::Error for MaxRetriesError {}

/// One entry of the error list accumulated by a retried call.
#[derive(Debug)]
pub enum RetryError<E> {
    /// An error produced by the operation itself. Retryable.
    Attempt(E),
    /// The retry budget was exhausted. Always the final entry when present.
    Exhausted(MaxRetriesError),
    /// The call could not be dispatched at all. Never retried.
    Fatal(DispatchError),
}

impl<E> RetryError<E> {
    /// Returns true if this error came from the operation.
    pub fn is_attempt(&self) -> bool {
        matches!(self, Self::Attempt(_))
    }

    /// Returns true if this is the exhaustion marker.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }

    /// Returns true if this is a non-retryable dispatch fault.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// Get the operation's error if this is an attempt error.
    pub fn as_attempt(&self) -> Option<&E> {
        match self {
            Self::Attempt(e) => Some(e),
            _ => None,
        }
    }

    /// Extract the operation's error if this is an attempt error.
    pub fn into_attempt(self) -> Option<E> {
        match self {
            Self::Attempt(e) => Some(e),
            _ => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attempt(e) => write!(f, "{}", e),
            Self::Exhausted(e) => write!(f, "{}", e),
            Self::Fatal(e) => write!(f, "{}", e),
        }
    }
}

impl<E> std::error::Error for RetryError<E>
where
    E: fmt::Debug + fmt::Display,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Attempt(_) => None,
            Self::Exhausted(e) => Some(e),
            Self::Fatal(e) => Some(e),
        }
    }
}
