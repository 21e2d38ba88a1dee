//! Retrying calls with jittered exponential backoff.
//!
//! - **Policy**: [`RetryPolicy`] is plain data: base wait, retry budget and
//!   backoff exponent, clamped to valid minimums at construction.
//! - **Engine**: [`Retrier`] drives the attempts. Its state is rebuilt on every
//!   call, so a single instance is safe to reuse across unrelated calls.
//! - **Outcome**: [`Outcome`] carries the successful value (if any) together
//!   with every error seen along the way, oldest first.
//!
//! # Quick Start
//!
//! ```rust
//! use retrier::{Retrier, RetryError};
//! use std::time::Duration;
//!
//! let retrier = Retrier::new(Duration::ZERO, 3, 1);
//! let outcome = retrier.execute_func_named("ping", || Err::<(), _>("offline"));
//!
//! // 3 attempt errors plus the exhaustion marker
//! assert!(!outcome.is_success());
//! assert_eq!(outcome.errors().len(), 4);
//! assert!(matches!(outcome.errors().last(), Some(RetryError::Exhausted(_))));
//! ```
//!
//! # Backoff and Jitter
//!
//! After `i` failed attempts the engine waits `base_wait * exponent^i`, plus
//! up to 50% random jitter (see [`jittered`]), before trying again.
//!
//! # Error Types
//!
//! - [`RetryError::Attempt`]: an error returned by the operation
//! - [`RetryError::Exhausted`]: wraps [`MaxRetriesError`], appended once when the budget runs out
//! - [`RetryError::Fatal`]: the call could not be dispatched; nothing was retried

mod error;
mod outcome;
mod policy;
mod retrier;
mod state;

pub use error::{MaxRetriesError, RetryError};
pub use outcome::Outcome;
pub use policy::{jittered, jittered_with, RetryPolicy};
pub use retrier::{Retrier, Retry};

#[cfg(test)]
mod tests;
