//! # Retrier
//!
//! A reusable retry engine for unreliable calls.
//!
//! Hand it a closure, or an object plus a method name and arguments, and it
//! re-executes the call with jittered, optionally exponential backoff until
//! the call succeeds or the retry budget is exhausted.
//!
//! ## Quick Example
//!
//! ```rust
//! use retrier::Retrier;
//! use std::time::Duration;
//!
//! let retrier = Retrier::new(Duration::from_millis(1), 5, 2);
//!
//! let mut attempts = 0;
//! let outcome = retrier.execute_func(|| {
//!     attempts += 1;
//!     if attempts < 2 {
//!         Err("connection reset")
//!     } else {
//!         Ok("payload")
//!     }
//! });
//!
//! match outcome.into_parts() {
//!     (Some(body), errors, true) => {
//!         println!("got {} after {} failed attempt(s)", body, errors.len());
//!     }
//!     (_, errors, _) => println!("gave up: {:?}", errors),
//! }
//! ```
//!
//! Methods can also be invoked by name on any type implementing
//! [`dispatch::Dispatch`]; see the [`dispatch`] module.
//!
//! ## Features
//!
//! - `async`: `execute_*_async` variants that suspend on `tokio::time::sleep`
//! - `serde`: (de)serialization for [`RetryPolicy`]

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod dispatch;
pub mod retry;
pub mod testing;

// Re-exports
pub use dispatch::{Args, BoxError, ByValue, Dispatch, DispatchError, MethodTable, ReturnValue};
pub use retry::{MaxRetriesError, Outcome, Retrier, Retry, RetryError, RetryPolicy};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::args;
    pub use crate::dispatch::{
        Args, BoxError, ByValue, Call, Dispatch, DispatchError, MethodTable, ReturnValue,
    };
    pub use crate::retry::{MaxRetriesError, Outcome, Retrier, Retry, RetryError, RetryPolicy};
}
