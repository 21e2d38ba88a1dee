//! Retry policy types and jitter.

use std::time::Duration;

use rand::Rng;

/// Configuration for a [`Retrier`](crate::Retrier).
///
/// A policy is plain data: a base wait, a retry budget and a backoff exponent.
/// Construction clamps `max_retries` and `exponent` to a minimum of 1, so every
/// policy allows at least one attempt and never shrinks its wait.
///
/// # Examples
///
/// ```rust
/// use retrier::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(Duration::from_millis(100), 4, 2);
///
/// // Pre-jitter wait before each retry: 100ms, 200ms, 400ms, ...
/// assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
/// assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
/// assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
///
/// // Invalid inputs are clamped
/// let clamped = RetryPolicy::new(Duration::ZERO, 0, 0);
/// assert_eq!(clamped.max_retries(), 1);
/// assert_eq!(clamped.exponent(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "PolicyConfig"))]
pub struct RetryPolicy {
    base_wait: Duration,
    max_retries: u32,
    exponent: u32,
}

/// Unvalidated wire form of a policy; deserialized values pass through
/// [`RetryPolicy::new`] so the clamps always hold.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize, Default)]
#[serde(default)]
struct PolicyConfig {
    base_wait: Duration,
    max_retries: u32,
    exponent: u32,
}

#[cfg(feature = "serde")]
impl From<PolicyConfig> for RetryPolicy {
    fn from(config: PolicyConfig) -> Self {
        RetryPolicy::new(config.base_wait, config.max_retries, config.exponent)
    }
}

impl Default for RetryPolicy {
    /// Returns a policy with:
    /// - `base_wait = 100ms`;
    /// - `max_retries = 3`;
    /// - `exponent = 2`.
    fn default() -> Self {
        Self::new(Duration::from_millis(100), 3, 2)
    }
}

impl RetryPolicy {
    /// Create a policy, clamping `max_retries` and `exponent` to at least 1.
    pub fn new(base_wait: Duration, max_retries: u32, exponent: u32) -> Self {
        Self {
            base_wait,
            max_retries: max_retries.max(1),
            exponent: exponent.max(1),
        }
    }

    /// Set the wait before the first retry.
    pub fn with_base_wait(mut self, base_wait: Duration) -> Self {
        self.base_wait = base_wait;
        self
    }

    /// Set the maximum number of attempts (clamped to at least 1).
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set the multiplier applied to the wait after every failed attempt
    /// (clamped to at least 1; 1 keeps the wait constant).
    pub fn with_exponent(mut self, exponent: u32) -> Self {
        self.exponent = exponent.max(1);
        self
    }

    /// Wait before the first retry.
    pub fn base_wait(&self) -> Duration {
        self.base_wait
    }

    /// Maximum number of attempts per invocation.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Backoff multiplier.
    pub fn exponent(&self) -> u32 {
        self.exponent
    }

    /// Pre-jitter wait used after `failures` failed attempts:
    /// `base_wait * exponent^failures`, computed with saturating arithmetic.
    pub fn delay_for_attempt(&self, failures: u32) -> Duration {
        self.base_wait
            .saturating_mul(self.exponent.saturating_pow(failures))
    }
}

/// Apply jitter to a wait using the thread-local random generator.
///
/// A zero wait stays zero. Otherwise a value `j` is drawn uniformly from
/// `[0, wait)` and `wait + j / 2` is returned, so the result lies in
/// `[wait, wait + wait / 2)`.
///
/// # Examples
///
/// ```rust
/// use retrier::retry::jittered;
/// use std::time::Duration;
///
/// assert_eq!(jittered(Duration::ZERO), Duration::ZERO);
///
/// let wait = Duration::from_millis(200);
/// let delay = jittered(wait);
/// assert!(delay >= wait && delay < wait + wait / 2);
/// ```
pub fn jittered(wait: Duration) -> Duration {
    jittered_with(wait, &mut rand::rng())
}

/// Same as [`jittered`] with a caller-supplied random source.
pub fn jittered_with<R: Rng>(wait: Duration, rng: &mut R) -> Duration {
    if wait.is_zero() {
        return Duration::ZERO;
    }

    let nanos = u64::try_from(wait.as_nanos()).unwrap_or(u64::MAX);
    let spread = rng.random_range(0..nanos);
    wait.saturating_add(Duration::from_nanos(spread / 2))
}
