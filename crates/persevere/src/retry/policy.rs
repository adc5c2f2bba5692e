//! Retry policy: attempt budget, backoff schedule and per-attempt timeout.

use super::exponential::{ExponentialBackoff, ExponentialBackoffBuilder};
use super::strategy::BackoffStrategy;
use crate::error::ConfigError;
use std::time::Duration;

/// Immutable configuration for one execution.
///
/// # Default Configuration
///
/// - `max_attempts`: 3 (total invocations, not additional retries)
/// - `initial_delay`: 1s
/// - `backoff_multiplier`: 2.0
/// - `per_attempt_timeout`: none
/// - `max_delay`: none
/// - `jitter`: 0.0
///
/// Building never fails; the executor validates the policy before the first
/// attempt and rejects it with [`ConfigError`] without invoking the operation.
///
/// # Examples
///
/// ```rust
/// use persevere::prelude::*;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder()
///     .max_attempts(3)
///     .initial_delay(Duration::from_millis(10))
///     .backoff_multiplier(2.0)
///     .per_attempt_timeout(Duration::from_millis(50))
///     .build();
///
/// assert_eq!(policy.schedule(), vec![Duration::from_millis(10), Duration::from_millis(20)]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: ExponentialBackoff,
    per_attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// Create a new builder for configuring a retry policy.
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self::builder().max_attempts(1).build()
    }

    /// Delay before the second attempt.
    pub fn initial_delay(&self) -> Duration {
        self.backoff.initial_delay()
    }

    /// Factor applied to the delay after each retry.
    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff.multiplier()
    }

    /// Per-attempt timeout, if any.
    pub fn per_attempt_timeout(&self) -> Option<Duration> {
        self.per_attempt_timeout
    }

    /// Cap on any single delay, if any.
    pub fn max_delay(&self) -> Option<Duration> {
        self.backoff.max_delay()
    }

    /// Jitter fraction.
    pub fn jitter(&self) -> f64 {
        self.backoff.jitter()
    }

    /// The underlying delay schedule.
    pub fn backoff(&self) -> &ExponentialBackoff {
        &self.backoff
    }
}

impl BackoffStrategy for RetryPolicy {
    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.max_attempts {
            return None;
        }
        Some(self.backoff.delay(attempt - 1))
    }

    fn attempt_timeout(&self) -> Option<Duration> {
        self.per_attempt_timeout
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(0));
        }
        if self.per_attempt_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroTimeout);
        }
        self.backoff.validate()
    }
}

/// Builder for configuring `RetryPolicy`.
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_attempts: u32,
    backoff: ExponentialBackoffBuilder,
    per_attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: ExponentialBackoff::builder(),
            per_attempt_timeout: None,
        }
    }
}

impl RetryPolicyBuilder {
    /// Set the total number of attempts, including the first one.
    ///
    /// Default: 3
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the delay before the second attempt.
    ///
    /// Default: 1s
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.backoff = self.backoff.initial_delay(delay);
        self
    }

    /// Set the factor applied to the delay after each retry.
    ///
    /// Default: 2.0
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff = self.backoff.multiplier(multiplier);
        self
    }

    /// Abandon any attempt still running after `timeout`.
    ///
    /// Default: no timeout
    pub fn per_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.per_attempt_timeout = Some(timeout);
        self
    }

    /// Cap every delay at `delay`.
    ///
    /// Default: uncapped
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.backoff = self.backoff.max_delay(delay);
        self
    }

    /// Spread each delay by up to ±`jitter` (clamped to `[0.0, 1.0]`).
    ///
    /// Default: 0.0
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.backoff = self.backoff.jitter(jitter);
        self
    }

    /// Build the `RetryPolicy` instance.
    pub fn build(self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: self.backoff.build(),
            per_attempt_timeout: self.per_attempt_timeout,
        }
    }
}
