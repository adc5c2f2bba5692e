//! Exponential backoff with optional jitter.

use crate::error::ConfigError;
use std::time::Duration;

/// Exponential delay schedule.
///
/// Delays between retries grow geometrically: `initial_delay * multiplier^n`,
/// optionally capped at `max_delay` and spread by `jitter`.
///
/// # Mathematical Formula
///
/// For retry `n` (0-indexed, i.e. the wait after attempt `n + 1` fails):
/// ```text
/// base_delay = initial_delay * (multiplier ^ n)
/// capped_delay = min(base_delay, max_delay)
/// final_delay = capped_delay * (1 + jitter * random(-1.0, +1.0))
/// ```
///
/// With the default `jitter` of `0.0` the schedule is deterministic and,
/// for `multiplier >= 1`, non-decreasing.
///
/// # Examples
///
/// ```rust
/// use persevere::retry::ExponentialBackoff;
/// use std::time::Duration;
///
/// let backoff = ExponentialBackoff::builder()
///     .initial_delay(Duration::from_millis(10))
///     .multiplier(2.0)
///     .build();
///
/// assert_eq!(backoff.delay(0), Duration::from_millis(10));
/// assert_eq!(backoff.delay(1), Duration::from_millis(20));
/// assert_eq!(backoff.delay(2), Duration::from_millis(40));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    multiplier: f64,
    max_delay: Option<Duration>,
    jitter: f64,
}

impl ExponentialBackoff {
    /// Create a new builder for configuring exponential backoff.
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder::default()
    }

    /// Delay before the first retry.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Growth factor between consecutive delays.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Upper bound on any single delay, if set.
    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// Jitter fraction in `[0.0, 1.0]`.
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Delay before retry `retry` (0-indexed).
    ///
    /// Saturates at [`Duration::MAX`] instead of overflowing.
    pub fn delay(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let mut secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);

        if let Some(max_delay) = self.max_delay {
            secs = secs.min(max_delay.as_secs_f64());
        }

        if self.jitter > 0.0 {
            // Uniform in [secs * (1 - jitter), secs * (1 + jitter)]
            secs += secs * self.jitter * (rand::random::<f64>() - 0.5) * 2.0;
        }

        if secs.is_nan() {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    /// Check the schedule's parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.multiplier.is_finite() || self.multiplier < 0.0 {
            return Err(ConfigError::InvalidMultiplier(self.multiplier));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::InvalidJitter(self.jitter));
        }
        if let Some(max_delay) = self.max_delay
            && max_delay < self.initial_delay
        {
            return Err(ConfigError::MaxDelayBelowInitial {
                initial_delay: self.initial_delay,
                max_delay,
            });
        }
        Ok(())
    }
}

impl Default for ExponentialBackoff {
    /// Defaults:
    /// - `initial_delay`: 1s
    /// - `multiplier`: 2.0 (doubles each time)
    /// - `max_delay`: none
    /// - `jitter`: 0.0
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: None,
            jitter: 0.0,
        }
    }
}

/// Builder for configuring `ExponentialBackoff`.
///
/// Unset parameters fall back to [`ExponentialBackoff::default`].
#[derive(Debug, Default, Clone)]
pub struct ExponentialBackoffBuilder {
    initial_delay: Option<Duration>,
    multiplier: Option<f64>,
    max_delay: Option<Duration>,
    jitter: Option<f64>,
}

impl ExponentialBackoffBuilder {
    /// Set the delay before the first retry.
    ///
    /// Default: 1s
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set the exponential multiplier.
    ///
    /// Default: 2.0
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Cap every delay at `delay`.
    ///
    /// Default: uncapped
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the jitter factor, clamped to `[0.0, 1.0]`.
    ///
    /// A jitter of 0.1 lets each delay vary by ±10%.
    ///
    /// Default: 0.0
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter.clamp(0.0, 1.0));
        self
    }

    /// Build the `ExponentialBackoff` instance.
    pub fn build(self) -> ExponentialBackoff {
        let defaults = ExponentialBackoff::default();
        ExponentialBackoff {
            initial_delay: self.initial_delay.unwrap_or(defaults.initial_delay),
            multiplier: self.multiplier.unwrap_or(defaults.multiplier),
            max_delay: self.max_delay.or(defaults.max_delay),
            jitter: self.jitter.unwrap_or(defaults.jitter),
        }
    }
}
