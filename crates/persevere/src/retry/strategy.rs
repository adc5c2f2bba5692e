//! The schedule abstraction the executor is generic over.

use crate::error::ConfigError;
use std::time::Duration;

/// How many attempts to make, how long to wait between them, and how long
/// each attempt may run.
///
/// [`RetryPolicy`](super::RetryPolicy) is the standard implementation.
/// Implement this trait to drive the executor with a custom schedule.
///
/// # Examples
///
/// ```rust
/// use persevere::prelude::*;
/// use std::time::Duration;
///
/// /// Constant delay between attempts.
/// struct Fixed {
///     attempts: u32,
///     delay: Duration,
/// }
///
/// impl BackoffStrategy for Fixed {
///     fn max_attempts(&self) -> u32 {
///         self.attempts
///     }
///
///     fn next_delay(&self, attempt: u32) -> Option<Duration> {
///         (attempt < self.attempts).then_some(self.delay)
///     }
/// }
///
/// let fixed = Fixed { attempts: 3, delay: Duration::from_millis(50) };
/// assert_eq!(fixed.schedule(), vec![Duration::from_millis(50); 2]);
/// ```
pub trait BackoffStrategy: Send + Sync {
    /// Total invocations permitted, including the first one.
    fn max_attempts(&self) -> u32;

    /// Delay to wait after `attempt` (1-based) has failed.
    ///
    /// Returns `None` when no further attempt should be made, which must be
    /// the case once `attempt >= max_attempts()`.
    fn next_delay(&self, attempt: u32) -> Option<Duration>;

    /// Maximum wall-clock time for a single attempt. `None` waits indefinitely.
    fn attempt_timeout(&self) -> Option<Duration> {
        None
    }

    /// Reject configurations the executor cannot honour.
    ///
    /// Called once per execution, before the first attempt.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts() == 0 {
            return Err(ConfigError::InvalidMaxAttempts(0));
        }
        if self.attempt_timeout() == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Every inter-attempt delay, in order.
    ///
    /// Has `max_attempts() - 1` entries for schedules that never stop early.
    fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts())
            .map_while(|attempt| self.next_delay(attempt))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        attempts: u32,
        delay: Duration,
        timeout: Option<Duration>,
    }

    impl BackoffStrategy for Fixed {
        fn max_attempts(&self) -> u32 {
            self.attempts
        }

        fn next_delay(&self, attempt: u32) -> Option<Duration> {
            (attempt < self.attempts).then_some(self.delay)
        }

        fn attempt_timeout(&self) -> Option<Duration> {
            self.timeout
        }
    }

    #[test]
    fn test_default_validation() {
        let ok = Fixed {
            attempts: 2,
            delay: Duration::from_millis(1),
            timeout: None,
        };
        assert!(ok.validate().is_ok());

        let zero_attempts = Fixed {
            attempts: 0,
            delay: Duration::from_millis(1),
            timeout: None,
        };
        assert_eq!(
            zero_attempts.validate(),
            Err(ConfigError::InvalidMaxAttempts(0))
        );

        let zero_timeout = Fixed {
            attempts: 1,
            delay: Duration::from_millis(1),
            timeout: Some(Duration::ZERO),
        };
        assert_eq!(zero_timeout.validate(), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn test_schedule_has_one_delay_between_each_pair_of_attempts() {
        let fixed = Fixed {
            attempts: 4,
            delay: Duration::from_millis(7),
            timeout: None,
        };
        assert_eq!(fixed.schedule(), vec![Duration::from_millis(7); 3]);

        let single = Fixed {
            attempts: 1,
            delay: Duration::from_millis(7),
            timeout: None,
        };
        assert!(single.schedule().is_empty());
    }
}
