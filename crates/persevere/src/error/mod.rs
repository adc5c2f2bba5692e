//! Error types for retried executions.
//!
//! Failures are layered:
//! - [`AttemptError`] describes why one attempt failed (timeout or operation failure).
//!   Attempt errors are recorded and retried, never returned on their own.
//! - [`Exhausted`] is the terminal failure once every attempt has failed.
//! - [`ConfigError`] rejects a policy before any attempt runs.
//! - [`RetryError`] is what crosses the boundary to the caller.

mod boundary;

use crate::retry::{AttemptOutcome, AttemptStatus};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Coarse classification of every failure the executor can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The policy was rejected before any attempt ran.
    Configuration,
    /// An attempt exceeded the per-attempt timeout.
    AttemptTimeout,
    /// The operation itself reported failure.
    OperationFailure,
    /// Every permitted attempt failed.
    ExhaustedRetries,
}

/// Why a single attempt failed.
///
/// Both variants are retryable. They stay distinct so diagnostics can tell a
/// slow dependency from a failing one.
#[derive(Debug, Error)]
pub enum AttemptError<E> {
    /// The attempt was abandoned after the per-attempt timeout elapsed
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    /// The operation returned an error
    #[error("operation failed: {0}")]
    Operation(#[source] E),
}

impl<E> AttemptError<E> {
    /// Classify this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout(_) => FailureKind::AttemptTimeout,
            Self::Operation(_) => FailureKind::OperationFailure,
        }
    }

    /// Whether the attempt was abandoned on timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// The operation's own error, if the operation reported one.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::Operation(err) => Some(err),
            Self::Timeout(_) => None,
        }
    }

    /// Consume the failure, returning the operation's own error if any.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::Operation(err) => Some(err),
            Self::Timeout(_) => None,
        }
    }
}

/// Terminal failure after every permitted attempt failed.
///
/// Holds the complete attempt history. The canonical cause is the failure of
/// the last attempt; earlier failures remain inspectable via [`history`](Self::history).
pub struct Exhausted<E> {
    // Non-empty, and the final entry is a failure.
    history: Vec<AttemptOutcome<E>>,
    elapsed: Duration,
}

impl<E> Exhausted<E> {
    pub(crate) fn new(history: Vec<AttemptOutcome<E>>, elapsed: Duration) -> Self {
        debug_assert!(
            history.last().is_some_and(|outcome| !outcome.succeeded()),
            "exhaustion requires a failed final attempt"
        );
        Self { history, elapsed }
    }

    /// Number of attempts made.
    pub fn attempts(&self) -> u32 {
        self.history.len() as u32
    }

    /// The failure of the last attempt.
    pub fn cause(&self) -> &AttemptError<E> {
        match self.history.last().map(AttemptOutcome::status) {
            Some(AttemptStatus::Failed(err)) => err,
            _ => unreachable!("exhaustion is only constructed after a failed attempt"),
        }
    }

    /// Consume the failure, returning the last attempt's error.
    pub fn into_cause(mut self) -> AttemptError<E> {
        match self.history.pop().map(AttemptOutcome::into_status) {
            Some(AttemptStatus::Failed(err)) => err,
            _ => unreachable!("exhaustion is only constructed after a failed attempt"),
        }
    }

    /// Every attempt, in order.
    pub fn history(&self) -> &[AttemptOutcome<E>] {
        &self.history
    }

    /// Consume the failure, returning every attempt.
    pub fn into_history(self) -> Vec<AttemptOutcome<E>> {
        self.history
    }

    /// Wall-clock time from the first attempt to exhaustion, including backoff.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

impl<E: fmt::Debug> fmt::Debug for Exhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exhausted")
            .field("attempts", &self.attempts())
            .field("elapsed", &self.elapsed)
            .field("history", &self.history)
            .finish()
    }
}

impl<E: fmt::Display> fmt::Display for Exhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "operation failed after {} attempt(s): {}",
            self.attempts(),
            self.cause()
        )
    }
}

impl<E> std::error::Error for Exhausted<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause())
    }
}

/// Error returned by the executor.
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// The policy was invalid; the operation was never invoked
    #[error("invalid retry policy: {0}")]
    Configuration(#[from] ConfigError),

    /// Every permitted attempt failed
    #[error(transparent)]
    Exhausted(Exhausted<E>),
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Classify this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Configuration(_) => FailureKind::Configuration,
            Self::Exhausted(_) => FailureKind::ExhaustedRetries,
        }
    }

    /// The exhaustion details, if retries were exhausted.
    pub fn exhausted(&self) -> Option<&Exhausted<E>> {
        match self {
            Self::Exhausted(exhausted) => Some(exhausted),
            Self::Configuration(_) => None,
        }
    }

    /// The last attempt's failure, if any attempt ran.
    pub fn cause(&self) -> Option<&AttemptError<E>> {
        self.exhausted().map(Exhausted::cause)
    }

    /// Number of attempts made before giving up (zero for configuration errors).
    pub fn attempts(&self) -> u32 {
        self.exhausted().map_or(0, Exhausted::attempts)
    }
}

/// Invalid retry configuration, or a configuration source that could not be loaded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// `max_attempts` below one
    #[error("max_attempts must be at least 1 (got {0})")]
    InvalidMaxAttempts(i64),

    /// A duration field was negative
    #[error("{field} must not be negative (got {value_ms}ms)")]
    NegativeDuration {
        /// Name of the offending field
        field: &'static str,
        /// The rejected value in milliseconds
        value_ms: i64,
    },

    /// Multiplier was negative, NaN or infinite
    #[error("backoff_multiplier must be finite and non-negative (got {0})")]
    InvalidMultiplier(f64),

    /// Jitter outside `[0.0, 1.0]`
    #[error("jitter must be within [0.0, 1.0] (got {0})")]
    InvalidJitter(f64),

    /// A zero per-attempt timeout would abandon every attempt
    #[error("per_attempt_timeout must be greater than zero")]
    ZeroTimeout,

    /// The delay cap is below the first delay
    #[error("max_delay ({max_delay:?}) must not be below initial_delay ({initial_delay:?})")]
    MaxDelayBelowInitial {
        /// Configured initial delay
        initial_delay: Duration,
        /// Configured cap
        max_delay: Duration,
    },

    /// Policy file could not be read
    #[error("failed to read policy file: {0}")]
    Io(String),

    /// Policy source could not be parsed
    #[error("failed to parse policy: {0}")]
    Parse(String),

    /// Environment variable held an unparsable value
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv {
        /// Variable name
        var: String,
        /// Raw value
        value: String,
    },

    /// File extension is neither `.toml` nor `.json`
    #[error("unsupported policy file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

crate::error_boundary!(std::io::Error => ConfigError, |e| {
    ConfigError::Io(e.to_string())
});

crate::error_boundary!(toml::de::Error => ConfigError, |e| {
    ConfigError::Parse(e.message().to_string())
});

crate::error_boundary!(serde_json::Error => ConfigError, |e| {
    ConfigError::Parse(e.to_string())
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    fn failed(attempt: u32, error: AttemptError<io::Error>) -> AttemptOutcome<io::Error> {
        AttemptOutcome::new(attempt, Duration::from_millis(5), AttemptStatus::Failed(error))
    }

    #[test]
    fn test_attempt_error_kinds() {
        let timeout: AttemptError<io::Error> = AttemptError::Timeout(Duration::from_millis(50));
        assert_eq!(timeout.kind(), FailureKind::AttemptTimeout);
        assert!(timeout.is_timeout());
        assert!(timeout.operation_error().is_none());

        let op = AttemptError::Operation(io::Error::other("boom"));
        assert_eq!(op.kind(), FailureKind::OperationFailure);
        assert_eq!(op.operation_error().map(ToString::to_string), Some("boom".into()));
        assert!(op.source().is_some());
    }

    #[test]
    fn test_exhausted_cause_is_last_attempt() {
        let exhausted = Exhausted::new(
            vec![
                failed(1, AttemptError::Operation(io::Error::other("first"))),
                failed(2, AttemptError::Timeout(Duration::from_millis(50))),
            ],
            Duration::from_millis(80),
        );

        assert_eq!(exhausted.attempts(), 2);
        assert!(exhausted.cause().is_timeout());
        assert_eq!(exhausted.history().len(), 2);
        assert_eq!(
            exhausted.to_string(),
            "operation failed after 2 attempt(s): attempt timed out after 50ms"
        );
        assert!(exhausted.source().is_some());
        assert!(exhausted.into_cause().is_timeout());
    }

    #[test]
    fn test_exhausted_history_hands_back_operation_errors() {
        let exhausted = Exhausted::new(
            vec![
                failed(1, AttemptError::Operation(io::Error::other("refused"))),
                failed(2, AttemptError::Timeout(Duration::from_millis(50))),
                failed(3, AttemptError::Operation(io::Error::other("reset"))),
            ],
            Duration::from_millis(120),
        );

        let errors: Vec<_> = exhausted
            .into_history()
            .into_iter()
            .filter_map(|outcome| match outcome.into_status() {
                AttemptStatus::Failed(err) => err.into_operation_error(),
                AttemptStatus::Succeeded => None,
            })
            .map(|err| err.to_string())
            .collect();

        assert_eq!(errors, vec!["refused", "reset"]);
    }

    #[test]
    fn test_retry_error_accessors() {
        let err: RetryError<io::Error> = ConfigError::ZeroTimeout.into();
        assert_eq!(err.kind(), FailureKind::Configuration);
        assert_eq!(err.attempts(), 0);
        assert!(err.cause().is_none());
        assert!(err.to_string().contains("per_attempt_timeout"));

        let err: RetryError<io::Error> = RetryError::Exhausted(Exhausted::new(
            vec![failed(1, AttemptError::Operation(io::Error::other("down")))],
            Duration::ZERO,
        ));
        assert_eq!(err.kind(), FailureKind::ExhaustedRetries);
        assert_eq!(err.attempts(), 1);
        assert_eq!(err.cause().map(AttemptError::kind), Some(FailureKind::OperationFailure));
    }

    #[test]
    fn test_config_error_boundaries() {
        let err: ConfigError = io::Error::new(io::ErrorKind::NotFound, "no such file").into();
        assert!(matches!(err, ConfigError::Io(msg) if msg.contains("no such file")));

        let err: ConfigError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
