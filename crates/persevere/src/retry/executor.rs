//! Drives an operation through timed attempts with backoff in between.

use super::operation::{AttemptContext, Operation};
use super::outcome::{AttemptOutcome, AttemptStatus, Execution};
use super::strategy::BackoffStrategy;
use crate::error::{AttemptError, Exhausted, RetryError};
use crate::timeout::{TimeoutError, with_timeout};
use std::borrow::Cow;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Runs an [`Operation`] under a [`BackoffStrategy`] until it succeeds or
/// the attempt budget is spent.
///
/// The executor holds no mutable state, so one instance can serve any number
/// of concurrent executions. Attempts within one execution are strictly
/// sequential: attempt `n + 1` starts only after attempt `n` has concluded and
/// the backoff delay has fully elapsed.
///
/// # Timeouts and cancellation
///
/// When an attempt exceeds the policy's per-attempt timeout its future is
/// dropped and the attempt's [`AttemptContext::cancellation_token`] is
/// cancelled. Work the operation spawned onto other tasks keeps running
/// unless it observes that token.
///
/// If the operation completes at the same instant the timeout fires, the
/// operation wins: it is polled before the deadline is checked.
///
/// # Examples
///
/// ```rust
/// use persevere::prelude::*;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let policy = RetryPolicy::builder()
///     .max_attempts(3)
///     .initial_delay(Duration::from_millis(10))
///     .per_attempt_timeout(Duration::from_millis(100))
///     .build();
///
/// let calls = AtomicU32::new(0);
/// let value = RetryingTimeoutExecutor::named("flaky")
///     .execute(
///         || async {
///             if calls.fetch_add(1, Ordering::SeqCst) < 2 {
///                 Err(std::io::Error::other("transient"))
///             } else {
///                 Ok(42)
///             }
///         },
///         &policy,
///     )
///     .await?;
///
/// assert_eq!(value, 42);
/// assert_eq!(calls.load(Ordering::SeqCst), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RetryingTimeoutExecutor {
    name: Cow<'static, str>,
}

impl Default for RetryingTimeoutExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryingTimeoutExecutor {
    /// Create an executor with a generic label.
    pub fn new() -> Self {
        Self::named("operation")
    }

    /// Create an executor whose log events carry `name`.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: name.into() }
    }

    /// Label used in log events.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `operation` under `policy`, returning the first successful value.
    ///
    /// # Errors
    ///
    /// - [`RetryError::Configuration`] if the policy is invalid; the operation is never invoked.
    /// - [`RetryError::Exhausted`] once every attempt has failed or timed out.
    pub async fn execute<O, S>(
        &self,
        operation: O,
        policy: &S,
    ) -> Result<O::Output, RetryError<O::Error>>
    where
        O: Operation,
        O::Error: std::error::Error + 'static,
        S: BackoffStrategy + ?Sized,
    {
        self.execute_with_history(operation, policy)
            .await
            .map(Execution::into_value)
    }

    /// Run `operation` under `policy`, returning the value together with
    /// every attempt it took.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute). The exhaustion error carries the
    /// full history as well.
    pub async fn execute_with_history<O, S>(
        &self,
        operation: O,
        policy: &S,
    ) -> Result<Execution<O::Output, O::Error>, RetryError<O::Error>>
    where
        O: Operation,
        O::Error: std::error::Error + 'static,
        S: BackoffStrategy + ?Sized,
    {
        if let Err(err) = policy.validate() {
            warn!(operation = %self.name, error = %err, "rejecting invalid retry policy");
            return Err(err.into());
        }

        let max_attempts = policy.max_attempts();
        let span = info_span!("retry", operation = %self.name, max_attempts);

        run_attempts(&operation, policy, max_attempts)
            .instrument(span)
            .await
    }
}

async fn run_attempts<O, S>(
    operation: &O,
    policy: &S,
    max_attempts: u32,
) -> Result<Execution<O::Output, O::Error>, RetryError<O::Error>>
where
    O: Operation,
    O::Error: std::error::Error + 'static,
    S: BackoffStrategy + ?Sized,
{
    let timeout = policy.attempt_timeout();
    let started = Instant::now();
    let mut history = Vec::new();
    let mut attempt = 1;

    loop {
        let ctx = AttemptContext::new(attempt, max_attempts);
        let attempt_started = Instant::now();
        debug!(attempt, "starting attempt");

        let result = match timeout {
            Some(limit) => match with_timeout(limit, operation.run(&ctx)).await {
                Ok(result) => result.map_err(AttemptError::Operation),
                Err(TimeoutError { after }) => {
                    ctx.cancel();
                    Err(AttemptError::Timeout(after))
                }
            },
            None => operation.run(&ctx).await.map_err(AttemptError::Operation),
        };
        let elapsed = attempt_started.elapsed();

        let err = match result {
            Ok(value) => {
                history.push(AttemptOutcome::new(attempt, elapsed, AttemptStatus::Succeeded));
                if attempt > 1 {
                    info!(attempt, "operation succeeded after retry");
                } else {
                    debug!(attempt, "operation succeeded");
                }
                return Ok(Execution::new(value, history, started.elapsed()));
            }
            Err(err) => err,
        };

        warn!(
            attempt,
            max_attempts,
            kind = ?err.kind(),
            error = %err,
            "attempt failed"
        );
        let mut outcome = AttemptOutcome::new(attempt, elapsed, AttemptStatus::Failed(err));

        let next_delay = if attempt < max_attempts {
            policy.next_delay(attempt)
        } else {
            None
        };

        let Some(delay) = next_delay else {
            history.push(outcome);
            error!(attempts = attempt, "retries exhausted");
            return Err(RetryError::Exhausted(Exhausted::new(
                history,
                started.elapsed(),
            )));
        };

        outcome.set_backoff(delay);
        history.push(outcome);
        debug!(
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "backing off before next attempt"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Run `operation` under `policy` with a default executor.
///
/// Shorthand for [`RetryingTimeoutExecutor::execute`].
///
/// # Errors
///
/// See [`RetryingTimeoutExecutor::execute`].
pub async fn execute<O, S>(operation: O, policy: &S) -> Result<O::Output, RetryError<O::Error>>
where
    O: Operation,
    O::Error: std::error::Error + 'static,
    S: BackoffStrategy + ?Sized,
{
    RetryingTimeoutExecutor::new()
        .execute(operation, policy)
        .await
}
