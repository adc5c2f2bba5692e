//! Per-attempt records and the successful execution report.

use crate::error::AttemptError;
use std::time::Duration;

/// How a single attempt concluded.
#[derive(Debug)]
pub enum AttemptStatus<E> {
    /// The operation produced a value
    Succeeded,
    /// The operation failed or timed out
    Failed(AttemptError<E>),
}

/// Record of one attempt within a single execution.
///
/// Records live only as long as the execution that produced them; they are
/// handed back inside [`Execution`] or [`Exhausted`](crate::error::Exhausted).
#[derive(Debug)]
pub struct AttemptOutcome<E> {
    attempt: u32,
    elapsed: Duration,
    backoff: Option<Duration>,
    status: AttemptStatus<E>,
}

impl<E> AttemptOutcome<E> {
    pub(crate) fn new(attempt: u32, elapsed: Duration, status: AttemptStatus<E>) -> Self {
        Self {
            attempt,
            elapsed,
            backoff: None,
            status,
        }
    }

    pub(crate) fn set_backoff(&mut self, delay: Duration) {
        self.backoff = Some(delay);
    }

    /// 1-based attempt index.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Time spent waiting on this attempt (excludes backoff).
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Delay slept after this attempt before the next one, if another attempt followed.
    pub fn backoff(&self) -> Option<Duration> {
        self.backoff
    }

    /// How the attempt concluded.
    pub fn status(&self) -> &AttemptStatus<E> {
        &self.status
    }

    /// Consume the record, returning how the attempt concluded.
    pub fn into_status(self) -> AttemptStatus<E> {
        self.status
    }

    /// Whether the attempt produced a value.
    pub fn succeeded(&self) -> bool {
        matches!(self.status, AttemptStatus::Succeeded)
    }

    /// The attempt's failure, if it failed.
    pub fn error(&self) -> Option<&AttemptError<E>> {
        match &self.status {
            AttemptStatus::Failed(err) => Some(err),
            AttemptStatus::Succeeded => None,
        }
    }
}

/// A successful execution together with the attempts it took.
#[derive(Debug)]
pub struct Execution<T, E> {
    value: T,
    history: Vec<AttemptOutcome<E>>,
    elapsed: Duration,
}

impl<T, E> Execution<T, E> {
    pub(crate) fn new(value: T, history: Vec<AttemptOutcome<E>>, elapsed: Duration) -> Self {
        Self {
            value,
            history,
            elapsed,
        }
    }

    /// The value returned by the successful attempt.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Consume the report, keeping only the value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Index of the attempt that succeeded, which is also the number of invocations.
    pub fn attempts(&self) -> u32 {
        self.history.len() as u32
    }

    /// Every attempt in order; all but the last one failed.
    pub fn history(&self) -> &[AttemptOutcome<E>] {
        &self.history
    }

    /// Failures that preceded the successful attempt.
    pub fn failures(&self) -> impl Iterator<Item = &AttemptError<E>> {
        self.history.iter().filter_map(AttemptOutcome::error)
    }

    /// Wall-clock time from the first attempt to success, including backoff.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}
