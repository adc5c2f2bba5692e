//! Race a future against a deadline.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// The wrapped future did not complete in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation timed out after {after:?}")]
pub struct TimeoutError {
    /// The deadline that elapsed
    pub after: Duration,
}

/// Await `future`, giving up after `duration`.
///
/// On timeout the future is dropped, which cancels it at its current
/// suspension point. Work it handed to other tasks is not stopped.
///
/// The future is polled before the deadline is checked, so a future that is
/// ready at the same instant the deadline fires counts as completed.
///
/// # Examples
///
/// ```rust
/// use persevere::timeout::with_timeout;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let slow = tokio::time::sleep(Duration::from_secs(10));
/// let err = with_timeout(Duration::from_millis(10), slow).await.unwrap_err();
/// assert_eq!(err.after, Duration::from_millis(10));
/// # }
/// ```
pub async fn with_timeout<F>(duration: Duration, future: F) -> Result<F::Output, TimeoutError>
where
    F: Future,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| TimeoutError { after: duration })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_completes_before_deadline() {
        let result = with_timeout(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            42
        })
        .await;

        assert_eq!(result, Ok(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_at_deadline() {
        let start = tokio::time::Instant::now();
        let result = with_timeout(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_millis(500)).await;
        })
        .await;

        assert_eq!(
            result,
            Err(TimeoutError {
                after: Duration::from_millis(50)
            })
        );
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50) && elapsed < Duration::from_millis(60));
        assert_eq!(
            result.unwrap_err().to_string(),
            "operation timed out after 50ms"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_future_completes() {
        let result = with_timeout(Duration::from_millis(1), std::future::ready("done")).await;
        assert_eq!(result, Ok("done"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_future_settling_at_deadline_wins() {
        let start = tokio::time::Instant::now();
        let result = with_timeout(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            "settled"
        })
        .await;

        assert_eq!(result, Ok("settled"));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50) && elapsed < Duration::from_millis(55));
    }
}
