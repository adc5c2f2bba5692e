#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Retry asynchronous operations with a per-attempt timeout and exponential
//! backoff.
//!
//! This crate provides:
//!
//! - **A retrying executor** via [`RetryingTimeoutExecutor`](retry::RetryingTimeoutExecutor)
//! - **Backoff schedules** via the [`BackoffStrategy`](retry::BackoffStrategy) trait
//!   and [`RetryPolicy`](retry::RetryPolicy)
//! - **A standalone deadline** via [`with_timeout`](timeout::with_timeout)
//! - **Policy loading** from TOML, JSON and `PERSEVERE_*` environment variables
//!
//! Each attempt is raced against the policy's timeout. Failed or timed-out
//! attempts are followed by a delay of `initial_delay * multiplier^(n - 1)`
//! before attempt `n + 1`, until one succeeds or `max_attempts` is reached.
//! Exhaustion surfaces the last attempt's error together with the history of
//! every attempt.
//!
//! # Examples
//!
//! Using the prelude for convenient imports:
//!
//! ```rust
//! use persevere::prelude::*;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = RetryPolicy::builder()
//!     .max_attempts(3)
//!     .initial_delay(Duration::from_millis(100))
//!     .per_attempt_timeout(Duration::from_secs(2))
//!     .build();
//!
//! let result = RetryingTimeoutExecutor::named("fetch")
//!     .execute(|| async {
//!         Ok::<_, std::io::Error>(42)
//!     }, &policy)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod retry;
pub mod timeout;

pub use retry::execute;

/// Convenient re-exports of commonly used items.
///
/// Import everything needed to build a policy and run an operation with:
///
/// ```rust
/// use persevere::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::PolicyConfig;
    pub use crate::error::{AttemptError, ConfigError, Exhausted, FailureKind, RetryError};
    pub use crate::error_boundary;
    pub use crate::execute;
    pub use crate::retry::{
        AttemptContext, AttemptOutcome, AttemptStatus, BackoffStrategy, Execution,
        ExponentialBackoff, ExponentialBackoffBuilder, Operation, RetryPolicy,
        RetryPolicyBuilder, RetryingTimeoutExecutor, with_context,
    };
    pub use crate::timeout::{TimeoutError, with_timeout};
}
