//! Retry execution with per-attempt timeouts and exponential backoff.
//!
//! # Key Types
//!
//! - [`RetryingTimeoutExecutor`] - Drives attempts and produces one result
//! - [`RetryPolicy`] - Attempt budget, backoff and timeout configuration
//! - [`BackoffStrategy`] - Trait the executor is generic over
//! - [`Operation`] - The unit of work being retried
//! - [`Execution`] / [`AttemptOutcome`] - What happened, attempt by attempt
//!
//! # Examples
//!
//! ```rust
//! use persevere::retry::{RetryPolicy, RetryingTimeoutExecutor};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = RetryPolicy::builder()
//!     .max_attempts(3)
//!     .initial_delay(Duration::from_millis(100))
//!     .per_attempt_timeout(Duration::from_secs(5))
//!     .build();
//!
//! let result = RetryingTimeoutExecutor::new()
//!     .execute(|| async {
//!         // Your operation here
//!         Ok::<_, std::io::Error>(42)
//!     }, &policy)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod executor;
mod exponential;
mod operation;
mod outcome;
mod policy;
mod strategy;

pub use executor::{RetryingTimeoutExecutor, execute};
pub use exponential::{ExponentialBackoff, ExponentialBackoffBuilder};
pub use operation::{AttemptContext, Operation, WithContext, with_context};
pub use outcome::{AttemptOutcome, AttemptStatus, Execution};
pub use policy::{RetryPolicy, RetryPolicyBuilder};
pub use strategy::BackoffStrategy;
