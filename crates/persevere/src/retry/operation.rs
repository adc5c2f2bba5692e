//! The unit of work driven by the executor.

use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Per-attempt context handed to an [`Operation`].
///
/// The attempt index is scoped to one execution, so it can serve as a request
/// id without any process-wide counter. The token is cancelled when the
/// executor abandons the attempt on timeout.
#[derive(Debug, Clone)]
pub struct AttemptContext {
    attempt: u32,
    max_attempts: u32,
    cancel: CancellationToken,
}

impl AttemptContext {
    pub(crate) fn new(attempt: u32, max_attempts: u32) -> Self {
        Self {
            attempt,
            max_attempts,
            cancel: CancellationToken::new(),
        }
    }

    /// 1-based attempt index.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Total attempts the policy permits.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether this is the final permitted attempt.
    pub fn is_last_attempt(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Token cancelled when this attempt is abandoned.
    ///
    /// The attempt's future is dropped on timeout regardless. Operations only
    /// need the token for work they spawned outside that future.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// An asynchronous unit of work that can be invoked repeatedly.
///
/// The executor calls [`run`](Self::run) once per attempt and never resumes
/// a partially completed attempt. Any `Fn() -> Future<Output = Result<T, E>>`
/// closure is an operation; use [`with_context`] for closures that want the
/// [`AttemptContext`].
///
/// # Examples
///
/// ```rust
/// use persevere::prelude::*;
///
/// struct Ping;
///
/// impl Operation for Ping {
///     type Output = &'static str;
///     type Error = std::io::Error;
///
///     async fn run(&self, ctx: &AttemptContext) -> Result<Self::Output, Self::Error> {
///         if ctx.attempt() < 2 {
///             Err(std::io::Error::other("not yet"))
///         } else {
///             Ok("pong")
///         }
///     }
/// }
/// ```
pub trait Operation: Send + Sync {
    /// Value produced on success.
    type Output: Send;

    /// Error reported on failure.
    type Error: Send;

    /// Run one attempt.
    fn run(
        &self,
        ctx: &AttemptContext,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

impl<F, Fut, T, E> Operation for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send,
    T: Send,
    E: Send,
{
    type Output = T;
    type Error = E;

    fn run(&self, _ctx: &AttemptContext) -> impl Future<Output = Result<T, E>> + Send {
        self()
    }
}

/// Operation built from a closure that receives the [`AttemptContext`].
///
/// Created by [`with_context`].
#[derive(Debug, Clone)]
pub struct WithContext<F> {
    f: F,
}

/// Adapt a context-aware closure into an [`Operation`].
///
/// # Examples
///
/// ```rust
/// use persevere::prelude::*;
///
/// let op = with_context(|ctx: AttemptContext| async move {
///     tokio::select! {
///         _ = ctx.cancellation_token().cancelled() => Err(std::io::Error::other("abandoned")),
///         _ = tokio::time::sleep(std::time::Duration::from_millis(5)) => Ok(ctx.attempt()),
///     }
/// });
/// # let _ = op;
/// ```
pub fn with_context<F, Fut, T, E>(f: F) -> WithContext<F>
where
    F: Fn(AttemptContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send,
{
    WithContext { f }
}

impl<F, Fut, T, E> Operation for WithContext<F>
where
    F: Fn(AttemptContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send,
    T: Send,
    E: Send,
{
    type Output = T;
    type Error = E;

    fn run(&self, ctx: &AttemptContext) -> impl Future<Output = Result<T, E>> + Send {
        (self.f)(ctx.clone())
    }
}
