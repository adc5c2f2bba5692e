//! Example: Retrying an unreliable call with a per-attempt timeout
//!
//! This example demonstrates:
//! 1. Simple retry with exponential backoff
//! 2. Per-attempt timeouts (slow attempts are abandoned and retried)
//! 3. Exhaustion with the full attempt history
//! 4. Jitter impact (run multiple times to see variance)
//!
//! Run with:
//! ```bash
//! RUST_LOG=persevere=debug cargo run -p persevere --example retry_example
//! ```

use persevere::prelude::*;
use std::error::Error;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// A simulated API that fails the first few times
struct UnreliableApi {
    attempts: AtomicU32,
    fail_count: u32,
}

impl UnreliableApi {
    fn new(fail_count: u32) -> Self {
        Self {
            attempts: AtomicU32::new(0),
            fail_count,
        }
    }

    async fn call(&self) -> Result<String, std::io::Error> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        if attempt <= self.fail_count {
            println!("  Attempt {attempt}: FAILED (simulating transient error)");
            Err(std::io::Error::other(format!(
                "transient error on attempt {attempt}"
            )))
        } else {
            println!("  Attempt {attempt}: SUCCESS");
            Ok("API response data".to_string())
        }
    }

    fn total_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// Example 1: Simple retry with exponential backoff
async fn example_simple_retry() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 1: Simple Retry with Exponential Backoff ===\n");

    let policy = RetryPolicy::builder()
        .max_attempts(4)
        .initial_delay(Duration::from_millis(100))
        .backoff_multiplier(2.0)
        .build();

    let api = UnreliableApi::new(2);

    println!("Calling unreliable API (will fail 2 times before succeeding)...");
    let start = Instant::now();

    let result = RetryingTimeoutExecutor::named("unreliable_api")
        .execute(|| api.call(), &policy)
        .await?;

    println!("\nResult: {result}");
    println!("Total attempts: {}", api.total_attempts());
    println!("Total time: {:?}", start.elapsed());
    println!("Expected delays: 100ms + 200ms = ~300ms");

    Ok(())
}

/// Example 2: Slow attempts are abandoned after the per-attempt timeout
async fn example_attempt_timeout() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 2: Per-Attempt Timeout ===\n");

    let policy = RetryPolicy::builder()
        .max_attempts(3)
        .initial_delay(Duration::from_millis(20))
        .per_attempt_timeout(Duration::from_millis(50))
        .build();

    let execution = RetryingTimeoutExecutor::named("slow_then_fast")
        .execute_with_history(
            with_context(|ctx: AttemptContext| async move {
                // First attempt hangs, second answers quickly.
                let latency = if ctx.attempt() == 1 { 500 } else { 10 };
                tokio::time::sleep(Duration::from_millis(latency)).await;
                Ok::<_, std::io::Error>(format!("answered on attempt {}", ctx.attempt()))
            }),
            &policy,
        )
        .await?;

    for outcome in execution.history() {
        match outcome.error() {
            Some(err) => println!("  Attempt {}: {err}", outcome.attempt()),
            None => println!("  Attempt {}: ok in {:?}", outcome.attempt(), outcome.elapsed()),
        }
    }
    println!("\nResult: {}", execution.value());

    Ok(())
}

/// Example 3: Every attempt fails
async fn example_exhaustion() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 3: Exhausted Retries ===\n");

    let policy = RetryPolicy::builder()
        .max_attempts(3)
        .initial_delay(Duration::from_millis(10))
        .build();

    let api = UnreliableApi::new(u32::MAX);
    let err = RetryingTimeoutExecutor::named("always_down")
        .execute(|| api.call(), &policy)
        .await
        .unwrap_err();

    println!("\nError: {err}");
    if let Some(exhausted) = err.exhausted() {
        for outcome in exhausted.history() {
            println!(
                "  Attempt {} failed, backoff afterwards: {:?}",
                outcome.attempt(),
                outcome.backoff()
            );
        }
    }

    Ok(())
}

/// Example 4: Jitter demonstration
async fn example_jitter_impact() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 4: Jitter Impact (Run 10 Times) ===\n");

    let without_jitter = RetryPolicy::builder()
        .max_attempts(2)
        .initial_delay(Duration::from_millis(100))
        .build();

    let with_jitter = RetryPolicy::builder()
        .max_attempts(2)
        .initial_delay(Duration::from_millis(100))
        .jitter(0.3)
        .build();

    for (label, policy) in [("Without jitter", &without_jitter), ("With 30% jitter", &with_jitter)] {
        println!("{label} (10 runs):");
        let mut total = Duration::ZERO;
        for run in 1..=10 {
            let api = UnreliableApi::new(1);
            let start = Instant::now();
            let _ = persevere::execute(|| api.call(), policy).await;
            let elapsed = start.elapsed();
            total += elapsed;
            println!("  Run {run}: {elapsed:?}");
        }
        println!("  Average: {:?}\n", total / 10);
    }

    println!("Analysis:");
    println!("  No jitter: All delays should be very similar (~100ms)");
    println!("  With jitter: Delays should vary (70-130ms range)");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("==============================================");
    println!("   persevere: Retry Examples");
    println!("==============================================");

    example_simple_retry().await?;
    example_attempt_timeout().await?;
    example_exhaustion().await?;
    example_jitter_impact().await?;

    println!("\n==============================================");
    println!("   All examples completed successfully!");
    println!("==============================================\n");

    Ok(())
}
