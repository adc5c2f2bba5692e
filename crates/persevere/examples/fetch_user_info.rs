//! Example: Fetching independent resources concurrently, each under its own
//! retry policy
//!
//! A user profile and the user's posts are fetched from a flaky simulated
//! backend. Each fetch is retried independently with a per-attempt timeout,
//! and the two executions run concurrently. If either one exhausts its
//! retries the combined result fails.
//!
//! Run with:
//! ```bash
//! RUST_LOG=persevere=debug cargo run -p persevere --example fetch_user_info
//! ```

use persevere::prelude::*;
use rand::Rng;
use std::error::Error;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum FetchError {
    #[error("backend returned {status} for {resource}")]
    Status { resource: &'static str, status: u16 },
}

#[derive(Debug)]
struct User {
    id: u64,
    name: String,
}

#[derive(Debug)]
struct Post {
    title: String,
}

/// Simulated network call: random latency, fails about a third of the time.
async fn flaky_request(resource: &'static str) -> Result<(), FetchError> {
    let (latency, fails) = {
        let mut rng = rand::thread_rng();
        (rng.gen_range(10..150), rng.gen_bool(0.33))
    };

    tokio::time::sleep(Duration::from_millis(latency)).await;
    if fails {
        Err(FetchError::Status {
            resource,
            status: 503,
        })
    } else {
        Ok(())
    }
}

async fn fetch_user(id: u64) -> Result<User, FetchError> {
    flaky_request("user").await?;
    Ok(User {
        id,
        name: "Ada".to_string(),
    })
}

async fn fetch_posts(user_id: u64) -> Result<Vec<Post>, FetchError> {
    flaky_request("posts").await?;
    Ok((1..=3)
        .map(|n| Post {
            title: format!("post {n} by user {user_id}"),
        })
        .collect())
}

async fn fetch_user_info(
    user_id: u64,
    policy: &RetryPolicy,
) -> Result<(User, Vec<Post>), RetryError<FetchError>> {
    let users = RetryingTimeoutExecutor::named("fetch_user");
    let posts = RetryingTimeoutExecutor::named("fetch_posts");

    tokio::try_join!(
        users.execute(|| fetch_user(user_id), policy),
        posts.execute(|| fetch_posts(user_id), policy),
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let policy = RetryPolicy::builder()
        .max_attempts(5)
        .initial_delay(Duration::from_millis(50))
        .per_attempt_timeout(Duration::from_millis(100))
        .jitter(0.1)
        .build();

    println!("Fetching user info with policy: {policy:?}\n");
    let start = Instant::now();

    match fetch_user_info(42, &policy).await {
        Ok((user, posts)) => {
            println!("User #{}: {}", user.id, user.name);
            for post in &posts {
                println!("  - {}", post.title);
            }
        }
        Err(err) => {
            println!("Failed: {err}");
            if let Some(exhausted) = err.exhausted() {
                let timeouts = exhausted
                    .history()
                    .iter()
                    .filter(|outcome| outcome.error().is_some_and(AttemptError::is_timeout))
                    .count();
                println!("  {timeouts} of {} attempts timed out", exhausted.attempts());
            }
        }
    }

    println!("\nTotal time: {:?}", start.elapsed());
    Ok(())
}
