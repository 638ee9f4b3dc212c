//! Fixed-interval retries bounded by a wall-clock deadline.
//!
//! Shared by the limit tracker and the identity resolver. The caller decides
//! which errors are worth another attempt; everything else is returned as-is.
//! Each attempt is also cut off at the deadline, so a collaborator that never
//! answers cannot hold the caller past it.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio::time::error::Elapsed;

/// Delay between attempts against an external collaborator
pub const RETRY_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Retry every [`RETRY_INTERVAL`] until `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            interval: RETRY_INTERVAL,
            timeout,
        }
    }
}

/// Run `op` until it succeeds, fails with an error `is_retryable` rejects, or
/// the next attempt would start after the deadline. The last error is
/// returned in the latter two cases. An attempt still running at the deadline
/// is dropped and reported as `E::from(Elapsed)`.
pub async fn retry_until_deadline<T, E, F, Fut, C>(
    operation: &str,
    policy: RetryPolicy,
    mut op: F,
    is_retryable: C,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
    E: Display + From<Elapsed>,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        let remaining = policy.timeout.saturating_sub(started.elapsed());
        let outcome = match tokio::time::timeout(remaining, op()).await {
            Ok(outcome) => outcome,
            Err(elapsed) => {
                tracing::error!(
                    operation,
                    attempts = attempt + 1,
                    timeout_ms = policy.timeout.as_millis() as u64,
                    "Attempt still pending at deadline, giving up"
                );
                return Err(E::from(elapsed));
            }
        };

        match outcome {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(operation, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => {
                if !is_retryable(&error) {
                    return Err(error);
                }

                if started.elapsed() + policy.interval > policy.timeout {
                    tracing::error!(
                        operation,
                        attempts = attempt + 1,
                        timeout_ms = policy.timeout.as_millis() as u64,
                        error = %error,
                        "Deadline exceeded, giving up"
                    );
                    return Err(error);
                }

                attempt += 1;
                tracing::warn!(
                    operation,
                    attempt,
                    error = %error,
                    "Retrying after transient failure"
                );
                tokio::time::sleep(policy.interval).await;
            }
        }
    }
}
