//! Usage limits for public codes.
//!
//! Each use increments a counter in an external store under a key derived
//! from the code. The store's atomic read-modify-write is the only
//! concurrency guard: two redemptions of the same code race inside the store,
//! not here.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tokio::time::error::Elapsed;

use crate::canonical::validation_string;
use crate::error::{Error, Result};
use crate::models::CodePayload;
use crate::retry::{RetryPolicy, retry_until_deadline};

/// Separates the validation string from the hash in counter keys.
const COUNTER_DISCRIMINATOR: &str = "uses";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Queue full, throttled or otherwise busy. Nothing was written.
    #[error("store busy: {0}")]
    Transient(String),

    /// The write may or may not have been applied.
    #[error("store outcome unknown: {0}")]
    Ambiguous(String),

    #[error("store failure: {0}")]
    Fatal(String),

    /// No answer before the caller's deadline.
    #[error("store call exceeded the deadline")]
    Timeout,
}

impl From<Elapsed> for StoreError {
    fn from(_: Elapsed) -> Self {
        StoreError::Timeout
    }
}

/// External counter store keyed by arbitrary text.
pub trait CounterStore: Send + Sync {
    /// Atomically read the counter at `key`, compute the next value with
    /// `next` (`None` leaves it unchanged) and write it back. Returns the
    /// value read before the update.
    fn update<F>(
        &self,
        key: &str,
        next: F,
    ) -> impl Future<Output = std::result::Result<Option<u64>, StoreError>> + Send
    where
        F: Fn(Option<u64>) -> Option<u64> + Send + Sync;
}

/// Key under which uses of `payload` are counted.
pub fn counter_key(payload: &CodePayload) -> Result<String> {
    let validation = validation_string(payload, None)?;
    let hash = payload.hash().unwrap_or_default().to_lowercase();
    Ok(format!("{}-{}-{}", validation, COUNTER_DISCRIMINATOR, hash))
}

/// Counter transition for one use against `limit`.
fn next_count(prior: Option<u64>, limit: u64) -> Option<u64> {
    match prior {
        None => Some(1),
        Some(count) if count > limit => None,
        Some(count) => Some(count + 1),
    }
}

fn within_limit(prior: Option<u64>, limit: u64) -> bool {
    prior.is_none_or(|count| count <= limit)
}

/// Record one use of `payload` and report whether it is still within the
/// code's limit.
///
/// Codes without a limit return `Ok(true)` without touching the store.
/// Transient store errors are retried until `timeout`; ambiguous ones only
/// when `retry_on_ambiguous` is set, since a retry may count the same use
/// twice.
pub async fn check_limit<S: CounterStore>(
    payload: &CodePayload,
    store: &S,
    timeout: Duration,
    retry_on_ambiguous: bool,
) -> Result<bool> {
    let Some(limit) = payload.limit() else {
        return Ok(true);
    };

    let key = counter_key(payload)?;

    let prior = retry_until_deadline(
        "limit_check",
        RetryPolicy::with_timeout(timeout),
        || store.update(&key, move |prior| next_count(prior, limit)),
        |error: &StoreError| match error {
            StoreError::Transient(_) => true,
            StoreError::Ambiguous(_) => retry_on_ambiguous,
            StoreError::Fatal(_) | StoreError::Timeout => false,
        },
    )
    .await
    .map_err(|e| {
        tracing::error!(key = %key, error = %e, "Limit check failed");
        Error::Store(e.to_string())
    })?;

    let within = within_limit(prior, limit);
    tracing::info!(
        key = %key,
        limit,
        prior = prior.unwrap_or(0),
        within,
        "Limit checked"
    );
    Ok(within)
}

/// In-process counter store. Suitable for tests and single-process use.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: Mutex<HashMap<String, u64>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.counters.lock().ok()?.get(key).copied()
    }
}

impl CounterStore for MemoryCounterStore {
    async fn update<F>(&self, key: &str, next: F) -> std::result::Result<Option<u64>, StoreError>
    where
        F: Fn(Option<u64>) -> Option<u64> + Send + Sync,
    {
        let mut counters = self
            .counters
            .lock()
            .map_err(|e| StoreError::Fatal(format!("counter lock poisoned: {}", e)))?;

        let prior = counters.get(key).copied();
        if let Some(value) = next(prior) {
            counters.insert(key.to_string(), value);
        }
        Ok(prior)
    }
}
