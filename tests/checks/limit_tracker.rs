//! Tests for usage limits against an unreliable counter store.

use std::time::Duration;

#[path = "../common/mod.rs"]
mod common;
use common::*;

use rewardcode::limit::counter_key;

fn limited_code(limit: u64) -> CodePayload {
    let payload = CodePayload::public(Some("Promo"), 100, Some(limit)).unwrap();
    issue_and_decode(&payload, None).1
}

// ============================================================================
// Counting
// ============================================================================

#[tokio::test]
async fn test_uses_are_within_until_count_exceeds_limit() {
    let store = MemoryCounterStore::new();
    let payload = limited_code(3);
    let timeout = Duration::from_secs(1);

    let mut outcomes = Vec::new();
    for _ in 0..5 {
        outcomes.push(check_limit(&payload, &store, timeout, false).await.unwrap());
    }
    // Refused only once the prior count is above the limit
    assert_eq!(outcomes, [true, true, true, true, false]);

    // Rejected uses leave the counter unchanged
    let key = counter_key(&payload).unwrap();
    assert_eq!(store.get(&key), Some(4));
}

#[tokio::test]
async fn test_code_without_limit_never_touches_store() {
    let store = FlakyStore::failing_with(vec![StoreError::Fatal("down".into())]);
    let payload = CodePayload::public(None, 100, None).unwrap();
    let (_, decoded) = issue_and_decode(&payload, None);

    assert!(check_limit(&decoded, &store, Duration::from_secs(1), false).await.unwrap());
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_different_codes_count_separately() {
    let store = MemoryCounterStore::new();
    let first = limited_code(1);
    let second = decode(
        &generate(
            &CodePayload::public(Some("Other"), 100, Some(1)).unwrap(),
            TEST_KEY,
            &tiered_policy(),
            None,
        )
        .unwrap(),
    )
    .unwrap();

    let timeout = Duration::from_secs(1);
    assert!(check_limit(&first, &store, timeout, false).await.unwrap());
    assert!(check_limit(&first, &store, timeout, false).await.unwrap());
    assert!(!check_limit(&first, &store, timeout, false).await.unwrap());
    assert!(check_limit(&second, &store, timeout, false).await.unwrap());
}

// ============================================================================
// Retries
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried_until_success() {
    let store = FlakyStore::failing_with(vec![
        StoreError::Transient("queue full".into()),
        StoreError::Transient("queue full".into()),
    ]);
    let payload = limited_code(5);

    let within = check_limit(&payload, &store, RETRY_INTERVAL * 2 + Duration::from_millis(5), false)
        .await
        .unwrap();

    assert!(within);
    assert_eq!(store.calls(), 3);
    assert_eq!(store.count(&counter_key(&payload).unwrap()), Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_shorter_than_interval_fails() {
    let store = FlakyStore::failing_with(vec![StoreError::Transient("throttled".into())]);
    let payload = limited_code(5);

    let err = check_limit(&payload, &store, RETRY_INTERVAL / 2, false)
        .await
        .unwrap_err();

    match err {
        Error::Store(reason) => assert!(reason.contains("throttled"), "reason: {reason}"),
        other => panic!("expected store error, got {other:?}"),
    }
    assert_eq!(store.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_store_fails_at_deadline() {
    let payload = limited_code(5);
    let started = tokio::time::Instant::now();

    let result = check_limit(&payload, &StalledStore, Duration::from_millis(50), false).await;

    assert!(matches!(result, Err(Error::Store(_))), "got {result:?}");
    assert!(started.elapsed() < Duration::from_millis(60));
}

#[tokio::test(start_paused = true)]
async fn test_fatal_error_is_not_retried() {
    let store = FlakyStore::failing_with(vec![StoreError::Fatal("disk gone".into())]);
    let payload = limited_code(5);

    let result = check_limit(&payload, &store, Duration::from_secs(10), true).await;
    assert!(matches!(result, Err(Error::Store(_))));
    assert_eq!(store.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ambiguous_error_fails_without_opt_in() {
    let store = FlakyStore::failing_with(vec![StoreError::Ambiguous("timed out".into())]);
    let payload = limited_code(5);

    let result = check_limit(&payload, &store, Duration::from_secs(10), false).await;
    assert!(matches!(result, Err(Error::Store(_))));
    assert_eq!(store.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ambiguous_retry_can_double_count() {
    // The first write lands but reports an unknown outcome; retrying counts
    // the same use again.
    let store = FlakyStore::failing_with(vec![StoreError::Ambiguous("timed out".into())]);
    let payload = limited_code(1);

    let within = check_limit(&payload, &store, Duration::from_secs(10), true)
        .await
        .unwrap();

    assert!(within);
    assert_eq!(store.calls(), 2);
    assert_eq!(store.count(&counter_key(&payload).unwrap()), Some(2));
}
