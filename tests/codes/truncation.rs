//! Tests for currency-tiered hash truncation.

#[path = "../common/mod.rs"]
mod common;
use common::*;

use rewardcode::crypto::{DIGEST_LENGTH, get_required_length};

#[test]
fn test_required_length_tiers() {
    let policy = tiered_policy();
    assert_eq!(get_required_length(100, &policy), 4);
    assert_eq!(get_required_length(500, &policy), 4);
    assert_eq!(get_required_length(2000, &policy), 6);
    assert_eq!(get_required_length(5000, &policy), 8);
    assert_eq!(get_required_length(9999, &policy), 12);
    assert_eq!(get_required_length(20000, &policy), DIGEST_LENGTH);
}

#[test]
fn test_generated_hash_length_follows_policy() {
    let cases = [(100, 4), (1000, 6), (3000, 8), (7000, 12), (20000, DIGEST_LENGTH)];

    for (currency, bytes) in cases {
        let payload = CodePayload::public(None, currency, None).unwrap();
        let (code, decoded) = issue_and_decode(&payload, None);
        assert_eq!(
            decoded.hash_byte_length(),
            Some(bytes),
            "currency {currency} should carry a {bytes} byte hash: {code}"
        );
    }
}

#[test]
fn test_larger_rewards_get_longer_codes() {
    let small = CodePayload::public(None, 400, None).unwrap();
    let large = CodePayload::public(None, 400_000, None).unwrap();

    let (small_code, _) = issue_and_decode(&small, None);
    let (large_code, _) = issue_and_decode(&large, None);
    assert!(small_code.len() < large_code.len());
}

#[test]
fn test_short_hash_does_not_meet_policy() {
    // Issued under a lax policy, checked under the strict one
    let lax = TruncationPolicy::new(vec![(100_000, 4)]).unwrap();
    let payload = CodePayload::public(None, 3000, None).unwrap();
    let code = generate(&payload, TEST_KEY, &lax, None).unwrap();
    let decoded = decode(&code).unwrap();

    assert!(decoded.meets_required_length(&lax));
    assert!(!decoded.meets_required_length(&tiered_policy()));
    assert!(!check_hash(&decoded, TEST_KEY, &tiered_policy(), None).unwrap());
}

#[test]
fn test_flat_policy_must_have_even_length() {
    assert!(matches!(
        TruncationPolicy::from_flat(&[500, 4, 2000]),
        Err(Error::Config(_))
    ));
    assert_eq!(
        TruncationPolicy::from_flat(&[500, 4, 2000, 6]).unwrap(),
        TruncationPolicy::new(vec![(500, 4), (2000, 6)]).unwrap()
    );
}
