//! Tests that altered codes fail authentication.

#[path = "../common/mod.rs"]
mod common;
use common::*;

const CROCKFORD: &str = "0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Replace the character at `index` with a different alphabet character
fn flip(code: &str, index: usize) -> String {
    let mut chars: Vec<char> = code.chars().collect();
    let current = chars[index].to_ascii_uppercase();
    let replacement = CROCKFORD
        .chars()
        .find(|c| *c != current)
        .expect("alphabet has more than one character");
    chars[index] = replacement;
    chars.into_iter().collect()
}

#[test]
fn test_every_hash_character_flip_is_detected() {
    let payload = CodePayload::public(Some("Promo"), 1500, Some(4)).unwrap();
    let (code, _) = issue_and_decode(&payload, None);

    let hash_start = code.rfind('-').unwrap() + 2;

    for index in hash_start..code.len() {
        let tampered = flip(&code, index);
        let decoded = decode(&tampered).unwrap();
        assert!(
            !check_hash(&decoded, TEST_KEY, &tiered_policy(), None).unwrap(),
            "flipping position {index} should break the hash: {tampered}"
        );
    }
}

#[test]
fn test_changed_currency_is_detected() {
    let payload = CodePayload::public(None, 100, None).unwrap();
    let (code, _) = issue_and_decode(&payload, None);

    let inflated = code.replacen("100-", "400-", 1);
    let decoded = decode(&inflated).unwrap();
    assert_eq!(decoded.currency(), 400);
    assert!(!check_hash(&decoded, TEST_KEY, &tiered_policy(), None).unwrap());
}

#[test]
fn test_changed_limit_is_detected() {
    let payload = CodePayload::public(None, 100, Some(1)).unwrap();
    let (code, _) = issue_and_decode(&payload, None);

    let raised = code.replacen("100-1-", "100-9-", 1);
    let decoded = decode(&raised).unwrap();
    assert_eq!(decoded.limit(), Some(9));
    assert!(!check_hash(&decoded, TEST_KEY, &tiered_policy(), None).unwrap());
}

#[test]
fn test_changed_kind_is_detected() {
    let payload = CodePayload::for_user_id(None, 100).unwrap();
    let (code, _) = issue_and_decode(&payload, Some("7"));

    let made_public = code.replacen("-I", "-P", 1);
    let decoded = decode(&made_public).unwrap();
    assert_eq!(decoded.kind(), CodeKind::Public);
    assert!(!check_hash(&decoded, TEST_KEY, &tiered_policy(), None).unwrap());
}

#[test]
fn test_changed_username_is_detected() {
    let payload = CodePayload::for_username(None, "alice", 100).unwrap();
    let (code, _) = issue_and_decode(&payload, None);

    let stolen = code.replacen("alice", "mallory", 1);
    let decoded = decode(&stolen).unwrap();
    assert!(!check_hash(&decoded, TEST_KEY, &tiered_policy(), None).unwrap());
}
