//! Tests for syntactic decoding and its rejection rules.

#[path = "../common/mod.rs"]
mod common;
use common::*;

// ============================================================================
// Rejections
// ============================================================================

#[test]
fn test_single_segment_is_too_few_parts() {
    assert_eq!(decode("100").unwrap_err(), FormatError::TooFewParts);
}

#[test]
fn test_five_segments_is_too_many_parts() {
    assert_eq!(
        decode("a-b-c-100-P0000000").unwrap_err(),
        FormatError::TooManyParts
    );
}

#[test]
fn test_unknown_kind_tag() {
    assert_eq!(decode("100-X0000000").unwrap_err(), FormatError::InvalidKindTag);
}

#[test]
fn test_integer_label() {
    assert_eq!(
        decode("123-100-5-P0000000").unwrap_err(),
        FormatError::LabelIsInteger
    );
    assert_eq!(
        decode("123-bob-100-N0000000").unwrap_err(),
        FormatError::LabelIsInteger
    );
}

#[test]
fn test_bad_hash() {
    assert_eq!(decode("100-P").unwrap_err(), FormatError::InvalidHash);
    assert_eq!(decode("100-PU000000").unwrap_err(), FormatError::InvalidHash);
    // one character is less than a byte
    assert_eq!(decode("100-PA").unwrap_err(), FormatError::InvalidHash);
}

#[test]
fn test_non_integer_amounts() {
    assert_eq!(decode("1e3-P0000000").unwrap_err(), FormatError::InvalidCurrency);
    assert_eq!(
        decode("Promo-100-five-P0000000").unwrap_err(),
        FormatError::InvalidLimit
    );
    assert_eq!(
        decode("99999999999999999999999-P0000000").unwrap_err(),
        FormatError::InvalidCurrency
    );
}

#[test]
fn test_empty_label_or_username_segment() {
    assert_eq!(decode("-250-P0000000").unwrap_err(), FormatError::EmptySegment);
    assert_eq!(decode("-bob-250-N0000000").unwrap_err(), FormatError::EmptySegment);
    assert_eq!(decode("Gift--250-N0000000").unwrap_err(), FormatError::EmptySegment);
    assert_eq!(decode("-250-I0000000").unwrap_err(), FormatError::EmptySegment);
}

#[test]
fn test_name_bound_needs_username_segment() {
    assert_eq!(decode("100-N0000000").unwrap_err(), FormatError::TooFewParts);
}

#[test]
fn test_id_bound_allows_at_most_label() {
    assert_eq!(
        decode("Gift-bob-100-I0000000").unwrap_err(),
        FormatError::TooManyParts
    );
}

// ============================================================================
// Positional disambiguation
// ============================================================================

#[test]
fn test_public_three_segments_numeric_first_is_currency_and_limit() {
    let payload = decode("250-10-P0000000").unwrap();
    assert_eq!(payload.label(), None);
    assert_eq!(payload.currency(), 250);
    assert_eq!(payload.limit(), Some(10));
}

#[test]
fn test_public_three_segments_text_first_is_label_and_currency() {
    let payload = decode("Promo-250-P0000000").unwrap();
    assert_eq!(payload.label(), Some("Promo"));
    assert_eq!(payload.currency(), 250);
    assert_eq!(payload.limit(), None);
}

#[test]
fn test_decoded_payload_is_unauthenticated() {
    // Syntactically fine, but the hash is made up
    let payload = decode("250-p0000000").unwrap();
    assert_eq!(payload.hash(), Some("0000000"));
    assert_eq!(payload.hash_byte_length(), Some(4));
    assert!(!check_hash(&payload, TEST_KEY, &tiered_policy(), None).unwrap());
}
