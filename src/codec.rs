//! Code string generation and syntactic decoding.
//!
//! Format: `[label-][username-]currency[-limit]-{P|N|I}{HASH}`.
//!
//! Decoding does not check authenticity. Leading segments are assigned by a
//! fixed table keyed by code kind and segment count; the only ambiguous case
//! (a public code with three segments) is resolved by whether the first
//! segment is an integer, which is why labels may never be integers.

use std::str::FromStr;

use crate::canonical::validation_string;
use crate::crypto::{self, TruncationPolicy};
use crate::error::{FormatError, Result};
use crate::models::{CodeKind, CodePayload, is_integer};

pub const SEPARATOR: char = '-';

const MIN_PARTS: usize = 2;
const MAX_PARTS: usize = 4;

/// Issue the code string for `payload`.
///
/// `identity` is the user id for user-id bound codes; it is hashed but never
/// shown.
pub fn generate(
    payload: &CodePayload,
    key: &str,
    policy: &TruncationPolicy,
    identity: Option<&str>,
) -> Result<String> {
    let validation = validation_string(payload, identity)?;
    let digest = crypto::sign(&validation, key);
    let hash_len = policy.required_length(payload.currency());
    let hash = crypto::render(crypto::truncate(&digest, hash_len));

    let mut segments: Vec<String> = Vec::with_capacity(MAX_PARTS);
    if let Some(label) = payload.label() {
        segments.push(label.to_string());
    }
    if let Some(username) = payload.username() {
        segments.push(username.to_string());
    }
    segments.push(payload.currency().to_string());
    if let Some(limit) = payload.limit() {
        segments.push(limit.to_string());
    }
    segments.push(format!(
        "{}{}",
        payload.kind().as_ref().to_ascii_uppercase(),
        hash
    ));

    tracing::debug!(
        kind = payload.kind().as_ref(),
        currency = payload.currency(),
        hash_len,
        "Generated code"
    );

    Ok(segments.join("-"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Label,
    Username,
    Currency,
    Limit,
}

#[derive(Debug, Clone, Copy)]
enum Layout {
    Fixed(&'static [Field]),
    /// Choose by whether the first leading segment is an integer.
    NumericFirst {
        numeric: &'static [Field],
        otherwise: &'static [Field],
    },
    Reject(FormatError),
}

/// Leading-segment layouts by `(kind, total segment count)`.
const LAYOUTS: &[(CodeKind, usize, Layout)] = &[
    (
        CodeKind::Public,
        4,
        Layout::Fixed(&[Field::Label, Field::Currency, Field::Limit]),
    ),
    (
        CodeKind::Public,
        3,
        Layout::NumericFirst {
            numeric: &[Field::Currency, Field::Limit],
            otherwise: &[Field::Label, Field::Currency],
        },
    ),
    (CodeKind::Public, 2, Layout::Fixed(&[Field::Currency])),
    (
        CodeKind::PersonalByName,
        4,
        Layout::Fixed(&[Field::Label, Field::Username, Field::Currency]),
    ),
    (
        CodeKind::PersonalByName,
        3,
        Layout::Fixed(&[Field::Username, Field::Currency]),
    ),
    (
        CodeKind::PersonalByName,
        2,
        Layout::Reject(FormatError::TooFewParts),
    ),
    (
        CodeKind::PersonalById,
        4,
        Layout::Reject(FormatError::TooManyParts),
    ),
    (
        CodeKind::PersonalById,
        3,
        Layout::Fixed(&[Field::Label, Field::Currency]),
    ),
    (CodeKind::PersonalById, 2, Layout::Fixed(&[Field::Currency])),
];

fn fields_for(
    kind: CodeKind,
    count: usize,
    leading: &[&str],
) -> std::result::Result<&'static [Field], FormatError> {
    let layout = LAYOUTS
        .iter()
        .find(|(k, c, _)| *k == kind && *c == count)
        .map(|(_, _, layout)| *layout)
        .ok_or(FormatError::TooManyParts)?;

    match layout {
        Layout::Fixed(fields) => Ok(fields),
        Layout::NumericFirst { numeric, otherwise } => {
            if leading.first().is_some_and(|s| is_integer(s)) {
                Ok(numeric)
            } else {
                Ok(otherwise)
            }
        }
        Layout::Reject(err) => Err(err),
    }
}

/// Parse a code string into an unauthenticated payload.
pub fn decode(code: &str) -> std::result::Result<CodePayload, FormatError> {
    let parts: Vec<&str> = code.split(SEPARATOR).collect();

    if parts.len() < MIN_PARTS {
        return Err(FormatError::TooFewParts);
    }
    if parts.len() > MAX_PARTS {
        return Err(FormatError::TooManyParts);
    }

    let (last, leading) = parts
        .split_last()
        .ok_or(FormatError::TooFewParts)?;

    let mut chars = last.chars();
    let kind = chars
        .next()
        .and_then(|c| CodeKind::from_str(&c.to_string()).ok())
        .ok_or(FormatError::InvalidKindTag)?;

    let hash_text = chars.as_str();
    let hash_byte_length = crypto::parse(hash_text).ok_or(FormatError::InvalidHash)?;
    let hash = crypto::crockford_normalize(hash_text).ok_or(FormatError::InvalidHash)?;

    let fields = fields_for(kind, parts.len(), leading)?;

    let mut label = None;
    let mut username = None;
    let mut currency = None;
    let mut limit = None;
    for (field, value) in fields.iter().zip(leading.iter()) {
        match field {
            Field::Label => label = Some(*value),
            Field::Username => username = Some(*value),
            Field::Currency => currency = Some(*value),
            Field::Limit => limit = Some(*value),
        }
    }

    if label.is_some_and(str::is_empty) || username.is_some_and(str::is_empty) {
        return Err(FormatError::EmptySegment);
    }
    if label.is_some_and(is_integer) {
        return Err(FormatError::LabelIsInteger);
    }

    let currency = currency
        .filter(|s| is_integer(s))
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or(FormatError::InvalidCurrency)?;

    let limit = match limit {
        Some(s) if is_integer(s) => Some(s.parse::<u64>().map_err(|_| FormatError::InvalidLimit)?),
        Some(_) => return Err(FormatError::InvalidLimit),
        None => None,
    };

    Ok(CodePayload::decoded(
        kind,
        label.map(String::from),
        username.map(String::from),
        currency,
        limit,
        hash,
        hash_byte_length,
    ))
}
