//! Authenticity check for decoded codes. Reads nothing but the payload and
//! the key; usage limits and identity binding are checked elsewhere.

use subtle::ConstantTimeEq;

use crate::canonical::validation_string;
use crate::crypto::{self, TruncationPolicy};
use crate::error::{Error, Result};
use crate::models::CodePayload;

/// How many digest bytes the embedded hash must match.
#[derive(Debug, Clone, Copy)]
pub enum RequiredLength<'a> {
    Bytes(usize),
    Policy(&'a TruncationPolicy),
}

impl RequiredLength<'_> {
    fn resolve(&self, currency: u64) -> Result<usize> {
        match self {
            RequiredLength::Bytes(0) => Err(Error::ZeroRequiredLength),
            RequiredLength::Bytes(n) => Ok((*n).min(crypto::DIGEST_LENGTH)),
            RequiredLength::Policy(policy) => Ok(policy.required_length(currency)),
        }
    }
}

impl From<usize> for RequiredLength<'_> {
    fn from(bytes: usize) -> Self {
        RequiredLength::Bytes(bytes)
    }
}

impl<'a> From<&'a TruncationPolicy> for RequiredLength<'a> {
    fn from(policy: &'a TruncationPolicy) -> Self {
        RequiredLength::Policy(policy)
    }
}

/// Recompute the code hash and compare it with the one embedded in `payload`.
///
/// Returns `Ok(false)` on any mismatch, including a payload with no hash or a
/// hash shorter than required. Errors are contract violations: a user-id
/// bound payload checked without `identity`, or a fixed length of zero.
pub fn check_hash<'a>(
    payload: &CodePayload,
    key: &str,
    required: impl Into<RequiredLength<'a>>,
    identity: Option<&str>,
) -> Result<bool> {
    let validation = validation_string(payload, identity)?;
    let required_bytes = required.into().resolve(payload.currency())?;

    let digest = crypto::sign(&validation, key);
    let expected = crypto::render(crypto::truncate(&digest, required_bytes)).to_lowercase();

    let Some(embedded) = payload.hash() else {
        return Ok(false);
    };
    let Some(embedded) = embedded.get(..expected.len()) else {
        return Ok(false);
    };

    let embedded = embedded.to_lowercase();
    Ok(expected.as_bytes().ct_eq(embedded.as_bytes()).into())
}
