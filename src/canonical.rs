//! Canonical validation string: the only input to the code HMAC.
//!
//! Lowercase, `-`-joined, in fixed order:
//! `[label] [identity, non-public only] currency [limit] kind_tag`

use crate::error::{Error, Result};
use crate::models::{CodeKind, CodePayload};

/// Build the validation string for `payload`.
///
/// `identity` is only read for user-id bound codes, where it is required.
pub fn validation_string(payload: &CodePayload, identity: Option<&str>) -> Result<String> {
    let mut parts: Vec<String> = Vec::with_capacity(5);

    if let Some(label) = payload.label() {
        parts.push(label.to_lowercase());
    }

    match payload.kind() {
        CodeKind::Public => {}
        CodeKind::PersonalByName => {
            parts.push(payload.username().unwrap_or_default().to_lowercase());
        }
        CodeKind::PersonalById => {
            let identity = identity.ok_or(Error::MissingIdentity)?;
            parts.push(identity.to_lowercase());
        }
    }

    parts.push(payload.currency().to_string());

    if let Some(limit) = payload.limit() {
        parts.push(limit.to_string());
    }

    parts.push(payload.kind().as_ref().to_string());

    Ok(parts.join("-"))
}
