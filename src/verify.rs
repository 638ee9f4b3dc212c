//! End-to-end redemption check: decode, authenticate, identity, usage limit.

use std::time::Duration;

use crate::codec::decode;
use crate::crypto::{self, TruncationPolicy};
use crate::error::{Error, Result};
use crate::identity::{IdentityLookup, check_identity};
use crate::limit::{CounterStore, check_limit};
use crate::models::{CodeKind, CodePayload};
use crate::validate::check_hash;

/// Default deadline for store and lookup calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of verifying a well-formed code.
#[derive(Debug, Clone)]
pub enum Verdict {
    /// Authentic and redeemable by the presenter. Carries the payload.
    Accepted(CodePayload),
    /// Hash mismatch, or a hash not exactly as long as the policy requires.
    Forged,
    /// Bound to someone other than the presenter.
    IdentityMismatch,
    /// Public code whose use count already exceeds its `limit`.
    LimitReached,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }
}

pub struct Verifier<S, L> {
    key: String,
    policy: TruncationPolicy,
    store: S,
    lookup: L,
    timeout: Duration,
    retry_on_ambiguous: bool,
}

impl<S: CounterStore, L: IdentityLookup> Verifier<S, L> {
    pub fn new(key: impl Into<String>, policy: TruncationPolicy, store: S, lookup: L) -> Self {
        Self {
            key: key.into(),
            policy,
            store,
            lookup,
            timeout: DEFAULT_TIMEOUT,
            retry_on_ambiguous: false,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retry store writes whose outcome is unknown. May count a use twice.
    pub fn retry_on_ambiguous(mut self, retry: bool) -> Self {
        self.retry_on_ambiguous = retry;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Verify `code` for a presenter with `identity`.
    ///
    /// `identity` is required for personal codes. The usage counter is only
    /// touched once the code is authentic and the identity matches.
    pub async fn verify(&self, code: &str, identity: Option<&str>) -> Result<Verdict> {
        let mut payload = decode(code)?;

        let presented = match payload.kind() {
            CodeKind::Public => None,
            CodeKind::PersonalByName | CodeKind::PersonalById => {
                Some(identity.ok_or(Error::MissingIdentity)?)
            }
        };

        // Exact length: the counter key covers the whole hash text, so extra
        // trailing characters must not yield a fresh counter.
        let required = self.policy.required_length(payload.currency());
        if payload.hash().map(str::len) != Some(crypto::rendered_len(required)) {
            tracing::warn!(
                currency = payload.currency(),
                hash_bytes = payload.hash_byte_length().unwrap_or(0),
                required,
                "Rejected code with wrong hash length"
            );
            return Ok(Verdict::Forged);
        }

        let hash_identity = match payload.kind() {
            CodeKind::PersonalById => presented,
            _ => None,
        };
        if !check_hash(&payload, &self.key, &self.policy, hash_identity)? {
            tracing::warn!(kind = payload.kind().as_ref(), "Rejected code with bad hash");
            return Ok(Verdict::Forged);
        }

        if let Some(presented) = presented
            && !check_identity(&mut payload, &self.lookup, presented, self.timeout).await?
        {
            return Ok(Verdict::IdentityMismatch);
        }

        if !check_limit(&payload, &self.store, self.timeout, self.retry_on_ambiguous).await? {
            return Ok(Verdict::LimitReached);
        }

        tracing::info!(
            kind = payload.kind().as_ref(),
            currency = payload.currency(),
            "Code accepted"
        );
        Ok(Verdict::Accepted(payload))
    }
}
