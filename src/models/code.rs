use strum::{AsRefStr, EnumString};

use crate::crypto::TruncationPolicy;
use crate::error::{Error, Result, msg};

/// Which kind of code this is. The strum form is the one-character kind tag
/// used both in the hash input and as the prefix of the final code segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum CodeKind {
    #[strum(serialize = "p")]
    Public,
    #[strum(serialize = "n")]
    PersonalByName,
    #[strum(serialize = "i")]
    PersonalById,
}

/// Kind-specific fields. Keeps `limit` on public codes and `username` on
/// name-bound codes by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Binding {
    Public { limit: Option<u64> },
    Username(String),
    UserId,
}

/// True when `s` is non-empty and made only of ASCII digits.
pub fn is_integer(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// The payload carried by a reward code.
///
/// Built fresh by the `public`/`for_username`/`for_user_id` constructors when
/// issuing, or reconstructed by [`crate::codec::decode`] from untrusted text.
/// A decoded payload carries the embedded hash and is not authenticated until
/// [`crate::validate::check_hash`] says so.
#[derive(Debug, Clone)]
pub struct CodePayload {
    binding: Binding,
    label: Option<String>,
    currency: u64,
    hash: Option<String>,
    hash_byte_length: Option<usize>,
    /// Identity resolved for the bound username. `Some(None)` means the
    /// username is known not to exist.
    resolved_identity: Option<Option<String>>,
}

impl CodePayload {
    /// A public code, optionally capped at `limit` uses.
    pub fn public(label: Option<&str>, currency: u64, limit: Option<u64>) -> Result<Self> {
        if limit == Some(0) {
            return Err(Error::InvalidPayload(msg::LIMIT_NOT_POSITIVE.into()));
        }
        Self::build(Binding::Public { limit }, label, currency)
    }

    /// A code only redeemable by the account currently holding `username`.
    pub fn for_username(label: Option<&str>, username: &str, currency: u64) -> Result<Self> {
        if username.is_empty() {
            return Err(Error::InvalidPayload(msg::USERNAME_EMPTY.into()));
        }
        if username.contains('-') {
            return Err(Error::InvalidPayload(msg::USERNAME_HAS_SEPARATOR.into()));
        }
        Self::build(Binding::Username(username.to_string()), label, currency)
    }

    /// A code bound to a user id. The id is not stored; it goes into the
    /// hash at generation time and must be presented again at validation.
    pub fn for_user_id(label: Option<&str>, currency: u64) -> Result<Self> {
        Self::build(Binding::UserId, label, currency)
    }

    fn build(binding: Binding, label: Option<&str>, currency: u64) -> Result<Self> {
        if let Some(label) = label {
            if label.is_empty() {
                return Err(Error::InvalidPayload(msg::LABEL_EMPTY.into()));
            }
            if label.contains('-') {
                return Err(Error::InvalidPayload(msg::LABEL_HAS_SEPARATOR.into()));
            }
            if is_integer(label) {
                return Err(Error::InvalidPayload(msg::LABEL_IS_INTEGER.into()));
            }
        }
        if currency == 0 {
            return Err(Error::InvalidPayload(msg::CURRENCY_NOT_POSITIVE.into()));
        }
        Ok(Self {
            binding,
            label: label.map(String::from),
            currency,
            hash: None,
            hash_byte_length: None,
            resolved_identity: None,
        })
    }

    /// Assembles a payload from already-checked decoded parts.
    pub(crate) fn decoded(
        kind: CodeKind,
        label: Option<String>,
        username: Option<String>,
        currency: u64,
        limit: Option<u64>,
        hash: String,
        hash_byte_length: usize,
    ) -> Self {
        let binding = match kind {
            CodeKind::Public => Binding::Public { limit },
            CodeKind::PersonalByName => Binding::Username(username.unwrap_or_default()),
            CodeKind::PersonalById => Binding::UserId,
        };
        Self {
            binding,
            label,
            currency,
            hash: Some(hash),
            hash_byte_length: Some(hash_byte_length),
            resolved_identity: None,
        }
    }

    pub fn kind(&self) -> CodeKind {
        match self.binding {
            Binding::Public { .. } => CodeKind::Public,
            Binding::Username(_) => CodeKind::PersonalByName,
            Binding::UserId => CodeKind::PersonalById,
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn currency(&self) -> u64 {
        self.currency
    }

    pub fn limit(&self) -> Option<u64> {
        match self.binding {
            Binding::Public { limit } => limit,
            _ => None,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match &self.binding {
            Binding::Username(name) => Some(name),
            _ => None,
        }
    }

    /// Lowercase hash text embedded in a decoded code.
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    /// Number of raw bytes the embedded hash encodes.
    pub fn hash_byte_length(&self) -> Option<usize> {
        self.hash_byte_length
    }

    /// Whether the embedded hash is at least as long as `policy` requires
    /// for this code's currency. Always false for payloads without a hash.
    pub fn meets_required_length(&self, policy: &TruncationPolicy) -> bool {
        self.hash_byte_length
            .is_some_and(|len| len >= policy.required_length(self.currency))
    }

    pub(crate) fn resolved_identity(&self) -> Option<Option<&str>> {
        self.resolved_identity.as_ref().map(|id| id.as_deref())
    }

    pub(crate) fn cache_identity(&mut self, identity: Option<String>) {
        self.resolved_identity = Some(identity);
    }
}
