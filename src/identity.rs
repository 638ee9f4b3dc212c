//! Identity binding for username-bound codes.
//!
//! Usernames can change hands, so a name-bound code is checked against the
//! stable identity the name resolves to at redemption time. The resolution is
//! cached on the payload; a name that does not exist is cached too and never
//! looked up again for that payload.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::error::Elapsed;

use crate::error::{Error, Result};
use crate::models::{CodeKind, CodePayload};
use crate::retry::{RetryPolicy, retry_until_deadline};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("username does not exist")]
    NotFound,

    #[error("lookup unavailable: {0}")]
    Transient(String),

    #[error("lookup failure: {0}")]
    Fatal(String),

    #[error("lookup exceeded the deadline")]
    Timeout,
}

impl From<Elapsed> for LookupError {
    fn from(_: Elapsed) -> Self {
        LookupError::Timeout
    }
}

/// External name -> stable identity resolver.
pub trait IdentityLookup: Send + Sync {
    fn resolve(
        &self,
        username: &str,
    ) -> impl Future<Output = std::result::Result<String, LookupError>> + Send;
}

/// Check that `presented` is the identity behind the code's bound username.
///
/// Codes that are not name-bound return `Ok(true)`. A failed lookup leaves
/// the payload unresolved, so a later call will try again.
pub async fn check_identity<L: IdentityLookup>(
    payload: &mut CodePayload,
    lookup: &L,
    presented: &str,
    timeout: Duration,
) -> Result<bool> {
    if payload.kind() != CodeKind::PersonalByName {
        return Ok(true);
    }

    if payload.resolved_identity().is_none() {
        let username = payload.username().unwrap_or_default().to_string();

        let resolved = retry_until_deadline(
            "identity_lookup",
            RetryPolicy::with_timeout(timeout),
            || lookup.resolve(&username),
            |error: &LookupError| matches!(error, LookupError::Transient(_)),
        )
        .await;

        match resolved {
            Ok(id) => {
                tracing::debug!(username = %username, id = %id, "Resolved username");
                payload.cache_identity(Some(id));
            }
            Err(LookupError::NotFound) => {
                tracing::info!(username = %username, "Bound username does not exist");
                payload.cache_identity(None);
            }
            Err(e) => {
                tracing::error!(username = %username, error = %e, "Identity lookup failed");
                return Err(Error::Lookup(e.to_string()));
            }
        }
    }

    Ok(payload
        .resolved_identity()
        .flatten()
        .is_some_and(|id| id == presented))
}

/// Fixed username -> identity table. Usernames match case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentityLookup {
    identities: HashMap<String, String>,
}

impl MemoryIdentityLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, username: &str, identity: &str) -> Self {
        self.insert(username, identity);
        self
    }

    pub fn insert(&mut self, username: &str, identity: &str) {
        self.identities
            .insert(username.to_lowercase(), identity.to_string());
    }
}

impl IdentityLookup for MemoryIdentityLookup {
    async fn resolve(&self, username: &str) -> std::result::Result<String, LookupError> {
        self.identities
            .get(&username.to_lowercase())
            .cloned()
            .ok_or(LookupError::NotFound)
    }
}
