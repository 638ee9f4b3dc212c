use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::crypto::TruncationPolicy;
use crate::error::{Error, Result, msg};
use crate::models::CodePayload;
use crate::verify::DEFAULT_TIMEOUT;

/// Settings read from the environment (and `.env`).
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Signing key (`REWARDCODE_KEY`)
    pub key: Option<String>,
    /// Flattened truncation policy (`REWARDCODE_BYTES`, comma-separated)
    pub bytes: Vec<u64>,
    /// Deadline for store and lookup calls (`REWARDCODE_TIMEOUT_MS`)
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let bytes = match env::var("REWARDCODE_BYTES") {
            Ok(raw) => parse_bytes(&raw)?,
            Err(_) => Vec::new(),
        };

        let timeout = env::var("REWARDCODE_TIMEOUT_MS")
            .ok()
            .and_then(|ms| ms.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT);

        Ok(Self {
            key: env::var("REWARDCODE_KEY").ok().filter(|k| !k.is_empty()),
            bytes,
            timeout,
        })
    }

    pub fn policy(&self) -> Result<TruncationPolicy> {
        TruncationPolicy::from_flat(&self.bytes)
    }
}

/// Parse a comma- or whitespace-separated list of integers.
pub fn parse_bytes(raw: &str) -> Result<Vec<u64>> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map_err(|_| Error::Config(format!("invalid bytes value: {}", s)))
        })
        .collect()
}

/// Options for issuing one code, as supplied by the CLI or a config file.
///
/// Exactly one of `public`, `username` and `userid` selects the code kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Options {
    pub key: String,
    pub public: bool,
    pub username: Option<String>,
    pub userid: Option<String>,
    pub label: Option<String>,
    pub currency: u64,
    pub max: Option<u64>,
    pub bytes: Vec<u64>,
}

/// A validated [`Options`] ready for [`crate::codec::generate`].
#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub key: String,
    pub payload: CodePayload,
    pub policy: TruncationPolicy,
    /// User id for user-id bound codes
    pub identity: Option<String>,
}

impl Options {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Fill unset fields from the environment config. Explicit options win.
    pub fn merge_config(mut self, config: &Config) -> Self {
        if self.key.is_empty()
            && let Some(key) = &config.key
        {
            self.key = key.clone();
        }
        if self.bytes.is_empty() {
            self.bytes = config.bytes.clone();
        }
        self
    }

    pub fn into_request(self) -> Result<IssueRequest> {
        if self.key.is_empty() {
            return Err(Error::Config("a signing key is required".into()));
        }

        let selected = [self.public, self.username.is_some(), self.userid.is_some()]
            .iter()
            .filter(|s| **s)
            .count();
        if selected != 1 {
            return Err(Error::Config(
                "exactly one of public, username or userid is required".into(),
            ));
        }

        if self.max.is_some() && !self.public {
            return Err(Error::Config("max is only valid for public codes".into()));
        }

        if self.bytes.len() % 2 != 0 {
            return Err(Error::Config(msg::BYTES_ODD_LENGTH.into()));
        }
        let policy = TruncationPolicy::from_flat(&self.bytes)?;

        let label = self.label.as_deref();
        let (payload, identity) = match (self.username, self.userid) {
            (Some(username), None) => (
                CodePayload::for_username(label, &username, self.currency)?,
                None,
            ),
            (None, Some(userid)) => {
                if userid.is_empty() {
                    return Err(Error::Config("userid must not be empty".into()));
                }
                (CodePayload::for_user_id(label, self.currency)?, Some(userid))
            }
            _ => (CodePayload::public(label, self.currency, self.max)?, None),
        };

        Ok(IssueRequest {
            key: self.key,
            payload,
            policy,
            identity,
        })
    }
}
