//! rewardcode - short, shareable reward codes authenticated by a truncated
//! HMAC-SHA256.
//!
//! A code carries its own payload (currency, optional label, optional usage
//! limit, optional bound user) and a hash over it, so a server can trust a
//! code without having stored it. Usage limits and username bindings are
//! checked against external collaborators with bounded retries.

pub mod canonical;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod limit;
pub mod models;
pub mod retry;
pub mod validate;
pub mod verify;

pub use codec::{decode, generate};
pub use crypto::{TruncationPolicy, get_required_length};
pub use error::{Error, FormatError, Result};
pub use models::{CodeKind, CodePayload};
pub use validate::{RequiredLength, check_hash};
pub use verify::{Verdict, Verifier};
