//! Code authentication: HMAC-SHA256 over the validation string, truncated by
//! a currency-tiered policy and rendered as Crockford base-32.
//!
//! Smaller rewards get shorter hashes. The policy maps a currency ceiling to
//! the number of leading digest bytes kept; amounts above every ceiling keep
//! the full 32-byte digest.
//!
//! Text format: uppercase Crockford base-32 (`0-9A-Z` minus `I L O U`),
//! most significant bit first, no padding. Parsing is case-insensitive and
//! accepts the usual Crockford aliases (`O` for `0`, `I`/`L` for `1`).

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{Error, Result, msg};

type HmacSha256 = Hmac<Sha256>;

/// Output size of HMAC-SHA256 in bytes
pub const DIGEST_LENGTH: usize = 32;

/// Size of keys produced by [`generate_key`]
const GENERATED_KEY_SIZE: usize = 32;

const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Compute HMAC-SHA256 of the validation string. Key and message are used as
/// their UTF-8 bytes.
pub fn sign(validation_string: &str, key: &str) -> [u8; DIGEST_LENGTH] {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(validation_string.as_bytes());

    let mut digest = [0u8; DIGEST_LENGTH];
    digest.copy_from_slice(&mac.finalize().into_bytes());
    digest
}

/// Keep the first `len` bytes (or everything, if `len` is larger).
pub fn truncate(bytes: &[u8], len: usize) -> &[u8] {
    &bytes[..len.min(bytes.len())]
}

/// Render bytes as uppercase Crockford base-32.
pub fn render(bytes: &[u8]) -> String {
    crockford_encode(bytes)
}

/// Number of characters [`render`] produces for `bytes` bytes.
pub fn rendered_len(bytes: usize) -> usize {
    (bytes * 8).div_ceil(5)
}

/// Byte length encoded by a hash text, or `None` if the text is not valid
/// Crockford base-32 or decodes to nothing.
pub fn parse(text: &str) -> Option<usize> {
    crockford_decode(text)
        .map(|bytes| bytes.len())
        .filter(|len| *len > 0)
}

/// Currency-tiered truncation table.
///
/// Tiers are `(currency_ceiling, byte_count)` with strictly ascending
/// ceilings, so first-match and last-match lookups agree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TruncationPolicy {
    tiers: Vec<(u64, usize)>,
}

impl TruncationPolicy {
    pub fn new(tiers: Vec<(u64, usize)>) -> Result<Self> {
        if tiers.windows(2).any(|w| w[0].0 >= w[1].0) {
            return Err(Error::Config(msg::BYTES_NOT_ASCENDING.into()));
        }
        if tiers
            .iter()
            .any(|(_, bytes)| *bytes == 0 || *bytes > DIGEST_LENGTH)
        {
            return Err(Error::Config(msg::BYTES_OUT_OF_RANGE.into()));
        }
        Ok(Self { tiers })
    }

    /// Build from a flattened `ceiling, bytes, ceiling, bytes, ...` list.
    pub fn from_flat(values: &[u64]) -> Result<Self> {
        if values.len() % 2 != 0 {
            return Err(Error::Config(msg::BYTES_ODD_LENGTH.into()));
        }
        let tiers = values
            .chunks_exact(2)
            .map(|pair| {
                let bytes = usize::try_from(pair[1])
                    .map_err(|_| Error::Config(msg::BYTES_OUT_OF_RANGE.into()))?;
                Ok((pair[0], bytes))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(tiers)
    }

    /// A policy that never truncates.
    pub fn full() -> Self {
        Self::default()
    }

    pub fn tiers(&self) -> &[(u64, usize)] {
        &self.tiers
    }

    /// Bytes of digest required for `currency`: the first tier whose ceiling
    /// is at least `currency`, otherwise the full digest.
    pub fn required_length(&self, currency: u64) -> usize {
        self.tiers
            .iter()
            .find(|(ceiling, _)| *ceiling >= currency)
            .map(|(_, bytes)| *bytes)
            .unwrap_or(DIGEST_LENGTH)
    }
}

/// Free-function form of [`TruncationPolicy::required_length`].
pub fn get_required_length(currency: u64, policy: &TruncationPolicy) -> usize {
    policy.required_length(currency)
}

/// Generate a new random signing key.
/// Returns the key as a base64-encoded string.
pub fn generate_key() -> String {
    use rand::RngCore;
    use rand::rngs::OsRng;
    let mut key = [0u8; GENERATED_KEY_SIZE];
    OsRng.fill_bytes(&mut key);
    BASE64.encode(key)
}

pub fn crockford_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(rendered_len(bytes.len()));
    let mut buffer: u16 = 0;
    let mut bits: u32 = 0;

    for &byte in bytes {
        buffer = (buffer << 8) | u16::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(CROCKFORD_ALPHABET[usize::from((buffer >> bits) & 0x1f)] as char);
        }
        buffer &= (1u16 << bits) - 1;
    }

    if bits > 0 {
        out.push(CROCKFORD_ALPHABET[usize::from((buffer << (5 - bits)) & 0x1f)] as char);
    }

    out
}

/// Decode Crockford base-32. Trailing bits that do not fill a byte are
/// dropped.
pub fn crockford_decode(text: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() * 5 / 8);
    let mut buffer: u16 = 0;
    let mut bits: u32 = 0;

    for c in text.chars() {
        buffer = (buffer << 5) | u16::from(crockford_value(c)?);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1u16 << bits) - 1;
        }
    }

    Some(out)
}

/// Rewrite hash text into canonical lowercase form, resolving aliases.
pub fn crockford_normalize(text: &str) -> Option<String> {
    text.chars()
        .map(|c| crockford_value(c).map(|v| CROCKFORD_ALPHABET[usize::from(v)].to_ascii_lowercase() as char))
        .collect()
}

fn crockford_value(c: char) -> Option<u8> {
    let c = c.to_ascii_uppercase();
    match c {
        'O' => Some(0),
        'I' | 'L' => Some(1),
        _ => CROCKFORD_ALPHABET
            .iter()
            .position(|&a| a as char == c)
            .map(|pos| pos as u8),
    }
}
