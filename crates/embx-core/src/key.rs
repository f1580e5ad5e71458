//! Content fingerprints for cached embeddings.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::request::EmbeddingParams;

/// Bumped whenever the byte layout fed to the hasher changes.
const KEY_SCHEMA: &[u8] = b"embx-key-v2";

/// SHA-256 fingerprint of (provider, model, canonical text, params).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    pub fn derive(provider: &str, model: &str, text: &str, params: EmbeddingParams) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(KEY_SCHEMA);
        update_field(&mut hasher, provider.as_bytes());
        update_field(&mut hasher, model.as_bytes());
        // Presence byte first so `None` and `Some(0)` stay distinct.
        match params.dimensions {
            Some(d) => {
                hasher.update([1_u8]);
                update_field(&mut hasher, &(d as u64).to_le_bytes());
            }
            None => hasher.update([0_u8]),
        }
        update_field(&mut hasher, params.truncation.as_str().as_bytes());
        update_field(&mut hasher, canonical_text(text).as_bytes());
        Self(hasher.finalize().into())
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        use fmt::Write;
        self.0.iter().fold(String::with_capacity(64), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCacheKeyError;

impl fmt::Display for ParseCacheKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("cache key must be 64 hex characters")
    }
}

impl std::error::Error for ParseCacheKeyError {}

impl FromStr for CacheKey {
    type Err = ParseCacheKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 || !s.is_ascii() {
            return Err(ParseCacheKeyError);
        }
        let mut out = [0_u8; 32];
        for (slot, pair) in out.iter_mut().zip(s.as_bytes().chunks_exact(2)) {
            let hex = std::str::from_utf8(pair).map_err(|_| ParseCacheKeyError)?;
            *slot = u8::from_str_radix(hex, 16).map_err(|_| ParseCacheKeyError)?;
        }
        Ok(Self(out))
    }
}

fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Line endings are the only normalization; any other byte difference is a
/// different request.
pub fn canonical_text(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::TruncationMode;

    fn key(provider: &str, model: &str, text: &str, params: EmbeddingParams) -> CacheKey {
        CacheKey::derive(provider, model, text, params)
    }

    #[test]
    fn same_inputs_give_same_key() {
        let p = EmbeddingParams::default().with_dimensions(256);
        assert_eq!(key("openai", "m", "hello", p), key("openai", "m", "hello", p));
    }

    #[test]
    fn any_field_change_changes_key() {
        let base = key("openai", "m", "hello", EmbeddingParams::default());
        assert_ne!(base, key("voyage", "m", "hello", EmbeddingParams::default()));
        assert_ne!(base, key("openai", "m2", "hello", EmbeddingParams::default()));
        assert_ne!(base, key("openai", "m", "hello!", EmbeddingParams::default()));
        assert_ne!(
            base,
            key("openai", "m", "hello", EmbeddingParams::default().with_dimensions(8))
        );
        assert_ne!(
            base,
            key(
                "openai",
                "m",
                "hello",
                EmbeddingParams::default().with_truncation(TruncationMode::End)
            )
        );
    }

    #[test]
    fn zero_dimensions_differ_from_unset() {
        let unset = key("openai", "m", "hello", EmbeddingParams::default());
        let zero = key("openai", "m", "hello", EmbeddingParams::default().with_dimensions(0));
        assert_ne!(unset, zero);
    }

    #[test]
    fn field_boundaries_do_not_collide() {
        let p = EmbeddingParams::default();
        assert_ne!(key("ab", "c", "x", p), key("a", "bc", "x", p));
        assert_ne!(key("a|b", "c", "x", p), key("a", "b|c", "x", p));
    }

    #[test]
    fn crlf_and_lf_share_a_key() {
        let p = EmbeddingParams::default();
        assert_eq!(key("o", "m", "a\r\nb", p), key("o", "m", "a\nb", p));
        assert_ne!(key("o", "m", "a b", p), key("o", "m", "a  b", p));
    }

    #[test]
    fn hex_roundtrips() {
        let k = key("o", "m", "text", EmbeddingParams::default());
        let hex = k.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(hex.parse::<CacheKey>(), Ok(k));
        assert!("xyz".parse::<CacheKey>().is_err());
    }
}
