use std::time::{SystemTime, UNIX_EPOCH};

use embx_core::CacheKey;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    #[serde(serialize_with = "key_as_hex")]
    pub key: CacheKey,
    pub vector: Vec<f32>,
    pub dimensions: usize,
    pub provider: String,
    pub model: String,
    pub created_at_ms: u64,
}

impl CacheEntry {
    pub fn new(
        key: CacheKey,
        vector: Vec<f32>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            key,
            dimensions: vector.len(),
            vector,
            provider: provider.into(),
            model: model.into(),
            created_at_ms: now_ms(),
        }
    }
}

fn key_as_hex<S: serde::Serializer>(key: &CacheKey, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&key.to_hex())
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

pub(crate) fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub(crate) fn decode_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    bytes
        .chunks_exact(4)
        .map(|c| <[u8; 4]>::try_from(c).ok().map(f32::from_le_bytes))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_bytes_roundtrip() {
        let v = vec![1.0_f32, -2.5, 0.0, f32::MIN_POSITIVE];
        assert_eq!(decode_vector(&encode_vector(&v)), Some(v));
        assert_eq!(decode_vector(&[0, 1, 2]), None);
    }
}
