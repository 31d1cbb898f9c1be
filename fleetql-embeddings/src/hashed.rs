//! Deterministic hashed bag-of-tokens embedder.
//!
//! Offline fallback when no embedding backend is reachable. Tokens are
//! hashed into a fixed number of buckets and the bucket counts are
//! unit-normalized. Quality is far below a real model but similarity of
//! near-identical questions stays high, which is what the success cache
//! and the tests need.

use fleetql_core::errors::FleetqlResult;
use fleetql_core::traits::IEmbeddingProvider;
use fleetql_core::vector;

const DIMENSIONS: usize = 384;

/// Hash-bucket embedder. Stateless and always available.
pub struct HashedEmbedder;

impl HashedEmbedder {
    pub fn new() -> Self {
        Self
    }

    fn bucket(token: &str) -> usize {
        let hash = blake3::hash(token.as_bytes());
        let bytes = hash.as_bytes();
        let n = u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]);
        (n % DIMENSIONS as u64) as usize
    }
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl IEmbeddingProvider for HashedEmbedder {
    fn embed(&self, text: &str) -> FleetqlResult<Vec<f32>> {
        let mut v = vec![0.0f32; DIMENSIONS];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| !t.is_empty())
        {
            v[Self::bucket(token)] += 1.0;
            // Prefix bucket keeps plural/suffix variants close.
            if token.len() > 3 {
                v[Self::bucket(&token[..3])] += 0.5;
            }
        }
        vector::normalize(&mut v);
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn name(&self) -> &str {
        "hashed"
    }
}
