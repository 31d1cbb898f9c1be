//! Content-keyed embedding cache.

use std::sync::Arc;

use moka::sync::Cache;

use fleetql_core::errors::FleetqlResult;
use fleetql_core::traits::IEmbeddingProvider;

/// Wraps any embedding provider with an in-memory cache keyed by the
/// text's content hash. Re-embedding the same question is free.
pub struct CachedEmbedder {
    inner: Arc<dyn IEmbeddingProvider>,
    cache: Cache<String, Vec<f32>>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn IEmbeddingProvider>, capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::new(capacity),
        }
    }
}

impl IEmbeddingProvider for CachedEmbedder {
    fn embed(&self, text: &str) -> FleetqlResult<Vec<f32>> {
        let key = blake3::hash(text.as_bytes()).to_hex().to_string();
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }
        let embedding = self.inner.embed(text)?;
        self.cache.insert(key, embedding.clone());
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}
