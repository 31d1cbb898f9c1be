use crate::errors::FleetqlResult;

/// Embedding generation provider.
///
/// Implementations must return unit-normalized vectors; every consumer
/// compares embeddings with a plain dot product.
pub trait IEmbeddingProvider: Send + Sync {
    /// Embed a single text, returning a unit-length vector of floats.
    fn embed(&self, text: &str) -> FleetqlResult<Vec<f32>>;

    /// Embed a batch of texts.
    fn embed_batch(&self, texts: &[String]) -> FleetqlResult<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// The dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Whether this provider is currently available.
    fn is_available(&self) -> bool {
        true
    }
}
