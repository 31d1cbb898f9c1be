//! Primary/fallback embedding chain.
//!
//! The retrieval path must never fail outright because the embedding
//! backend is down. The chain probes the primary once at construction
//! and again on each error, falling back to the hashed embedder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

use fleetql_core::errors::FleetqlResult;
use fleetql_core::traits::IEmbeddingProvider;

/// Embedding provider that degrades to a fallback when the primary is
/// unreachable. Mixing dimensions between providers is fine for the
/// caller as long as indexing and querying go through the same chain.
pub struct DegradingEmbedder {
    primary: Arc<dyn IEmbeddingProvider>,
    fallback: Arc<dyn IEmbeddingProvider>,
    degraded: AtomicBool,
}

impl DegradingEmbedder {
    pub fn new(
        primary: Arc<dyn IEmbeddingProvider>,
        fallback: Arc<dyn IEmbeddingProvider>,
    ) -> Self {
        let degraded = !primary.is_available();
        if degraded {
            warn!(
                primary = primary.name(),
                fallback = fallback.name(),
                "embedding backend unavailable, starting degraded"
            );
        }
        Self {
            primary,
            fallback,
            degraded: AtomicBool::new(degraded),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }
}

impl IEmbeddingProvider for DegradingEmbedder {
    fn embed(&self, text: &str) -> FleetqlResult<Vec<f32>> {
        if !self.is_degraded() {
            match self.primary.embed(text) {
                Ok(v) => return Ok(v),
                Err(e) => {
                    warn!(error = %e, "embedding backend failed, degrading to fallback");
                    self.degraded.store(true, Ordering::Relaxed);
                }
            }
        }
        self.fallback.embed(text)
    }

    fn dimensions(&self) -> usize {
        if self.is_degraded() {
            self.fallback.dimensions()
        } else {
            self.primary.dimensions()
        }
    }

    fn name(&self) -> &str {
        if self.is_degraded() {
            self.fallback.name()
        } else {
            self.primary.name()
        }
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetql_core::errors::RetrievalError;

    struct DeadProvider;

    impl IEmbeddingProvider for DeadProvider {
        fn embed(&self, _text: &str) -> FleetqlResult<Vec<f32>> {
            Err(RetrievalError::EmbeddingFailed {
                reason: "down".to_string(),
            }
            .into())
        }

        fn dimensions(&self) -> usize {
            768
        }

        fn name(&self) -> &str {
            "dead"
        }

        fn is_available(&self) -> bool {
            false
        }
    }

    #[test]
    fn starts_degraded_when_primary_unavailable() {
        let chain = DegradingEmbedder::new(
            Arc::new(DeadProvider),
            Arc::new(crate::hashed::HashedEmbedder::new()),
        );
        assert!(chain.is_degraded());
        assert_eq!(chain.name(), "hashed");
        assert!(chain.embed("any question").is_ok());
    }

    struct FlakyProvider;

    impl IEmbeddingProvider for FlakyProvider {
        fn embed(&self, _text: &str) -> FleetqlResult<Vec<f32>> {
            Err(RetrievalError::EmbeddingFailed {
                reason: "mid-flight failure".to_string(),
            }
            .into())
        }

        fn dimensions(&self) -> usize {
            768
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    #[test]
    fn degrades_after_runtime_failure() {
        let chain = DegradingEmbedder::new(
            Arc::new(FlakyProvider),
            Arc::new(crate::hashed::HashedEmbedder::new()),
        );
        assert!(!chain.is_degraded());
        assert!(chain.embed("any question").is_ok());
        assert!(chain.is_degraded());
    }
}
