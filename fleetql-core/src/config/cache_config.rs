use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants;

/// Success cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Minimum cosine similarity for an approximate cache hit.
    pub similarity_threshold: f64,
    /// Where the success cache is persisted.
    pub cache_path: PathBuf,
    /// Where learned question/SQL examples are persisted.
    pub examples_path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: constants::DEFAULT_CACHE_SIMILARITY_THRESHOLD,
            cache_path: PathBuf::from("success_cache.json"),
            examples_path: PathBuf::from("learned_examples.json"),
        }
    }
}
