use serde::{Deserialize, Serialize};

use crate::constants;

/// Context retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Documents returned for few-shot prompts.
    pub few_shot_top_k: usize,
    /// Documents returned for full-context prompts.
    pub full_context_top_k: usize,
    /// Vector search fetches `top_k * oversample` candidates before
    /// reranking.
    pub oversample: usize,
    /// Embedding backend endpoint (Ollama-compatible).
    pub embedding_url: String,
    /// Embedding model name.
    pub embedding_model: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            few_shot_top_k: constants::DEFAULT_FEW_SHOT_TOP_K,
            full_context_top_k: constants::DEFAULT_FULL_CONTEXT_TOP_K,
            oversample: constants::RETRIEVAL_OVERSAMPLE,
            embedding_url: "http://localhost:11434".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
        }
    }
}
