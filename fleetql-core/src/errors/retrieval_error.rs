/// Retrieval subsystem errors.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("embedding failed: {reason}")]
    EmbeddingFailed { reason: String },

    #[error("rerank failed: {reason}")]
    RerankFailed { reason: String },

    #[error("corpus indexing failed: {reason}")]
    IndexingFailed { reason: String },
}
