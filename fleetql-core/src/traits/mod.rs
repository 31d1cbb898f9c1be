//! Collaborator traits: the seams between the pipeline and its external
//! black boxes (embedding model, reranker, LLM backend, datastore).

mod datastore;
mod embedding;
mod llm;
mod reranker;

pub use datastore::{IDatastore, PlanOutcome, QueryOutcome, SchemaMap};
pub use embedding::IEmbeddingProvider;
pub use llm::ILlmProvider;
pub use reranker::IReranker;
