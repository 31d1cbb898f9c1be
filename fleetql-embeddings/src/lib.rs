//! # fleetql-embeddings
//!
//! Embedding providers for the retrieval subsystem: an Ollama-backed
//! provider, a deterministic hashed fallback, a degradation chain that
//! picks whichever is alive, a content-keyed cache wrapper, and the
//! lexical reranker.

pub mod cache;
pub mod chain;
pub mod hashed;
pub mod ollama;
pub mod rerank;

pub use cache::CachedEmbedder;
pub use chain::DegradingEmbedder;
pub use hashed::HashedEmbedder;
pub use ollama::{OllamaEmbedder, OllamaLlm};
pub use rerank::LexicalReranker;
