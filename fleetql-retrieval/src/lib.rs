//! Question normalization, context retrieval, and table relevance.
//!
//! Turns a natural-language fleet question into the material the SQL
//! generator prompts with: reranked corpus documents, intent templates,
//! and the set of tables the question is actually about.

pub mod corpus;
pub mod engine;
pub mod intent;
pub mod normalize;
pub mod tables;

pub use corpus::{build_documents, index_corpus, seed_examples};
pub use engine::{ContextRetriever, ScoredDocument};
pub use normalize::{
    estimate_complexity, extract_parameters, extract_vehicle_id, has_negative_intent,
    normalize_question,
};
pub use tables::{detect_concepts, determine_relevant_tables, Concept};
