//! Lexical pairwise reranker.
//!
//! Second-pass scorer for retrieval candidates. Combines token overlap
//! with a phrase bonus; cheap enough to run on every candidate set and
//! deterministic, unlike a cross-encoder behind a network call.

use std::collections::BTreeSet;

use fleetql_core::errors::FleetqlResult;
use fleetql_core::traits::IReranker;

/// Token-overlap reranker. Stateless.
pub struct LexicalReranker;

impl LexicalReranker {
    pub fn new() -> Self {
        Self
    }

    fn tokens(text: &str) -> BTreeSet<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| t.len() > 1)
            .map(|t| t.to_string())
            .collect()
    }
}

impl Default for LexicalReranker {
    fn default() -> Self {
        Self::new()
    }
}

impl IReranker for LexicalReranker {
    fn score(&self, query: &str, candidate: &str) -> FleetqlResult<f64> {
        let query_tokens = Self::tokens(query);
        let candidate_tokens = Self::tokens(candidate);
        if query_tokens.is_empty() || candidate_tokens.is_empty() {
            return Ok(0.0);
        }

        let overlap = query_tokens.intersection(&candidate_tokens).count() as f64;
        let jaccard = overlap / (query_tokens.len() + candidate_tokens.len() - overlap as usize) as f64;

        // Containing the whole question verbatim is a strong signal for
        // worked-example documents.
        let phrase_bonus = if candidate.to_lowercase().contains(&query.to_lowercase()) {
            0.5
        } else {
            0.0
        };

        Ok(jaccard + phrase_bonus)
    }

    fn name(&self) -> &str {
        "lexical"
    }
}
