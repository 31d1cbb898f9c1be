use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One accepted query in the success cache.
///
/// Keyed externally by `normalized_question`. Replacement is whole-entry;
/// entries are never partially updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub normalized_question: String,
    pub sql: String,
    /// Which pipeline strategy produced the query.
    pub source: String,
    /// Literal parameters (vehicle ids, numbers) extracted from the
    /// question, in order of appearance.
    #[serde(default)]
    pub params: Vec<String>,
    /// Unit-normalized question embedding for approximate lookup.
    #[serde(default)]
    pub embedding: Vec<f32>,
    pub stored_at: DateTime<Utc>,
}
