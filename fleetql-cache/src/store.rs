//! Persistent success cache.
//!
//! JSON-file backed map from normalized question to a previously
//! validated query. Lookup is exact first, then approximate over the
//! stored embeddings. A corrupt file resets to empty rather than taking
//! the pipeline down.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use tracing::{debug, info, warn};

use fleetql_core::errors::{CacheError, FleetqlResult};
use fleetql_core::models::CacheEntry;
use fleetql_core::vector::cosine_similarity;
use fleetql_retrieval::{extract_parameters, normalize_question};

use crate::params::substitute_parameters;

/// A cache lookup result. `sql` already has this question's parameters
/// substituted in.
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub entry: CacheEntry,
    pub similarity: f64,
    pub sql: String,
}

pub struct SuccessCache {
    path: PathBuf,
    similarity_threshold: f64,
    entries: Vec<CacheEntry>,
}

impl SuccessCache {
    /// Load the cache from `path`, or start empty if the file is absent
    /// or unreadable.
    pub fn load(path: impl Into<PathBuf>, similarity_threshold: f64) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<CacheEntry>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cache file corrupt, resetting");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        info!(path = %path.display(), entries = entries.len(), "success cache loaded");
        Self {
            path,
            similarity_threshold,
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find a cached query for `question`. Exact match on the normalized
    /// text wins; otherwise the nearest stored embedding above the
    /// threshold. Parameters are substituted positionally on the way out.
    pub fn lookup(&self, question: &str, embedding: &[f32]) -> Option<CacheHit> {
        let normalized = normalize_question(question);

        if let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.normalized_question == normalized)
        {
            debug!(question = %normalized, "exact cache hit");
            return Some(self.hit(entry, &normalized, 1.0));
        }

        let best = self
            .entries
            .iter()
            .filter(|e| !e.embedding.is_empty())
            .map(|e| (e, cosine_similarity(embedding, &e.embedding)))
            .max_by(|a, b| a.1.total_cmp(&b.1))?;
        if best.1 < self.similarity_threshold {
            return None;
        }
        debug!(
            question = %normalized,
            matched = %best.0.normalized_question,
            similarity = best.1,
            "approximate cache hit"
        );
        Some(self.hit(best.0, &normalized, best.1))
    }

    fn hit(&self, entry: &CacheEntry, normalized: &str, similarity: f64) -> CacheHit {
        let new_params = extract_parameters(normalized);
        let sql = substitute_parameters(&entry.sql, &entry.params, &new_params);
        CacheHit {
            entry: entry.clone(),
            similarity,
            sql,
        }
    }

    /// Insert or replace the entry for this question and persist.
    pub fn store(
        &mut self,
        question: &str,
        sql: &str,
        source: &str,
        embedding: Vec<f32>,
    ) -> FleetqlResult<()> {
        let normalized = normalize_question(question);
        let entry = CacheEntry {
            params: extract_parameters(&normalized),
            normalized_question: normalized.clone(),
            sql: sql.to_string(),
            source: source.to_string(),
            embedding,
            stored_at: Utc::now(),
        };
        self.entries.retain(|e| e.normalized_question != normalized);
        self.entries.push(entry);
        self.persist()
    }

    /// Drop the entry for this question, if present. Used when a cached
    /// query no longer validates against the live schema.
    pub fn invalidate(&mut self, question: &str) -> FleetqlResult<bool> {
        let normalized = normalize_question(question);
        let before = self.entries.len();
        self.entries.retain(|e| e.normalized_question != normalized);
        let removed = self.entries.len() < before;
        if removed {
            info!(question = %normalized, "cache entry invalidated");
            self.persist()?;
        }
        Ok(removed)
    }

    fn persist(&self) -> FleetqlResult<()> {
        let raw = serde_json::to_string_pretty(&self.entries).map_err(|e| self.persist_err(e))?;
        fs::write(&self.path, raw).map_err(|e| self.persist_err(e))?;
        Ok(())
    }

    fn persist_err(&self, e: impl std::fmt::Display) -> CacheError {
        CacheError::PersistFailed {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache_in(dir: &TempDir) -> SuccessCache {
        SuccessCache::load(dir.path().join("cache.json"), 0.96)
    }

    #[test]
    fn exact_hit_survives_reload() {
        let dir = TempDir::new().unwrap();
        let mut cache = cache_in(&dir);
        cache
            .store("Show blacklisted vehicles?", "SELECT 1", "few_shot_llm", vec![])
            .unwrap();

        let reloaded = cache_in(&dir);
        assert_eq!(reloaded.len(), 1);
        let hit = reloaded.lookup("show blacklisted vehicles", &[]).unwrap();
        assert_eq!(hit.sql, "SELECT 1");
        assert_eq!(hit.similarity, 1.0);
    }

    #[test]
    fn storing_same_question_twice_replaces() {
        let dir = TempDir::new().unwrap();
        let mut cache = cache_in(&dir);
        cache.store("q", "SELECT 1", "few_shot_llm", vec![]).unwrap();
        cache.store("q", "SELECT 2", "few_shot_llm", vec![]).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup("q", &[]).unwrap().sql, "SELECT 2");
    }

    #[test]
    fn approximate_hit_requires_threshold() {
        let dir = TempDir::new().unwrap();
        let mut cache = cache_in(&dir);
        cache
            .store("alerts per vehicle", "SELECT 1", "few_shot_llm", vec![1.0, 0.0])
            .unwrap();

        assert!(cache.lookup("alerts for each vehicle", &[1.0, 0.0]).is_some());
        assert!(cache.lookup("something unrelated", &[0.0, 1.0]).is_none());
    }

    #[test]
    fn hit_substitutes_new_parameters() {
        let dir = TempDir::new().unwrap();
        let mut cache = cache_in(&dir);
        cache
            .store(
                "alerts for MH12AB1234 in the last 7 days",
                "SELECT * FROM alerts WHERE vehicle_number = 'MH12AB1234' \
                 AND created_at >= CURRENT_DATE - INTERVAL '7 days'",
                "few_shot_llm",
                vec![1.0],
            )
            .unwrap();

        let hit = cache
            .lookup("alerts for KA05CD9876 in the last 30 days", &[1.0])
            .unwrap();
        assert!(hit.sql.contains("KA05CD9876"));
        assert!(hit.sql.contains("'30 days'"));
    }

    #[test]
    fn invalidate_removes_entry() {
        let dir = TempDir::new().unwrap();
        let mut cache = cache_in(&dir);
        cache.store("q", "SELECT 1", "few_shot_llm", vec![]).unwrap();
        assert!(cache.invalidate("q").unwrap());
        assert!(cache.lookup("q", &[]).is_none());
        assert!(!cache.invalidate("q").unwrap());
    }

    #[test]
    fn corrupt_file_resets_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "not json").unwrap();
        let cache = SuccessCache::load(&path, 0.96);
        assert!(cache.is_empty());
    }
}
