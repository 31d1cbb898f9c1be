use serde::{Deserialize, Serialize};

use super::QuerySource;

/// Counters for the controller's strategy sequence. Updated once per
/// answered question.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineStats {
    pub total_questions: u64,
    pub deterministic: u64,
    pub cache_hits: u64,
    pub few_shot: u64,
    pub full_context: u64,
    pub regenerated: u64,
    pub failures: u64,
    pub total_time_ms: u64,
}

impl PipelineStats {
    pub fn observe(&mut self, source: Option<&QuerySource>, success: bool, elapsed_ms: u64) {
        self.total_questions += 1;
        self.total_time_ms += elapsed_ms;
        if !success {
            self.failures += 1;
            return;
        }
        match source {
            Some(s) if s.is_deterministic() => self.deterministic += 1,
            Some(QuerySource::CacheHit) => self.cache_hits += 1,
            Some(QuerySource::FewShot(_)) => self.few_shot += 1,
            Some(QuerySource::FullContext(_)) => self.full_context += 1,
            Some(QuerySource::Regenerated(_)) => self.regenerated += 1,
            _ => {}
        }
    }
}

/// Per-model generation counters. Updated monotonically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_time_ms: u64,
}

impl ModelStats {
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.successes as f64 / self.attempts as f64 * 100.0
    }

    /// Average wall time per successful generation, in milliseconds.
    pub fn avg_time_ms(&self) -> f64 {
        if self.successes == 0 {
            return 0.0;
        }
        self.total_time_ms as f64 / self.successes as f64
    }
}
