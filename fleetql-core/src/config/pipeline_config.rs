use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants;

/// Pipeline controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Result sets larger than this are treated as implausible.
    pub max_sane_rows: usize,
    /// Similarity above which a gold-standard plan mismatch forces
    /// regeneration.
    pub gold_standard_threshold: f64,
    /// Questions scoring above this complexity skip the few-shot
    /// prompt and go straight to full context, when the caller also
    /// asked for the high-capability model.
    pub complexity_cutoff: u32,
    /// Model that justifies the full-context-first route for complex
    /// questions.
    pub high_capability_model: String,
    /// Where audit records are appended. Empty disables auditing.
    pub audit_log_path: Option<PathBuf>,
    /// Overall deadline per question (seconds). Zero disables it.
    pub deadline_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_sane_rows: constants::DEFAULT_MAX_SANE_ROWS,
            gold_standard_threshold: constants::DEFAULT_GOLD_STANDARD_THRESHOLD,
            complexity_cutoff: constants::DEFAULT_COMPLEXITY_CUTOFF,
            high_capability_model: "deepseek-coder-v2".to_string(),
            audit_log_path: None,
            deadline_secs: 0,
        }
    }
}
