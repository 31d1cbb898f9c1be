use serde::{Deserialize, Serialize};

use crate::constants;

/// SQL generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Models tried in order until one produces valid SQL.
    pub models: Vec<String>,
    /// Attempts per model before moving to the next one.
    pub max_retries: usize,
    /// LLM backend endpoint (Ollama-compatible).
    pub llm_url: String,
    /// Per-request timeout (seconds).
    pub request_timeout_secs: u64,
    /// Sampling temperature. Kept low so output stays parseable.
    pub temperature: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            models: vec![
                "mannix/defog-llama3-sqlcoder-8b:latest".to_string(),
                "llama3.1:8b".to_string(),
                "deepseek-coder-v2".to_string(),
            ],
            max_retries: constants::DEFAULT_MAX_RETRIES,
            llm_url: "http://localhost:11434".to_string(),
            request_timeout_secs: 120,
            temperature: 0.1,
        }
    }
}
