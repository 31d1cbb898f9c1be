//! Ollama-backed embedding and text-generation clients.
//!
//! Both talk to the same local HTTP endpoint with blocking requests.
//! Statement-level timeouts live on the client; there is no retry here,
//! the orchestrator owns retries.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use fleetql_core::errors::{FleetqlResult, GenerationError, RetrievalError};
use fleetql_core::traits::{IEmbeddingProvider, ILlmProvider};
use fleetql_core::vector;

const EMBEDDING_DIMENSIONS: usize = 768;

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Embedding provider backed by an Ollama `/api/embeddings` endpoint.
pub struct OllamaEmbedder {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

impl IEmbeddingProvider for OllamaEmbedder {
    fn embed(&self, text: &str) -> FleetqlResult<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": text,
        });
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&body)
            .send()
            .map_err(|e| RetrievalError::EmbeddingFailed {
                reason: format!("embedding request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RetrievalError::EmbeddingFailed {
                reason: format!("embedding backend returned {status}: {body}"),
            }
            .into());
        }

        let parsed: EmbeddingResponse =
            response.json().map_err(|e| RetrievalError::EmbeddingFailed {
                reason: format!("malformed embedding response: {e}"),
            })?;

        let mut embedding = parsed.embedding;
        vector::normalize(&mut embedding);
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIMENSIONS
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn is_available(&self) -> bool {
        let alive = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .map(|r| r.status().is_success())
            .unwrap_or(false);
        debug!(alive, "ollama embedding availability probe");
        alive
    }
}

/// Text-generation provider backed by an Ollama `/api/generate` endpoint.
pub struct OllamaLlm {
    client: reqwest::blocking::Client,
    base_url: String,
    temperature: f64,
}

impl OllamaLlm {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64, temperature: f64) -> Self {
        Self {
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            temperature,
        }
    }
}

impl ILlmProvider for OllamaLlm {
    fn generate(&self, model: &str, prompt: &str) -> FleetqlResult<String> {
        let body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": self.temperature },
        });
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .map_err(|e| GenerationError::BackendUnreachable {
                reason: format!("generation request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::BackendError {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed: GenerateResponse =
            response.json().map_err(|e| GenerationError::BackendUnreachable {
                reason: format!("malformed generation response: {e}"),
            })?;

        if parsed.response.trim().is_empty() {
            return Err(GenerationError::EmptyResponse {
                model: model.to_string(),
            }
            .into());
        }
        Ok(parsed.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
