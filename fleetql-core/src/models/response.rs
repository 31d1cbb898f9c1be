use std::fmt;

use serde::{Deserialize, Serialize};

use super::ExecutionResult;

/// Which strategy produced the final SQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuerySource {
    /// Direct vehicle-id timeline handler.
    DirectVehicleId,
    /// Deterministic metadata-catalog query.
    SchemaIntrospection,
    /// Deterministic "in period A but not B" template.
    TemporalExclusion,
    /// Deterministic "no X in last N days" template.
    NegativeExistence,
    /// One of the keyword-matched analytical templates.
    AnalyticalTemplate(String),
    /// Exact or approximate success-cache hit.
    CacheHit,
    /// Few-shot LLM generation.
    FewShot(String),
    /// Full-context LLM generation.
    FullContext(String),
    /// Forced regeneration after an execution or sanity failure.
    Regenerated(String),
}

impl QuerySource {
    /// Whether the SQL came out of an LLM (and thus needs the
    /// logical-plan cross-check before execution).
    pub fn is_llm(&self) -> bool {
        matches!(
            self,
            QuerySource::FewShot(_) | QuerySource::FullContext(_) | QuerySource::Regenerated(_)
        )
    }

    /// Whether the SQL came from a deterministic handler or template.
    pub fn is_deterministic(&self) -> bool {
        matches!(
            self,
            QuerySource::DirectVehicleId
                | QuerySource::SchemaIntrospection
                | QuerySource::TemporalExclusion
                | QuerySource::NegativeExistence
                | QuerySource::AnalyticalTemplate(_)
        )
    }
}

impl fmt::Display for QuerySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuerySource::DirectVehicleId => write!(f, "direct_vehicle_id_pattern"),
            QuerySource::SchemaIntrospection => write!(f, "deterministic_schema_pattern"),
            QuerySource::TemporalExclusion => write!(f, "deterministic_temporal_exclusion"),
            QuerySource::NegativeExistence => write!(f, "deterministic_negative_existence"),
            QuerySource::AnalyticalTemplate(name) => write!(f, "deterministic_template_{name}"),
            QuerySource::CacheHit => write!(f, "cache_hit"),
            QuerySource::FewShot(model) => write!(f, "few_shot_llm_{model}"),
            QuerySource::FullContext(model) => write!(f, "full_context_llm_{model}"),
            QuerySource::Regenerated(model) => write!(f, "regenerated_llm_{model}"),
        }
    }
}

/// The pipeline's answer to one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResponse {
    /// Natural-language answer, or an apology plus the last error.
    pub answer: String,
    pub sql: Option<String>,
    pub result: Option<ExecutionResult>,
    pub source: Option<QuerySource>,
    pub success: bool,
}

impl PipelineResponse {
    pub fn failure(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            sql: None,
            result: None,
            source: None,
            success: false,
        }
    }
}
