/// One attempt within a single `generate` invocation. Ephemeral; lives
/// only long enough to thread error history into the next prompt.
#[derive(Debug, Clone)]
pub struct GenerationAttempt {
    pub model: String,
    pub attempt_number: usize,
    pub prompt: String,
    pub resulting_sql: String,
    pub validation_error: Option<String>,
}

/// Final outcome of a `generate` invocation.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub sql: String,
    pub success: bool,
    pub model_used: String,
}

impl GenerationOutcome {
    pub fn success(sql: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            success: true,
            model_used: model.into(),
        }
    }

    pub fn failure(sql: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            success: false,
            model_used: model.into(),
        }
    }
}
