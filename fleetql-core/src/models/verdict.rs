use serde::{Deserialize, Serialize};

/// Outcome of validating one candidate SQL statement.
///
/// Produced by the validator, consumed by the orchestrator and pipeline
/// controller, never mutated. The message is either a confirmation or a
/// structured diagnostic with a targeted fix suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub valid: bool,
    pub message: String,
}

impl ValidationVerdict {
    pub fn valid(message: impl Into<String>) -> Self {
        Self {
            valid: true,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}
