use crate::errors::FleetqlResult;

/// Text-generation backend. No structured output contract; callers must
/// clean and parse whatever comes back.
pub trait ILlmProvider: Send + Sync {
    /// Generate a completion for `prompt` using the named model.
    fn generate(&self, model: &str, prompt: &str) -> FleetqlResult<String>;

    /// Human-readable backend name.
    fn name(&self) -> &str;
}
