/// LLM generation errors: transport and protocol failures, not bad SQL.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("model backend unreachable: {reason}")]
    BackendUnreachable { reason: String },

    #[error("model {model} returned an empty response")]
    EmptyResponse { model: String },

    #[error("model backend error ({status}): {body}")]
    BackendError { status: u16, body: String },
}
