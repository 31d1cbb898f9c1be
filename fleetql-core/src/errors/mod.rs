//! Error taxonomy for the pipeline, one enum per subsystem.
//!
//! Recoverable conditions (schema/semantic/logical problems in candidate
//! SQL) travel as `ValidationVerdict` values, not errors. These enums are
//! for genuine failures: unreachable collaborators, corrupt state, bad
//! config.

mod cache_error;
mod datastore_error;
mod generation_error;
mod retrieval_error;

pub use cache_error::CacheError;
pub use datastore_error::DatastoreError;
pub use generation_error::GenerationError;
pub use retrieval_error::RetrievalError;

/// Result alias used throughout the workspace.
pub type FleetqlResult<T> = Result<T, FleetqlError>;

/// Top-level error aggregating all subsystems.
#[derive(Debug, thiserror::Error)]
pub enum FleetqlError {
    #[error(transparent)]
    Datastore(#[from] DatastoreError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("config error: {reason}")]
    Config { reason: String },
}

impl FleetqlError {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}
