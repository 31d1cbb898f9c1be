//! Shared model types consumed across the workspace.

mod cache_entry;
mod execution;
mod generation;
mod qa_example;
mod response;
mod stats;
mod verdict;

pub use cache_entry::CacheEntry;
pub use execution::ExecutionResult;
pub use generation::{GenerationAttempt, GenerationOutcome};
pub use qa_example::QaExample;
pub use response::{PipelineResponse, QuerySource};
pub use stats::{ModelStats, PipelineStats};
pub use verdict::ValidationVerdict;
