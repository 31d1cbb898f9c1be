//! # fleetql-core
//!
//! Foundation crate for the fleetql NL→SQL pipeline.
//! Defines all shared types, collaborator traits, errors, config, and
//! constants. Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod documents;
pub mod errors;
pub mod models;
pub mod traits;
pub mod vector;

// Re-export the most commonly used types at the crate root.
pub use config::FleetqlConfig;
pub use documents::{Document, DocumentKind};
pub use errors::{FleetqlError, FleetqlResult};
pub use models::{
    CacheEntry, ExecutionResult, GenerationAttempt, GenerationOutcome, ModelStats,
    PipelineResponse, PipelineStats, QaExample, ValidationVerdict,
};
