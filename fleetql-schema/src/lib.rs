//! # fleetql-schema
//!
//! Schema mirror and layered SQL validation. The validator is the single
//! source of truth for whether a candidate statement is legal, entirely
//! independent of the models that produced it.

pub mod classify;
pub mod mirror;
pub mod rules;
pub mod validator;

pub use classify::{classify, ClassifiedError, ErrorCategory};
pub use mirror::SchemaMirror;
pub use validator::SqlValidator;
