//! End-to-end question answering over the fleet database.
//!
//! `Pipeline` wires the deterministic handlers, success cache, context
//! retrieval, generation loop, and post-execution checks into one
//! `ask()` call.

pub mod answer;
pub mod audit;
pub mod controller;
pub mod handlers;
pub mod logical;
pub mod sanity;

pub use controller::Pipeline;
pub use logical::{cross_check, tables_from_sql};
pub use sanity::sanity_issues;
