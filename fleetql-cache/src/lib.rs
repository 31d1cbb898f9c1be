//! Success cache and learned-example persistence.

pub mod learned;
pub mod params;
pub mod store;

pub use learned::LearnedExampleStore;
pub use params::substitute_parameters;
pub use store::{CacheHit, SuccessCache};
