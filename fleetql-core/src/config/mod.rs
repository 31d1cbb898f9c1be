//! Runtime configuration, loaded from `fleetql.toml` with compiled
//! defaults for every field.

mod cache_config;
mod generation_config;
mod pipeline_config;
mod retrieval_config;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use cache_config::CacheConfig;
pub use generation_config::GenerationConfig;
pub use pipeline_config::PipelineConfig;
pub use retrieval_config::RetrievalConfig;

use crate::errors::{FleetqlError, FleetqlResult};

/// Top-level configuration aggregating all sub-configs.
///
/// Every field has a compiled default, so a missing or partial config
/// file is never an error. Only unreadable or malformed TOML is.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FleetqlConfig {
    pub retrieval: RetrievalConfig,
    pub cache: CacheConfig,
    pub generation: GenerationConfig,
    pub pipeline: PipelineConfig,
}

impl FleetqlConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// any field the file omits.
    pub fn load(path: &Path) -> FleetqlResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            FleetqlError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&raw).map_err(|e| {
            FleetqlError::config(format!("invalid TOML in {}: {e}", path.display()))
        })
    }

    /// Load from `path` if it exists, otherwise return defaults.
    pub fn load_or_default(path: &Path) -> FleetqlResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
