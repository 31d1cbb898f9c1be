//! Learned-example store.
//!
//! Question/SQL pairs that survived validation and execution get
//! appended here and fed back into the retrieval corpus on the next
//! indexing pass.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use fleetql_core::errors::{CacheError, FleetqlResult};
use fleetql_core::models::QaExample;

pub struct LearnedExampleStore {
    path: PathBuf,
    examples: Vec<QaExample>,
}

impl LearnedExampleStore {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let examples = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<QaExample>>(&raw) {
                Ok(examples) => examples,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "learned examples corrupt, resetting");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self { path, examples }
    }

    pub fn examples(&self) -> &[QaExample] {
        &self.examples
    }

    /// Record a validated pair. Replaces any earlier answer for the same
    /// question.
    pub fn record(&mut self, example: QaExample) -> FleetqlResult<()> {
        self.examples.retain(|e| e.question != example.question);
        info!(question = %example.question, "learned example recorded");
        self.examples.push(example);
        self.persist()
    }

    fn persist(&self) -> FleetqlResult<()> {
        let raw = serde_json::to_string_pretty(&self.examples).map_err(|e| self.persist_err(e))?;
        fs::write(&self.path, raw).map_err(|e| self.persist_err(e))?;
        Ok(())
    }

    fn persist_err(&self, e: impl std::fmt::Display) -> CacheError {
        CacheError::ExamplesPersistFailed {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
