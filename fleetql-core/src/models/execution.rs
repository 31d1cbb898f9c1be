use serde::{Deserialize, Serialize};

/// Result rows from executing a query against the datastore.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub columns: Vec<String>,
    /// One JSON object per row, keyed by column name.
    pub rows: Vec<serde_json::Value>,
    pub count: usize,
}

impl ExecutionResult {
    pub fn new(columns: Vec<String>, rows: Vec<serde_json::Value>) -> Self {
        let count = rows.len();
        Self {
            columns,
            rows,
            count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
