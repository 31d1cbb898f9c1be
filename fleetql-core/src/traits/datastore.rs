use std::collections::BTreeMap;

use crate::documents::Document;
use crate::errors::FleetqlResult;
use crate::models::ExecutionResult;

/// Live table layout: table name to ordered column names.
pub type SchemaMap = BTreeMap<String, Vec<String>>;

/// Result of asking the database to plan a statement without running it.
///
/// A rejected plan is a property of the SQL, not an infrastructure
/// failure, so it is a value rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    Accepted,
    Rejected(String),
}

impl PlanOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, PlanOutcome::Accepted)
    }
}

/// Result of executing a statement. Execution errors caused by the
/// statement itself come back as `Failed` so callers can feed them into
/// the retry loop; only connectivity problems surface as `Err`.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Rows(ExecutionResult),
    Failed { error: String },
}

impl QueryOutcome {
    pub fn is_rows(&self) -> bool {
        matches!(self, QueryOutcome::Rows(_))
    }
}

/// Storage backend combining relational execution with vector search
/// over the context corpus.
pub trait IDatastore: Send + Sync {
    /// Read the current table and column layout from the catalog.
    fn introspect_schema(&self) -> FleetqlResult<SchemaMap>;

    /// Ask the planner whether the statement is executable.
    fn plan(&self, sql: &str) -> FleetqlResult<PlanOutcome>;

    /// Execute a read-only statement and collect its rows.
    fn execute(&self, sql: &str) -> FleetqlResult<QueryOutcome>;

    /// Store a context document, replacing any existing document with the
    /// same content-hash id.
    fn upsert_document(&self, document: &Document) -> FleetqlResult<()>;

    /// Return up to `limit` documents closest to `embedding` by cosine
    /// similarity, best first, paired with their scores.
    fn nearest_documents(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> FleetqlResult<Vec<(Document, f64)>>;

    /// Number of documents currently indexed.
    fn document_count(&self) -> FleetqlResult<usize>;
}
