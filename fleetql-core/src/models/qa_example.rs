use serde::{Deserialize, Serialize};

/// A trusted question→SQL pair. Static seed data plus entries learned at
/// runtime; feeds both the retrieval corpus and the gold-standard index
/// used for logical-plan comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaExample {
    pub question: String,
    pub sql: String,
    pub query_type: String,
}

impl QaExample {
    pub fn new(
        question: impl Into<String>,
        sql: impl Into<String>,
        query_type: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            sql: sql.into(),
            query_type: query_type.into(),
        }
    }
}
