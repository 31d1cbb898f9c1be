//! Retrieval corpus documents.
//!
//! One loose shape in the original corpus (schema / example / rules /
//! template guidance sharing a dict) becomes a tagged union here, each
//! case carrying only the fields that type needs.

use serde::{Deserialize, Serialize};

/// What a corpus document describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentKind {
    /// A schema snippet for one table.
    Schema { table: String },
    /// A worked question→SQL example.
    Example { question: String, sql: String },
    /// Free-form business rules text.
    Rules,
    /// A synthetic intent-template document carrying a recommended SQL
    /// skeleton and join hint. Always ranked ahead of retrieved documents.
    TemplateGuidance { intent: String, sql_skeleton: String },
}

impl DocumentKind {
    /// The example SQL carried by this document, if any.
    pub fn example_sql(&self) -> Option<&str> {
        match self {
            DocumentKind::Example { sql, .. } => Some(sql),
            DocumentKind::TemplateGuidance { sql_skeleton, .. } => Some(sql_skeleton),
            _ => None,
        }
    }
}

/// An immutable corpus document. The id is a blake3 content hash so that
/// re-indexing the same corpus is idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub kind: DocumentKind,
    /// Unit-normalized embedding. Empty until the document is indexed.
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl Document {
    /// Build a document with a content-hash id derived from text + kind.
    pub fn new(text: impl Into<String>, kind: DocumentKind) -> Self {
        let text = text.into();
        let id = content_hash(&text, &kind);
        Self {
            id,
            text,
            kind,
            embedding: Vec::new(),
        }
    }

    /// The text this document is embedded and searched by. Examples are
    /// keyed by their question so question-to-question similarity stays
    /// high; everything else is keyed by its full text.
    pub fn retrieval_text(&self) -> &str {
        match &self.kind {
            DocumentKind::Example { question, .. } => question,
            _ => &self.text,
        }
    }
}

/// Content hash for idempotent insertion.
fn content_hash(text: &str, kind: &DocumentKind) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(text.as_bytes());
    // Kind discriminates documents with identical text.
    if let Ok(tag) = serde_json::to_vec(kind) {
        hasher.update(&tag);
    }
    hasher.finalize().to_hex().to_string()
}
