//! Append-only audit log.
//!
//! One JSON line per answered question. The question itself is stored
//! as a hash; the log records what ran, not what was asked.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::PathBuf;

use chrono::Utc;
use tracing::warn;

pub struct AuditLog {
    path: Option<PathBuf>,
}

impl AuditLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Append one record. Audit failures are logged and swallowed; the
    /// answer still goes out.
    pub fn record(
        &self,
        question: &str,
        sql: Option<&str>,
        source: &str,
        success: bool,
        rows: Option<usize>,
        duration_ms: u128,
    ) {
        let Some(path) = &self.path else {
            return;
        };
        let mut record = serde_json::json!({
            "at": Utc::now().to_rfc3339(),
            "question_hash": blake3::hash(question.as_bytes()).to_hex().to_string(),
            "sql": sql,
            "source": source,
            "success": success,
            "rows": rows,
            "duration_ms": duration_ms as u64,
        });
        // The hash covers everything else in the record.
        let payload = record.to_string();
        record["hash"] = blake3::hash(payload.as_bytes()).to_hex().to_string().into();
        let appended = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| writeln!(file, "{record}"));
        if let Err(e) = appended {
            warn!(path = %path.display(), error = %e, "audit append failed");
        }
    }
}
