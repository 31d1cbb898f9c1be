//! Embedded SQLite datastore.
//!
//! One connection behind a mutex serves three roles: the operational
//! fleet tables, the vector document store, and a Postgres-shaped
//! `information_schema.columns` view kept in an attached in-memory
//! database so catalog queries run unmodified.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use tracing::{debug, info};

use fleetql_core::documents::Document;
use fleetql_core::errors::{DatastoreError, FleetqlResult};
use fleetql_core::models::ExecutionResult;
use fleetql_core::traits::{IDatastore, PlanOutcome, QueryOutcome, SchemaMap};
use fleetql_core::vector::cosine_similarity;

use crate::schema::{FLEET_FIXTURES, FLEET_SCHEMA};

pub struct SqliteDatastore {
    conn: Mutex<Connection>,
}

impl SqliteDatastore {
    pub fn open(path: impl AsRef<Path>) -> FleetqlResult<Self> {
        let conn = Connection::open(path.as_ref()).map_err(unreachable_err)?;
        Self::initialize(conn)
    }

    pub fn in_memory() -> FleetqlResult<Self> {
        let conn = Connection::open_in_memory().map_err(unreachable_err)?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> FleetqlResult<Self> {
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(unreachable_err)?;
        conn.execute_batch(
            "ATTACH DATABASE ':memory:' AS information_schema;
             CREATE TABLE IF NOT EXISTS information_schema.columns (
                 table_name TEXT NOT NULL,
                 column_name TEXT NOT NULL,
                 data_type TEXT,
                 ordinal_position INTEGER
             );
             CREATE TABLE IF NOT EXISTS documents (
                 id TEXT PRIMARY KEY,
                 text TEXT NOT NULL,
                 kind TEXT NOT NULL,
                 embedding BLOB NOT NULL
             );",
        )
        .map_err(unreachable_err)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.apply_fleet_schema()?;
        Ok(store)
    }

    fn apply_fleet_schema(&self) -> FleetqlResult<()> {
        let conn = self.lock();
        conn.execute_batch(FLEET_SCHEMA).map_err(|e| {
            DatastoreError::IntrospectionFailed {
                reason: format!("applying fleet schema failed: {e}"),
            }
        })?;
        drop(conn);
        self.refresh_catalog()
    }

    /// Load the demo fixture rows. Idempotent for keyed tables.
    pub fn seed_fixtures(&self) -> FleetqlResult<()> {
        let conn = self.lock();
        conn.execute_batch(FLEET_FIXTURES)
            .map_err(|e| DatastoreError::SqlError {
                message: e.to_string(),
            })?;
        info!("fixture rows loaded");
        Ok(())
    }

    /// Rebuild `information_schema.columns` from the live tables.
    fn refresh_catalog(&self) -> FleetqlResult<()> {
        let conn = self.lock();
        let result: rusqlite::Result<()> = (|| {
            conn.execute("DELETE FROM information_schema.columns", [])?;
            let tables: Vec<String> = conn
                .prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' \
                     AND name NOT IN ('documents') AND name NOT LIKE 'sqlite_%'",
                )?
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<_>>()?;
            for table in tables {
                let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
                let columns: Vec<(i64, String, String)> = stmt
                    .query_map([], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                    })?
                    .collect::<rusqlite::Result<_>>()?;
                for (cid, name, data_type) in columns {
                    conn.execute(
                        "INSERT INTO information_schema.columns \
                         (table_name, column_name, data_type, ordinal_position) \
                         VALUES (?1, ?2, ?3, ?4)",
                        rusqlite::params![table, name, data_type, cid + 1],
                    )?;
                }
            }
            Ok(())
        })();
        result.map_err(|e| {
            DatastoreError::IntrospectionFailed {
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl IDatastore for SqliteDatastore {
    fn introspect_schema(&self) -> FleetqlResult<SchemaMap> {
        let conn = self.lock();
        let result: rusqlite::Result<SchemaMap> = (|| {
            let mut map = SchemaMap::new();
            let mut stmt = conn.prepare(
                "SELECT table_name, column_name FROM information_schema.columns \
                 ORDER BY table_name, ordinal_position",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (table, column) = row?;
                map.entry(table).or_default().push(column);
            }
            Ok(map)
        })();
        result.map_err(|e| {
            DatastoreError::IntrospectionFailed {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Dry-run the statement through the planner. A planner rejection is
    /// a verdict on the SQL, not a datastore failure.
    fn plan(&self, sql: &str) -> FleetqlResult<PlanOutcome> {
        let conn = self.lock();
        // The prepared statement borrows the connection; settle the
        // outcome before the guard drops.
        let outcome = match conn.prepare(&format!("EXPLAIN {sql}")) {
            Ok(_) => PlanOutcome::Accepted,
            Err(e) => PlanOutcome::Rejected(e.to_string()),
        };
        Ok(outcome)
    }

    fn execute(&self, sql: &str) -> FleetqlResult<QueryOutcome> {
        let conn = self.lock();
        let mut stmt = match conn.prepare(sql) {
            Ok(stmt) => stmt,
            Err(e) => {
                debug!(error = %e, "statement rejected at execute");
                return Ok(QueryOutcome::Failed {
                    error: e.to_string(),
                });
            }
        };
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let mut rows_out: Vec<serde_json::Value> = Vec::new();
        let mut rows = match stmt.query([]) {
            Ok(rows) => rows,
            Err(e) => {
                return Ok(QueryOutcome::Failed {
                    error: e.to_string(),
                })
            }
        };
        loop {
            match rows.next() {
                Ok(Some(row)) => {
                    let mut object = serde_json::Map::with_capacity(columns.len());
                    for (idx, column) in columns.iter().enumerate() {
                        let value = match row.get_ref(idx) {
                            Ok(value) => json_value(value),
                            Err(e) => {
                                return Ok(QueryOutcome::Failed {
                                    error: e.to_string(),
                                })
                            }
                        };
                        object.insert(column.clone(), value);
                    }
                    rows_out.push(serde_json::Value::Object(object));
                }
                Ok(None) => break,
                Err(e) => {
                    return Ok(QueryOutcome::Failed {
                        error: e.to_string(),
                    })
                }
            }
        }
        Ok(QueryOutcome::Rows(ExecutionResult::new(columns, rows_out)))
    }

    fn upsert_document(&self, doc: &Document) -> FleetqlResult<()> {
        let conn = self.lock();
        let kind = serde_json::to_string(&doc.kind).map_err(|e| {
            DatastoreError::CorruptDocument {
                details: e.to_string(),
            }
        })?;
        conn.execute(
            "INSERT INTO documents (id, text, kind, embedding) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(id) DO UPDATE SET text = ?2, kind = ?3, embedding = ?4",
            rusqlite::params![doc.id, doc.text, kind, encode_embedding(&doc.embedding)],
        )
        .map_err(|e| DatastoreError::SqlError {
            message: e.to_string(),
        })?;
        Ok(())
    }

    fn nearest_documents(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> FleetqlResult<Vec<(Document, f64)>> {
        let conn = self.lock();
        let result: rusqlite::Result<Vec<(String, String, String, Vec<u8>)>> = (|| {
            let mut stmt = conn.prepare("SELECT id, text, kind, embedding FROM documents")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?;
            rows.collect()
        })();
        let raw = result.map_err(|e| DatastoreError::SqlError {
            message: e.to_string(),
        })?;

        let mut scored: Vec<(Document, f64)> = Vec::with_capacity(raw.len());
        for (id, text, kind_json, blob) in raw {
            let kind = serde_json::from_str(&kind_json).map_err(|e| {
                DatastoreError::CorruptDocument {
                    details: format!("document {id}: {e}"),
                }
            })?;
            let doc_embedding = decode_embedding(&blob);
            let score = cosine_similarity(embedding, &doc_embedding);
            scored.push((
                Document {
                    id,
                    text,
                    kind,
                    embedding: doc_embedding,
                },
                score,
            ));
        }
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        Ok(scored)
    }

    fn document_count(&self) -> FleetqlResult<usize> {
        let conn = self.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(|e| DatastoreError::SqlError {
                message: e.to_string(),
            })?;
        Ok(count as usize)
    }
}

fn unreachable_err(e: rusqlite::Error) -> DatastoreError {
    DatastoreError::Unreachable {
        reason: e.to_string(),
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

fn decode_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn json_value(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Value::from(f),
        ValueRef::Text(t) => serde_json::Value::from(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => serde_json::Value::Null,
    }
}
