//! In-process mirror of the live table layout.
//!
//! Built once from catalog introspection at startup. Read-only after
//! construction, so it can be shared freely across the pipeline.

use std::collections::BTreeSet;

use tracing::{info, warn};

use fleetql_core::errors::FleetqlResult;
use fleetql_core::traits::{IDatastore, SchemaMap};

use crate::rules;

/// Snapshot of the tables and columns the validator treats as real.
#[derive(Debug, Clone)]
pub struct SchemaMirror {
    tables: SchemaMap,
    all_columns: BTreeSet<String>,
}

impl SchemaMirror {
    /// Introspect the datastore and build the mirror. Tables outside the
    /// known fleet set are ignored.
    pub fn from_datastore(datastore: &dyn IDatastore) -> FleetqlResult<Self> {
        let raw = datastore.introspect_schema()?;
        let mut tables = SchemaMap::new();
        for table in rules::KNOWN_TABLES {
            match raw.get(*table) {
                Some(columns) => {
                    tables.insert((*table).to_string(), columns.clone());
                }
                None => warn!(table, "expected table missing from catalog"),
            }
        }
        let mirror = Self::from_tables(tables);
        info!(
            tables = mirror.tables.len(),
            columns = mirror.all_columns.len(),
            "schema mirror built"
        );
        Ok(mirror)
    }

    /// Build directly from a table map. Used in tests and for fixtures.
    pub fn from_tables(tables: SchemaMap) -> Self {
        let all_columns = tables
            .values()
            .flat_map(|cols| cols.iter().cloned())
            .collect();
        Self { tables, all_columns }
    }

    pub fn tables(&self) -> &SchemaMap {
        &self.tables
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.all_columns.contains(column)
    }

    pub fn columns_of(&self, table: &str) -> Option<&[String]> {
        self.tables.get(table).map(|v| v.as_slice())
    }

    /// Tables whose column list contains `column` (case-insensitive).
    pub fn tables_containing(&self, column: &str) -> Vec<&str> {
        let needle = column.to_lowercase();
        self.tables
            .iter()
            .filter(|(_, cols)| cols.iter().any(|c| c.to_lowercase() == needle))
            .map(|(t, _)| t.as_str())
            .collect()
    }

    /// Up to three plausible replacements for an unknown column name,
    /// drawn from the concept table and substring/fuzzy matches against
    /// the real columns.
    pub fn suggest_columns(&self, column: &str) -> Vec<String> {
        let needle = column.to_lowercase();
        let mut suggestions: Vec<String> = Vec::new();

        for (concept, columns) in rules::CONCEPT_COLUMNS {
            if needle.contains(concept) || concept.contains(needle.as_str()) {
                for col in *columns {
                    if self.all_columns.contains(*col) {
                        suggestions.push((*col).to_string());
                    }
                }
            }
        }

        for col in &self.all_columns {
            let lower = col.to_lowercase();
            if lower.contains(&needle) || needle.contains(&lower) {
                suggestions.push(col.clone());
            }
        }

        // Fuzzy matches last so exact substring hits rank first.
        let mut fuzzy: Vec<(f64, &String)> = self
            .all_columns
            .iter()
            .map(|col| (strsim::jaro_winkler(&needle, &col.to_lowercase()), col))
            .filter(|(score, _)| *score > 0.85)
            .collect();
        fuzzy.sort_by(|a, b| b.0.total_cmp(&a.0));
        suggestions.extend(fuzzy.into_iter().map(|(_, col)| col.clone()));

        let mut seen = BTreeSet::new();
        suggestions.retain(|s| seen.insert(s.clone()));
        suggestions.truncate(3);
        suggestions
    }

    /// Best fuzzy match for an unknown table name, if close enough.
    pub fn suggest_table(&self, table: &str) -> Option<&str> {
        let needle = table.to_lowercase();
        self.tables
            .keys()
            .map(|t| (strsim::jaro_winkler(&needle, t), t))
            .filter(|(score, _)| *score > 0.7)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, t)| t.as_str())
    }

    /// Tables mentioned anywhere in the SQL text, by whole-word match.
    pub fn tables_in_sql(&self, sql: &str) -> BTreeSet<String> {
        let lower = sql.to_lowercase();
        self.tables
            .keys()
            .filter(|table| contains_word(&lower, table))
            .cloned()
            .collect()
    }
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(idx, _)| {
        let before_ok = idx == 0
            || !haystack[..idx]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric() || c == '_');
        let end = idx + word.len();
        let after_ok = end == haystack.len()
            || !haystack[end..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_');
        before_ok && after_ok
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> SchemaMirror {
        let mut tables = SchemaMap::new();
        tables.insert(
            "vts_truck_master".to_string(),
            vec![
                "truck_no".to_string(),
                "transporter_name".to_string(),
                "whether_truck_blacklisted".to_string(),
                "capacity_of_the_truck".to_string(),
            ],
        );
        tables.insert(
            "vts_alert_history".to_string(),
            vec![
                "tl_number".to_string(),
                "violation_type".to_string(),
                "vts_end_datetime".to_string(),
            ],
        );
        SchemaMirror::from_tables(tables)
    }

    #[test]
    fn knows_its_tables_and_columns() {
        let mirror = fixture();
        assert!(mirror.has_table("vts_truck_master"));
        assert!(!mirror.has_table("trucks"));
        assert!(mirror.has_column("tl_number"));
        assert!(!mirror.has_column("vehicle_number"));
    }

    #[test]
    fn suggests_real_column_for_hallucinated_name() {
        let mirror = fixture();
        let suggestions = mirror.suggest_columns("blacklisted");
        assert!(suggestions.contains(&"whether_truck_blacklisted".to_string()));
    }

    #[test]
    fn suggests_table_for_typo() {
        let mirror = fixture();
        assert_eq!(mirror.suggest_table("vts_truck_mastr"), Some("vts_truck_master"));
        assert_eq!(mirror.suggest_table("zzzz"), None);
    }

    #[test]
    fn finds_tables_by_whole_word_only() {
        let mirror = fixture();
        let tables = mirror.tables_in_sql("SELECT * FROM vts_truck_master vtm");
        assert!(tables.contains("vts_truck_master"));
        let none = mirror.tables_in_sql("SELECT * FROM vts_truck_master_archive");
        assert!(none.is_empty());
    }

    #[test]
    fn cross_table_lookup_names_owner() {
        let mirror = fixture();
        assert_eq!(
            mirror.tables_containing("whether_truck_blacklisted"),
            vec!["vts_truck_master"]
        );
    }
}
