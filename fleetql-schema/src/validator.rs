//! Layered SQL validation.
//!
//! Cheap textual checks run first, the database planner runs last, and
//! every failure path comes back as a `ValidationVerdict` value. Only a
//! dead datastore escapes as an error.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::LazyLock;

use dashmap::DashMap;
use moka::sync::Cache;
use regex::Regex;
use tracing::debug;

use fleetql_core::errors::FleetqlResult;
use fleetql_core::models::ValidationVerdict;
use fleetql_core::traits::{IDatastore, PlanOutcome};

use crate::classify;
use crate::mirror::SchemaMirror;
use crate::rules;

static RE_TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),\s*\n\s*FROM").unwrap());
static RE_PLUS_CONCAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'[^']*'\s*\+|\+\s*'[^']*'").unwrap());
static RE_BETWEEN_DATES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)between\s+'(\d{4}-\d{2}-\d{2})'\s+and\s+'(\d{4}-\d{2}-\d{2})'").unwrap()
});
static WRONG_COLUMN_PATTERNS: LazyLock<Vec<(Regex, &'static str, &'static str)>> =
    LazyLock::new(|| {
        rules::KNOWN_WRONG_COLUMNS
            .iter()
            .map(|(wrong, correct)| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(wrong));
                (Regex::new(&pattern).unwrap(), *wrong, *correct)
            })
            .collect()
    });

/// Single source of truth for "is this SQL legal", independent of any
/// model. Identical SQL text is validated at most once per process.
pub struct SqlValidator {
    datastore: Arc<dyn IDatastore>,
    mirror: SchemaMirror,
    memo: Cache<String, ValidationVerdict>,
    error_frequency: DashMap<&'static str, u64>,
}

impl SqlValidator {
    pub fn new(datastore: Arc<dyn IDatastore>, mirror: SchemaMirror) -> Self {
        Self {
            datastore,
            mirror,
            memo: Cache::new(4096),
            error_frequency: DashMap::new(),
        }
    }

    pub fn mirror(&self) -> &SchemaMirror {
        &self.mirror
    }

    /// Validate with the forbidden-join check enabled.
    pub fn validate(&self, sql: &str) -> FleetqlResult<ValidationVerdict> {
        self.validate_with_options(sql, false)
    }

    /// Full validation ladder. `bypass_forbidden_joins` is for templates
    /// that are known to be bridged correctly.
    pub fn validate_with_options(
        &self,
        sql: &str,
        bypass_forbidden_joins: bool,
    ) -> FleetqlResult<ValidationVerdict> {
        if sql.trim().is_empty() {
            return Ok(ValidationVerdict::invalid("Empty SQL query"));
        }

        // The verdict depends on the bypass mode, so it is part of the key.
        let mut hasher = blake3::Hasher::new();
        hasher.update(sql.as_bytes());
        hasher.update(&[bypass_forbidden_joins as u8]);
        let memo_key = hasher.finalize().to_hex().to_string();
        if let Some(verdict) = self.memo.get(&memo_key) {
            return Ok(verdict);
        }

        let verdict = self.validate_uncached(sql, bypass_forbidden_joins)?;
        self.memo.insert(memo_key, verdict.clone());
        Ok(verdict)
    }

    fn validate_uncached(
        &self,
        sql: &str,
        bypass_forbidden_joins: bool,
    ) -> FleetqlResult<ValidationVerdict> {
        if let Some(verdict) = self.check_known_wrong_columns(sql) {
            self.track_error("column_reference_error");
            return Ok(verdict);
        }
        if let Some(verdict) = check_dangerous_ops(sql) {
            self.track_error("dangerous_operation");
            return Ok(verdict);
        }
        if let Some(verdict) = check_syntax_smells(sql) {
            self.track_error("pre_validation_error");
            return Ok(verdict);
        }
        if !bypass_forbidden_joins {
            if let Some(verdict) = self.check_forbidden_joins(sql) {
                self.track_error("forbidden_join_error");
                return Ok(verdict);
            }
        }
        if let Some(verdict) = check_temporal_sanity(sql) {
            self.track_error("temporal_logic_error");
            return Ok(verdict);
        }

        match self.datastore.plan(sql)? {
            PlanOutcome::Accepted => Ok(ValidationVerdict::valid("SQL is valid and executable")),
            PlanOutcome::Rejected(error) => {
                self.track_error("execution_error");
                let classified = classify::classify(&error, sql, &self.mirror);
                debug!(
                    category = classified.category.as_str(),
                    "planner rejected candidate"
                );
                Ok(ValidationVerdict::invalid(classified.message))
            }
        }
    }

    fn check_known_wrong_columns(&self, sql: &str) -> Option<ValidationVerdict> {
        for (regex, wrong, correct) in WRONG_COLUMN_PATTERNS.iter() {
            if regex.is_match(sql) {
                return Some(ValidationVerdict::invalid(format!(
                    "Invalid column reference: '{wrong}' -> use '{correct}'"
                )));
            }
        }
        None
    }

    fn check_forbidden_joins(&self, sql: &str) -> Option<ValidationVerdict> {
        let detected: BTreeSet<String> = self.mirror.tables_in_sql(sql);
        if detected.len() < 2 || detected.contains(rules::BRIDGE_TABLE) {
            return None;
        }
        for (a, b) in rules::FORBIDDEN_JOINS {
            if detected.contains(*a) && detected.contains(*b) {
                return Some(ValidationVerdict::invalid(format!(
                    "Forbidden Join: Joining tables '{a}' and '{b}' directly is not allowed. \
                     You must join through a master table like {}.",
                    rules::BRIDGE_TABLE
                )));
            }
        }
        None
    }

    fn track_error(&self, kind: &'static str) {
        *self.error_frequency.entry(kind).or_insert(0) += 1;
    }

    /// Error counts by kind, most frequent first.
    pub fn error_stats(&self) -> Vec<(String, u64)> {
        let mut stats: Vec<(String, u64)> = self
            .error_frequency
            .iter()
            .map(|entry| (entry.key().to_string(), *entry.value()))
            .collect();
        stats.sort_by(|a, b| b.1.cmp(&a.1));
        stats
    }
}

fn check_dangerous_ops(sql: &str) -> Option<ValidationVerdict> {
    let lower = sql.to_lowercase();
    for op in rules::DANGEROUS_OPS {
        if lower.contains(op) {
            return Some(ValidationVerdict::invalid("Dangerous SQL operation detected"));
        }
    }
    None
}

fn check_syntax_smells(sql: &str) -> Option<ValidationVerdict> {
    if RE_TRAILING_COMMA.is_match(sql) {
        return Some(ValidationVerdict::invalid(
            "Trailing comma before FROM clause. Remove the comma after the last SELECT column.",
        ));
    }
    if RE_PLUS_CONCAT.is_match(sql) {
        return Some(ValidationVerdict::invalid(
            "Invalid string concatenation. Use the || operator instead of +.",
        ));
    }
    None
}

fn check_temporal_sanity(sql: &str) -> Option<ValidationVerdict> {
    for caps in RE_BETWEEN_DATES.captures_iter(sql) {
        let (start, end) = (&caps[1], &caps[2]);
        // ISO dates compare correctly as strings.
        if start > end {
            return Some(ValidationVerdict::invalid(format!(
                "Temporal Logic Error: Start date '{start}' is after end date '{end}'."
            )));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetql_core::documents::Document;
    use fleetql_core::models::ExecutionResult;
    use fleetql_core::traits::{QueryOutcome, SchemaMap};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubDatastore {
        plan_calls: AtomicUsize,
        reject_with: Option<String>,
    }

    impl StubDatastore {
        fn accepting() -> Self {
            Self {
                plan_calls: AtomicUsize::new(0),
                reject_with: None,
            }
        }

        fn rejecting(error: &str) -> Self {
            Self {
                plan_calls: AtomicUsize::new(0),
                reject_with: Some(error.to_string()),
            }
        }
    }

    impl IDatastore for StubDatastore {
        fn introspect_schema(&self) -> FleetqlResult<SchemaMap> {
            Ok(fixture_tables())
        }

        fn plan(&self, _sql: &str) -> FleetqlResult<PlanOutcome> {
            self.plan_calls.fetch_add(1, Ordering::SeqCst);
            Ok(match &self.reject_with {
                Some(error) => PlanOutcome::Rejected(error.clone()),
                None => PlanOutcome::Accepted,
            })
        }

        fn execute(&self, _sql: &str) -> FleetqlResult<QueryOutcome> {
            Ok(QueryOutcome::Rows(ExecutionResult::new(vec![], vec![])))
        }

        fn upsert_document(&self, _document: &Document) -> FleetqlResult<()> {
            Ok(())
        }

        fn nearest_documents(
            &self,
            _embedding: &[f32],
            _limit: usize,
        ) -> FleetqlResult<Vec<(Document, f64)>> {
            Ok(vec![])
        }

        fn document_count(&self) -> FleetqlResult<usize> {
            Ok(0)
        }
    }

    fn fixture_tables() -> SchemaMap {
        let mut tables = SchemaMap::new();
        tables.insert(
            "vts_truck_master".to_string(),
            vec![
                "truck_no".to_string(),
                "transporter_name".to_string(),
                "whether_truck_blacklisted".to_string(),
            ],
        );
        tables.insert(
            "vts_alert_history".to_string(),
            vec!["tl_number".to_string(), "vts_end_datetime".to_string()],
        );
        tables.insert(
            "alerts".to_string(),
            vec!["vehicle_number".to_string(), "created_at".to_string()],
        );
        tables
    }

    fn validator(datastore: StubDatastore) -> SqlValidator {
        let mirror = SchemaMirror::from_tables(fixture_tables());
        SqlValidator::new(Arc::new(datastore), mirror)
    }

    #[test]
    fn empty_sql_is_invalid() {
        let v = validator(StubDatastore::accepting());
        let verdict = v.validate("   ").unwrap();
        assert!(!verdict.valid);
        assert!(verdict.message.contains("Empty"));
    }

    #[test]
    fn known_wrong_column_is_rejected_before_planning() {
        let stub = StubDatastore::accepting();
        let v = validator(stub);
        let verdict = v
            .validate("SELECT * FROM vts_truck_master WHERE blacklisted = 'Y'")
            .unwrap();
        assert!(!verdict.valid);
        assert!(verdict.message.contains("whether_truck_blacklisted"));
    }

    #[test]
    fn mutating_statements_are_rejected() {
        let v = validator(StubDatastore::accepting());
        for sql in [
            "DELETE FROM alerts",
            "UPDATE vts_truck_master SET truck_no = 'X'",
            "DROP TABLE alerts",
        ] {
            let verdict = v.validate(sql).unwrap();
            assert!(!verdict.valid, "{sql}");
            assert!(verdict.message.contains("Dangerous"), "{sql}");
        }
    }

    #[test]
    fn trailing_comma_is_caught() {
        let v = validator(StubDatastore::accepting());
        let verdict = v
            .validate("SELECT truck_no,\n FROM vts_truck_master")
            .unwrap();
        assert!(!verdict.valid);
        assert!(verdict.message.contains("Trailing comma"));
    }

    #[test]
    fn forbidden_join_requires_bridge() {
        let v = validator(StubDatastore::accepting());
        let verdict = v
            .validate(
                "SELECT * FROM vts_alert_history vah JOIN alerts a ON vah.tl_number = a.vehicle_number",
            )
            .unwrap();
        assert!(!verdict.valid);
        assert!(verdict.message.contains("Forbidden Join"));

        let bridged = v
            .validate(
                "SELECT * FROM vts_alert_history vah \
                 JOIN vts_truck_master vtm ON vah.tl_number = vtm.truck_no \
                 JOIN alerts a ON vtm.truck_no = a.vehicle_number",
            )
            .unwrap();
        assert!(bridged.valid, "{}", bridged.message);
    }

    #[test]
    fn inverted_between_range_is_rejected() {
        let v = validator(StubDatastore::accepting());
        let verdict = v
            .validate(
                "SELECT * FROM alerts WHERE created_at BETWEEN '2024-06-01' AND '2024-01-01'",
            )
            .unwrap();
        assert!(!verdict.valid);
        assert!(verdict.message.contains("Temporal Logic Error"));
    }

    #[test]
    fn planner_rejection_is_classified() {
        let v = validator(StubDatastore::rejecting(r#"column "blacklist" does not exist"#));
        let verdict = v.validate("SELECT blacklist FROM vts_truck_master").unwrap();
        assert!(!verdict.valid);
        assert!(verdict.message.contains("whether_truck_blacklisted"));
    }

    #[test]
    fn identical_sql_plans_once() {
        let stub = Arc::new(StubDatastore::accepting());
        let mirror = SchemaMirror::from_tables(fixture_tables());
        let v = SqlValidator::new(stub.clone(), mirror);
        let sql = "SELECT truck_no FROM vts_truck_master";
        v.validate(sql).unwrap();
        v.validate(sql).unwrap();
        assert_eq!(stub.plan_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bypass_verdict_is_not_served_on_the_strict_path() {
        let v = validator(StubDatastore::accepting());
        let sql = "SELECT * FROM vts_alert_history vah \
                   JOIN alerts a ON vah.tl_number = a.vehicle_number";
        let bypassed = v.validate_with_options(sql, true).unwrap();
        assert!(bypassed.valid, "{}", bypassed.message);

        let strict = v.validate(sql).unwrap();
        assert!(!strict.valid);
        assert!(strict.message.contains("Forbidden Join"));
    }

    #[test]
    fn error_frequency_is_tracked() {
        let v = validator(StubDatastore::accepting());
        v.validate("DELETE FROM alerts").unwrap();
        v.validate("DROP TABLE alerts").unwrap();
        let stats = v.error_stats();
        assert_eq!(stats[0], ("dangerous_operation".to_string(), 2));
    }
}
