//! Post-execution sanity checks.
//!
//! A query can validate, plan, and execute yet still answer the wrong
//! question. These checks compare the result shape against what the
//! question implies and produce feedback strings for the forced
//! regeneration pass.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use fleetql_core::models::{ExecutionResult, QuerySource};
use fleetql_retrieval::has_negative_intent;
use fleetql_schema::rules::{table_for_alias, CANONICAL_TIME_COLUMNS, KNOWN_TABLES};

static RE_ALIAS_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:from|join)\s+([a-z_][\w]*)\s+(?:as\s+)?([a-z_][\w]*)?").unwrap()
});
static RE_QUALIFIED_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([a-z_][\w]*)\.([a-z_][\w]*)").unwrap());
static RE_AGGREGATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:count|sum|avg|min|max|corr)\s*\(").unwrap()
});

/// Concepts the question can name, each with the columns that would
/// satisfy it in the result set.
const EXPECTED_CONCEPTS: &[(&str, &[&str])] = &[
    ("risk score", &["risk_score", "risk", "correlation"]),
    ("transporter", &["transporter_name", "transporter_code"]),
    ("driver", &["driver_name"]),
    ("last alert", &["created_at", "vts_end_datetime", "event_time"]),
];

/// Run every applicable check. An empty vector means the result is
/// plausible; each entry is feedback for a regeneration prompt.
pub fn sanity_issues(
    question: &str,
    sql: &str,
    source: &QuerySource,
    result: &ExecutionResult,
    max_sane_rows: usize,
) -> Vec<String> {
    // Catalog answers have their own shape; none of these apply.
    if *source == QuerySource::SchemaIntrospection {
        return Vec::new();
    }

    let mut issues = Vec::new();
    let lower_question = question.to_lowercase();
    let lower_sql = sql.to_lowercase();

    row_count_anomaly(&lower_question, &lower_sql, result, max_sane_rows, &mut issues);
    missing_concepts(&lower_question, &lower_sql, result, &mut issues);
    time_column_mismatch(&lower_sql, &mut issues);
    negative_intent_shape(&lower_question, &lower_sql, &mut issues);
    issues
}

/// A huge row count for a question that did not ask for everything
/// usually means a missing filter or an accidental cross join.
fn row_count_anomaly(
    question: &str,
    sql: &str,
    result: &ExecutionResult,
    max_sane_rows: usize,
    issues: &mut Vec<String>,
) {
    if result.count <= max_sane_rows {
        return;
    }
    if question.contains("all ") || question.contains("every ") {
        return;
    }
    if RE_AGGREGATE.is_match(sql) {
        return;
    }
    issues.push(format!(
        "the query returned {} rows, which is implausibly large for this question; \
         a WHERE filter or join condition is probably missing",
        result.count
    ));
}

/// The question names a concept the result does not carry.
fn missing_concepts(
    question: &str,
    sql: &str,
    result: &ExecutionResult,
    issues: &mut Vec<String>,
) {
    if sql.contains("select *") {
        return;
    }
    // Aggregations that use the concept in logic rather than output are
    // fine: "count vehicles per transporter" groups by it.
    let aggregated = RE_AGGREGATE.is_match(sql);
    for (concept, columns) in EXPECTED_CONCEPTS {
        if !question.contains(concept) {
            continue;
        }
        let in_result = result
            .columns
            .iter()
            .any(|c| columns.iter().any(|want| c.to_lowercase().contains(want)));
        let in_sql_logic = columns.iter().any(|want| sql.contains(want));
        if !in_result && !(aggregated && in_sql_logic) {
            issues.push(format!(
                "the question asks about '{concept}' but the result has no {} column",
                columns[0]
            ));
        }
    }
}

/// Time filters must use each table's canonical timestamp column.
fn time_column_mismatch(sql: &str, issues: &mut Vec<String>) {
    let aliases = alias_map(sql);
    for caps in RE_QUALIFIED_COLUMN.captures_iter(sql) {
        let qualifier = &caps[1];
        let column = &caps[2];
        let Some(table) = resolve_table(qualifier, &aliases) else {
            continue;
        };
        let Some((_, canonical)) = CANONICAL_TIME_COLUMNS.iter().find(|(t, _)| *t == table)
        else {
            continue;
        };
        let is_time_column = CANONICAL_TIME_COLUMNS.iter().any(|(_, c)| *c == column);
        if is_time_column && column != *canonical {
            issues.push(format!(
                "{table} must be filtered on {canonical}, not {column}"
            ));
        }
    }
}

/// Negative questions need an exclusion shape anchored on the master
/// table, or vehicles with zero rows silently disappear.
fn negative_intent_shape(question: &str, sql: &str, issues: &mut Vec<String>) {
    if !has_negative_intent(question) {
        return;
    }
    let has_exclusion =
        sql.contains("not exists") || (sql.contains("left join") && sql.contains("is null"));
    if !has_exclusion {
        issues.push(
            "the question asks about absence of records; use NOT EXISTS or \
             LEFT JOIN ... IS NULL"
                .to_string(),
        );
    }
    if !sql.contains("from vts_truck_master") {
        issues.push(
            "absence queries must start FROM vts_truck_master so vehicles with \
             zero matching rows are included"
                .to_string(),
        );
    }
}

fn alias_map(sql: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for caps in RE_ALIAS_DEF.captures_iter(sql) {
        let table = caps[1].to_string();
        if !KNOWN_TABLES.contains(&table.as_str()) {
            continue;
        }
        if let Some(alias) = caps.get(2) {
            let alias = alias.as_str();
            if !is_sql_keyword(alias) {
                map.insert(alias.to_string(), table.clone());
            }
        }
        map.insert(table.clone(), table);
    }
    map
}

fn resolve_table<'a>(qualifier: &str, aliases: &'a BTreeMap<String, String>) -> Option<&'a str> {
    aliases
        .get(qualifier)
        .map(|t| t.as_str())
        .or_else(|| table_for_alias(qualifier))
}

fn is_sql_keyword(word: &str) -> bool {
    fleetql_schema::rules::SQL_KEYWORDS.contains(&word)
}
