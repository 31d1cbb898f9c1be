//! Logical-plan cross-check.
//!
//! When the corpus holds a near-identical gold-standard example, a
//! freshly generated query should touch the same tables and use the
//! same exclusion shape. A structural mismatch is a strong hint the
//! model answered a different question.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use fleetql_schema::rules::{table_for_alias, KNOWN_TABLES};

static RE_TABLE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:from|join)\s+([a-z_][\w.]*)").unwrap());

/// Known tables referenced in FROM/JOIN position.
pub fn tables_from_sql(sql: &str) -> BTreeSet<String> {
    let mut tables = BTreeSet::new();
    for caps in RE_TABLE_REF.captures_iter(sql) {
        let name = caps[1].to_lowercase();
        let name = name.rsplit('.').next().unwrap_or(&name);
        if KNOWN_TABLES.contains(&name) {
            tables.insert(name.to_string());
        } else if let Some(table) = table_for_alias(name) {
            tables.insert(table.to_string());
        }
    }
    tables
}

fn has_exclusion_shape(sql: &str) -> bool {
    let lower = sql.to_lowercase();
    lower.contains("not exists") || (lower.contains("left join") && lower.contains("is null"))
}

/// Compare a candidate against the gold standard. `Ok(())` means the
/// plans agree; `Err` carries feedback for the regeneration prompt.
pub fn cross_check(candidate_sql: &str, gold_sql: &str, negative_intent: bool) -> Result<(), String> {
    let candidate_tables = tables_from_sql(candidate_sql);
    let gold_tables = tables_from_sql(gold_sql);

    if !gold_tables.is_empty() && candidate_tables != gold_tables {
        let missing: Vec<&str> = gold_tables
            .difference(&candidate_tables)
            .map(|s| s.as_str())
            .collect();
        let extra: Vec<&str> = candidate_tables
            .difference(&gold_tables)
            .map(|s| s.as_str())
            .collect();
        return Err(format!(
            "a verified query for this question uses tables [{}]; yours is missing \
             [{}] and adds [{}]",
            join(&gold_tables),
            missing.join(", "),
            extra.join(", ")
        ));
    }

    if negative_intent && has_exclusion_shape(gold_sql) && !has_exclusion_shape(candidate_sql) {
        return Err(
            "a verified query for this question uses an exclusion pattern \
             (NOT EXISTS or LEFT JOIN ... IS NULL); yours does not"
                .to_string(),
        );
    }
    Ok(())
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
}
