//! Database error classification.
//!
//! Turns a raw planner error into a targeted diagnostic the generation
//! loop can act on. Each category carries a concrete fix, not just the
//! driver message.

use std::sync::LazyLock;

use regex::Regex;

use crate::mirror::SchemaMirror;
use crate::rules;

/// Error categories recognized in planner output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    UnknownColumn,
    UnknownTable,
    MissingFromEntry,
    AmbiguousColumn,
    GroupByViolation,
    InvalidOperator,
    TimestampVsInteger,
    AggregateInJoin,
    MalformedArray,
    Generic,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownColumn => "unknown_column",
            Self::UnknownTable => "unknown_table",
            Self::MissingFromEntry => "missing_from_entry",
            Self::AmbiguousColumn => "ambiguous_column",
            Self::GroupByViolation => "group_by_violation",
            Self::InvalidOperator => "invalid_operator",
            Self::TimestampVsInteger => "timestamp_vs_integer",
            Self::AggregateInJoin => "aggregate_in_join",
            Self::MalformedArray => "malformed_array",
            Self::Generic => "generic",
        }
    }
}

struct ErrorPattern {
    category: ErrorCategory,
    regex: &'static LazyLock<Regex>,
    fix: &'static str,
}

macro_rules! error_re {
    ($name:ident, $pattern:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($pattern).unwrap());
    };
}

error_re!(RE_UNKNOWN_COLUMN, r#"(?:column "(\w+)" does not exist|no such column: ([\w.]+))"#);
error_re!(RE_UNKNOWN_TABLE, r#"(?:relation "(\w+)" does not exist|no such table: ([\w.]+))"#);
error_re!(RE_MISSING_FROM, r#"missing FROM-clause entry for table "(\w+)""#);
error_re!(RE_AMBIGUOUS, r#"(?:column reference "(\w+)" is ambiguous|ambiguous column name: ([\w.]+))"#);
error_re!(RE_GROUP_BY, r"must appear in the GROUP BY clause");
error_re!(RE_INVALID_OP, r"operator does not exist.*character varying.*\+");
error_re!(RE_TS_VS_INT, r"operator does not exist: timestamp.*integer");
error_re!(RE_AGG_IN_JOIN, r"aggregate functions are not allowed in JOIN conditions");
error_re!(RE_MALFORMED_ARRAY, r"malformed array literal");

static PATTERNS: &[ErrorPattern] = &[
    ErrorPattern {
        category: ErrorCategory::MissingFromEntry,
        regex: &RE_MISSING_FROM,
        fix: "Add the table to the FROM clause or remove references to it.",
    },
    ErrorPattern {
        category: ErrorCategory::AmbiguousColumn,
        regex: &RE_AMBIGUOUS,
        fix: "Prefix the column with its table alias.",
    },
    ErrorPattern {
        category: ErrorCategory::UnknownColumn,
        regex: &RE_UNKNOWN_COLUMN,
        fix: "Check the column name against the schema.",
    },
    ErrorPattern {
        category: ErrorCategory::UnknownTable,
        regex: &RE_UNKNOWN_TABLE,
        fix: "Check the table name spelling against the schema.",
    },
    ErrorPattern {
        category: ErrorCategory::GroupByViolation,
        regex: &RE_GROUP_BY,
        fix: "Add every non-aggregated SELECT column to the GROUP BY clause.",
    },
    ErrorPattern {
        category: ErrorCategory::AggregateInJoin,
        regex: &RE_AGG_IN_JOIN,
        fix: "Move the aggregate condition to a HAVING clause or pre-calculate it in a CTE.",
    },
    ErrorPattern {
        category: ErrorCategory::TimestampVsInteger,
        regex: &RE_TS_VS_INT,
        fix: "Do not compare a timestamp with an integer. Use date < CURRENT_DATE - INTERVAL 'X days'.",
    },
    ErrorPattern {
        category: ErrorCategory::InvalidOperator,
        regex: &RE_INVALID_OP,
        fix: "Use || for string concatenation, not +.",
    },
    ErrorPattern {
        category: ErrorCategory::MalformedArray,
        regex: &RE_MALFORMED_ARRAY,
        fix: "A string is being treated as an array or vice versa. Use array_to_string() or an ARRAY[] constructor.",
    },
];

/// A classified planner error.
#[derive(Debug, Clone)]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    pub message: String,
}

/// Classify a raw planner error and build a targeted suggestion using
/// the schema mirror.
pub fn classify(error: &str, sql: &str, mirror: &SchemaMirror) -> ClassifiedError {
    for pattern in PATTERNS {
        if let Some(caps) = pattern.regex.captures(error) {
            let subject = caps
                .iter()
                .skip(1)
                .flatten()
                .next()
                .map(|m| m.as_str())
                .unwrap_or("unknown");
            let message = match pattern.category {
                ErrorCategory::UnknownColumn => suggest_column_fix(subject, mirror),
                ErrorCategory::UnknownTable => suggest_table_fix(subject, mirror),
                ErrorCategory::MissingFromEntry => suggest_missing_from_fix(subject),
                ErrorCategory::AmbiguousColumn => suggest_alias_fix(subject, mirror),
                ErrorCategory::GroupByViolation => suggest_group_by_fix(sql),
                _ => format!(
                    "{}: {}\nOriginal error: {}",
                    pattern.category.as_str().to_uppercase(),
                    pattern.fix,
                    truncate(error, 200)
                ),
            };
            return ClassifiedError {
                category: pattern.category,
                message,
            };
        }
    }
    ClassifiedError {
        category: ErrorCategory::Generic,
        message: format!("SQL execution failed: {}", truncate(error, 300)),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn suggest_column_fix(column: &str, mirror: &SchemaMirror) -> String {
    let bare = column.rsplit('.').next().unwrap_or(column);
    let similar = mirror.suggest_columns(bare);
    if !similar.is_empty() {
        return format!(
            "Column '{column}' not found. Did you mean: {}?\n\
             Common fixes:\n\
             - Check the table alias you are using\n\
             - Verify the column name in the schema\n\
             - Make sure the table containing this column is joined",
            similar.join(", ")
        );
    }

    let owners = mirror.tables_containing(bare);
    if owners.contains(&rules::BRIDGE_TABLE) {
        return format!(
            "Column '{column}' does not exist in the current table(s), but it does exist in \
             '{bridge}'. FIX: JOIN '{bridge}' (alias {alias}) to filter or select by '{column}'. \
             Example: JOIN {bridge} {alias} ON <current_alias>.<vehicle_id_col> = {alias}.truck_no",
            bridge = rules::BRIDGE_TABLE,
            alias = rules::alias_for(rules::BRIDGE_TABLE),
        );
    }
    if !owners.is_empty() {
        return format!(
            "Column '{column}' does not exist in the selected table(s), but it was found in: {}. \
             FIX: JOIN one of these tables to access this column.",
            owners.join(", ")
        );
    }
    format!("Column '{column}' does not exist in the schema. Check the schema for valid columns.")
}

fn suggest_table_fix(table: &str, mirror: &SchemaMirror) -> String {
    match mirror.suggest_table(table) {
        Some(best) => format!(
            "WRONG_TABLE_REFERENCE: Table '{table}' does not exist. Did you mean '{best}'? \
             Use valid table names from the schema."
        ),
        None => format!("WRONG_TABLE_REFERENCE: Table '{table}' does not exist in the schema."),
    }
}

fn suggest_missing_from_fix(alias: &str) -> String {
    match rules::table_for_alias(alias) {
        Some(table) => format!(
            "Add to FROM clause: ... FROM {table} {alias} ... \
             Or if joining: ... JOIN {table} {alias} ON <condition> ..."
        ),
        None => format!("Alias '{alias}' is not defined. Add its table to FROM or a JOIN clause."),
    }
}

fn suggest_alias_fix(column: &str, mirror: &SchemaMirror) -> String {
    let owners = mirror.tables_containing(column);
    if owners.is_empty() {
        return format!("Column '{column}' is ambiguous. Prefix with a table alias: table.{column}");
    }
    let options: Vec<String> = owners
        .iter()
        .map(|table| format!("{}.{column}", rules::alias_for(table)))
        .collect();
    format!(
        "Column '{column}' is ambiguous (exists in {} tables). Prefix with a table alias. \
         Options: {}",
        owners.len(),
        options.join(", ")
    )
}

error_re!(RE_SELECT_CLAUSE, r"(?is)SELECT\s+(.*?)\s+FROM");
error_re!(RE_GROUP_BY_CLAUSE, r"(?is)GROUP BY\s+(.*?)(?:\s+HAVING|\s+ORDER BY|\s*$)");
// Trailing "(" capture marks function names so they can be skipped.
error_re!(
    RE_SELECT_IDENT,
    r"([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)?)(\s*\()?"
);

/// Parse the SELECT list to name the exact columns missing from GROUP BY.
pub fn suggest_group_by_fix(sql: &str) -> String {
    let Some(select) = RE_SELECT_CLAUSE
        .captures(sql)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
    else {
        return "GROUP BY ERROR: Every non-aggregated column in SELECT must be in GROUP BY. \
                FIX: Review your SELECT columns and add the missing ones."
            .to_string();
    };

    let ignore = ["as", "distinct", "case", "when", "then", "else", "end"];
    let selected: std::collections::BTreeSet<String> = RE_SELECT_IDENT
        .captures_iter(select)
        .filter(|c| c.get(2).is_none())
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .filter(|ident| !ignore.contains(&ident.to_lowercase().as_str()))
        .map(|ident| ident.rsplit('.').next().unwrap_or(ident.as_str()).to_string())
        .collect();

    let grouped: std::collections::BTreeSet<String> = RE_GROUP_BY_CLAUSE
        .captures(sql)
        .and_then(|c| c.get(1))
        .map(|m| {
            m.as_str()
                .split(',')
                .map(|col| col.trim().rsplit('.').next().unwrap_or(col).to_string())
                .collect()
        })
        .unwrap_or_default();

    let missing: Vec<String> = selected.difference(&grouped).cloned().collect();
    if missing.is_empty() {
        return "GROUP BY ERROR: A non-aggregated column in your SELECT list is missing from \
                the GROUP BY clause. Please add it."
            .to_string();
    }
    format!(
        "GROUP BY ERROR: The query is missing columns in the GROUP BY clause. \
         FIX: Add `{}` to the GROUP BY clause.",
        missing.join(", ")
    )
}
