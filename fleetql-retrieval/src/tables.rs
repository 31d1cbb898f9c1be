//! Concept-based table detection.
//!
//! Deterministic rule engine: detect domain concepts by pattern, map
//! them to tables, then apply combination and bridging rules. Pure and
//! order-independent given the rule tables.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use fleetql_core::documents::DocumentKind;
use fleetql_schema::rules;

use crate::engine::ScoredDocument;
use crate::normalize::has_negative_intent;

/// Domain concepts detectable in a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Concept {
    Risk,
    Violation,
    Alert,
    LiveStatus,
    Audit,
    Blacklist,
    Transporter,
    Driver,
    Historical,
    SchemaInquiry,
}

struct ConceptRule {
    concept: Concept,
    regex: &'static LazyLock<Regex>,
}

macro_rules! concept_re {
    ($name:ident, $pattern:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($pattern).unwrap());
    };
}

concept_re!(RE_RISK, r"\brisk\b|\brisky\b|\brisk\s+score\b");
concept_re!(RE_VIOLATION, r"violation|deviation|speeding|tamper|offline|night driving");
concept_re!(RE_ALERT, r"\balerts?\b");
concept_re!(RE_LIVE, r"\b(active|live|ongoing|current|right now|in transit)\b");
concept_re!(RE_AUDIT, r"\baudit\b");
concept_re!(RE_BLACKLIST, r"blacklist|whether_truck_blacklisted");
concept_re!(RE_TRANSPORTER, r"\btransporters?\b");
concept_re!(RE_DRIVER, r"\bdrivers?\b");
concept_re!(RE_HISTORICAL, r"\b(historical|completed trips?|past trips?|history of)\b");
concept_re!(RE_SCHEMA, r"\b(columns? (?:in|of)|schema for|describe table|structure of)\b");

static CONCEPT_RULES: &[ConceptRule] = &[
    ConceptRule { concept: Concept::Risk, regex: &RE_RISK },
    ConceptRule { concept: Concept::Violation, regex: &RE_VIOLATION },
    ConceptRule { concept: Concept::Alert, regex: &RE_ALERT },
    ConceptRule { concept: Concept::LiveStatus, regex: &RE_LIVE },
    ConceptRule { concept: Concept::Audit, regex: &RE_AUDIT },
    ConceptRule { concept: Concept::Blacklist, regex: &RE_BLACKLIST },
    ConceptRule { concept: Concept::Transporter, regex: &RE_TRANSPORTER },
    ConceptRule { concept: Concept::Driver, regex: &RE_DRIVER },
    ConceptRule { concept: Concept::Historical, regex: &RE_HISTORICAL },
    ConceptRule { concept: Concept::SchemaInquiry, regex: &RE_SCHEMA },
];

/// Single-concept table mapping.
const CONCEPT_TABLE_MAP: &[(Concept, &str)] = &[
    (Concept::Risk, "tt_risk_score"),
    (Concept::Violation, "vts_alert_history"),
    (Concept::Alert, "alerts"),
    (Concept::LiveStatus, "vts_ongoing_trips"),
    (Concept::Audit, "vts_tripauditmaster"),
    (Concept::Blacklist, "vts_truck_master"),
    (Concept::Transporter, "vts_truck_master"),
    (Concept::Driver, "vts_ongoing_trips"),
];

/// Keywords carried only by the master table.
const MASTER_DATA_KEYWORDS: &[&str] =
    &["zone", "region", "transporter", "ownership", "blacklisted", "owned"];

const TRANSACTIONAL_TABLES: &[&str] =
    &["alerts", "vts_alert_history", "vts_ongoing_trips", "tt_risk_score"];

/// Detect every concept present in the question.
pub fn detect_concepts(question: &str) -> BTreeSet<Concept> {
    let lower = question.to_lowercase();
    CONCEPT_RULES
        .iter()
        .filter(|rule| rule.regex.is_match(&lower))
        .map(|rule| rule.concept)
        .collect()
}

/// Determine the table set a question needs, combining concept rules
/// with a fallback scan over retrieved example SQL.
pub fn determine_relevant_tables(
    question: &str,
    retrieved: &[ScoredDocument],
) -> Vec<String> {
    let lower = question.to_lowercase();
    let concepts = detect_concepts(&lower);
    let mut tables: BTreeSet<String> = BTreeSet::new();

    // Schema questions only ever need the tables they name.
    if concepts.contains(&Concept::SchemaInquiry) {
        for table in rules::KNOWN_TABLES {
            if lower.contains(table) {
                tables.insert((*table).to_string());
            }
        }
        return tables.into_iter().collect();
    }

    for (concept, table) in CONCEPT_TABLE_MAP {
        if concepts.contains(concept) {
            tables.insert((*table).to_string());
        }
    }

    // Combination rules override the single-concept mapping.
    if concepts.contains(&Concept::Risk) && concepts.contains(&Concept::Transporter) {
        tables.remove("tt_risk_score");
        tables.insert("transporter_risk_score".to_string());
    }
    if concepts.contains(&Concept::Risk) && concepts.contains(&Concept::Historical) {
        tables.remove("tt_risk_score");
        tables.remove("vts_alert_history");
        tables.insert("completed_trips_risk_score".to_string());
    }

    // Master-data filters force the bridge table in.
    let mentions_master_data = MASTER_DATA_KEYWORDS.iter().any(|kw| lower.contains(kw));
    let has_transactional = tables
        .iter()
        .any(|t| TRANSACTIONAL_TABLES.contains(&t.as_str()));
    if mentions_master_data && has_transactional {
        tables.insert(rules::BRIDGE_TABLE.to_string());
    }

    // Negative alert questions must check non-existence in `alerts`, not
    // scan the history table.
    if has_negative_intent(&lower) && concepts.contains(&Concept::Alert) {
        tables.remove("vts_alert_history");
        tables.insert("alerts".to_string());
        tables.insert(rules::BRIDGE_TABLE.to_string());
    }

    // Any multi-table plan over transactional tables joins through the
    // master.
    if tables.len() > 1
        && !tables.contains(rules::BRIDGE_TABLE)
        && tables
            .iter()
            .any(|t| TRANSACTIONAL_TABLES.contains(&t.as_str()))
    {
        tables.insert(rules::BRIDGE_TABLE.to_string());
    }

    // Fallback: scan retrieved example SQL for table mentions.
    if tables.is_empty() {
        for doc in retrieved {
            if let DocumentKind::Example { sql, .. } = &doc.document.kind {
                let sql_lower = sql.to_lowercase();
                for table in rules::KNOWN_TABLES {
                    if sql_lower.contains(table) {
                        tables.insert((*table).to_string());
                    }
                }
            }
        }
    }

    if tables.is_empty() {
        tables.insert("vts_alert_history".to_string());
        tables.insert(rules::BRIDGE_TABLE.to_string());
    }

    debug!(?concepts, ?tables, "concept-based table detection");
    tables.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_alone_maps_to_vehicle_risk_table() {
        let tables = determine_relevant_tables("show vehicles with high risk score", &[]);
        assert!(tables.contains(&"tt_risk_score".to_string()));
        assert!(!tables.contains(&"transporter_risk_score".to_string()));
    }

    #[test]
    fn risk_plus_transporter_switches_tables() {
        let tables = determine_relevant_tables("transporters with highest risk score", &[]);
        assert!(tables.contains(&"transporter_risk_score".to_string()));
        assert!(!tables.contains(&"tt_risk_score".to_string()));
    }

    #[test]
    fn historical_risk_excludes_current_risk_table() {
        let tables =
            determine_relevant_tables("risk score of completed trips last quarter", &[]);
        assert!(tables.contains(&"completed_trips_risk_score".to_string()));
        assert!(!tables.contains(&"tt_risk_score".to_string()));
    }

    #[test]
    fn multiple_fact_tables_pull_in_the_master() {
        let tables =
            determine_relevant_tables("alerts and risk score for each vehicle", &[]);
        assert!(tables.contains(&"vts_truck_master".to_string()));
    }

    #[test]
    fn negative_alert_question_uses_alerts_and_master() {
        let tables =
            determine_relevant_tables("vehicles with no alerts in the last 7 days", &[]);
        assert!(tables.contains(&"alerts".to_string()));
        assert!(tables.contains(&"vts_truck_master".to_string()));
        assert!(!tables.contains(&"vts_alert_history".to_string()));
    }

    #[test]
    fn schema_inquiry_returns_only_named_tables() {
        let tables = determine_relevant_tables("what are the columns in alerts", &[]);
        assert_eq!(tables, vec!["alerts".to_string()]);
    }

    #[test]
    fn no_signal_falls_back_to_default_pair() {
        let tables = determine_relevant_tables("tell me something interesting", &[]);
        assert!(tables.contains(&"vts_alert_history".to_string()));
        assert!(tables.contains(&"vts_truck_master".to_string()));
    }
}
