//! Intent templates.
//!
//! When a question matches a known intent, retrieval prepends a
//! synthetic highest-priority document carrying a recommended SQL
//! skeleton and join hint, so the model starts from proven structure.

use std::sync::LazyLock;

use regex::Regex;

use fleetql_core::documents::{Document, DocumentKind};

static RE_VEHICLE_HISTORY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:history|timeline|all activity|everything)\s+(?:for|of|about)\s+").unwrap()
});
static RE_TEMPORAL_EXCLUSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"last\s+\d+\s+\w+\s+but\s+not\s+(?:in\s+)?(?:the\s+)?last\s+\d+\s+\w+").unwrap()
});

struct IntentTemplate {
    intent: &'static str,
    regex: &'static LazyLock<Regex>,
    skeleton: &'static str,
    hint: &'static str,
}

static TEMPLATES: &[IntentTemplate] = &[
    IntentTemplate {
        intent: "vehicle_history",
        regex: &RE_VEHICLE_HISTORY,
        skeleton: "SELECT vah.tl_number, vah.violation_type, vah.vts_end_datetime \
                   FROM vts_alert_history vah \
                   JOIN vts_truck_master vtm ON vtm.truck_no = vah.tl_number \
                   WHERE vah.tl_number = '<VEHICLE_ID>' \
                   ORDER BY vah.vts_end_datetime DESC",
        hint: "Vehicle history joins through vts_truck_master (vtm.truck_no = vah.tl_number).",
    },
    IntentTemplate {
        intent: "temporal_exclusion",
        regex: &RE_TEMPORAL_EXCLUSION,
        skeleton: "SELECT older.tl_number FROM (SELECT DISTINCT tl_number FROM vts_alert_history \
                   WHERE vts_end_datetime >= CURRENT_DATE - INTERVAL '<LONG PERIOD>') older \
                   LEFT JOIN (SELECT DISTINCT tl_number FROM vts_alert_history \
                   WHERE vts_end_datetime >= CURRENT_DATE - INTERVAL '<SHORT PERIOD>') recent \
                   ON older.tl_number = recent.tl_number \
                   WHERE recent.tl_number IS NULL",
        hint: "Period-A-but-not-period-B requires a LEFT JOIN ... IS NULL exclusion, never a \
               plain date range.",
    },
];

/// Synthetic guidance document for the question's intent, if any
/// template matches. The caller prepends it to the candidate set.
pub fn match_intent(normalized_question: &str) -> Option<Document> {
    TEMPLATES
        .iter()
        .find(|t| t.regex.is_match(normalized_question))
        .map(|t| {
            Document::new(
                format!("Recommended pattern: {}\n{}", t.hint, t.skeleton),
                DocumentKind::TemplateGuidance {
                    intent: t.intent.to_string(),
                    sql_skeleton: t.skeleton.to_string(),
                },
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_history_intent_matches() {
        let doc = match_intent("show the history for rj19gd6553").unwrap();
        match doc.kind {
            DocumentKind::TemplateGuidance { intent, .. } => {
                assert_eq!(intent, "vehicle_history")
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn temporal_exclusion_intent_matches() {
        let doc =
            match_intent("vehicles with violations in the last 6 months but not last 3 months");
        assert!(doc.is_some());
    }

    #[test]
    fn plain_question_has_no_intent() {
        assert!(match_intent("show blacklisted vehicles").is_none());
    }
}
