//! Question normalization and intent probes.
//!
//! Normalization runs before every cache lookup, retrieval, and
//! deterministic handler, so the rewrites here are the single place
//! where informal phrasing is mapped onto the domain vocabulary.

use std::sync::LazyLock;

use regex::Regex;

/// Ordered synonym rewrites applied to the lowercased question. Order
/// matters: longer phrases must fire before their substrings.
static SYNONYM_REWRITES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // Informal time phrases to extractable "last N unit" form.
        (r"\byesterday\b", "in the last 1 day"),
        (r"\btoday\b", "in the last 1 day"),
        (r"\bthis week\b", "in the last 7 days"),
        (r"\bthis month\b", "in the last 1 month"),
        (r"\bpast\s+(\d+)\s+", "last $1 "),
        (r"\bprevious\s+(\d+)\s+", "last $1 "),
        // Blacklist phrasing to the concrete predicate vocabulary.
        (r"\bnot\s+blacklisted\b", "whether_truck_blacklisted = 'N'"),
        (r"\bbanned\b", "blacklisted"),
        // Vehicle vocabulary.
        (r"\btrucks\b", "vehicles"),
        (r"\blorries\b", "vehicles"),
        (r"\bfull details\b", "comprehensive report"),
        (r"\ball details\b", "comprehensive report"),
        (r"\bcomplete details\s+(?:for|of)\b", "comprehensive report for"),
        (r"\bdetails\s+(?:for|of)\s+([a-z]{2}\d{1,2}[a-z]{1,2}\d{4})\b", "comprehensive report for $1"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
    .collect()
});

static RE_VEHICLE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{2}\d{1,2}[A-Z]{1,2}\d{4})\b").unwrap());
static RE_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+)\b").unwrap());

/// Keywords implying the question asks for absence of records.
const NEGATIVE_INTENT_KEYWORDS: &[&str] = &[
    "not generated",
    "no alerts",
    "without",
    "never had",
    "no data",
    "not reported",
];

/// Lowercase, strip the trailing question mark, and apply the synonym
/// rewrite table in order.
pub fn normalize_question(question: &str) -> String {
    let mut normalized = question.trim().to_lowercase();
    normalized = normalized.trim_end_matches('?').trim().to_string();
    for (regex, replacement) in SYNONYM_REWRITES.iter() {
        normalized = regex.replace_all(&normalized, *replacement).into_owned();
    }
    normalized
}

/// Whether the question implies "none/without/never" semantics.
pub fn has_negative_intent(question: &str) -> bool {
    let lower = question.to_lowercase();
    NEGATIVE_INTENT_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Vehicle registration ID mentioned in the question, if any. The match
/// runs against the uppercased text so casing does not matter.
pub fn extract_vehicle_id(question: &str) -> Option<String> {
    RE_VEHICLE_ID
        .captures(&question.to_uppercase())
        .map(|caps| caps[1].to_string())
}

/// Literal parameters in question order: vehicle IDs first, then bare
/// numbers that are not part of a vehicle ID.
pub fn extract_parameters(question: &str) -> Vec<String> {
    let upper = question.to_uppercase();
    let mut params: Vec<String> = Vec::new();
    let mut covered: Vec<(usize, usize)> = Vec::new();

    for m in RE_VEHICLE_ID.find_iter(&upper) {
        params.push(m.as_str().to_string());
        covered.push((m.start(), m.end()));
    }
    for m in RE_NUMBER.find_iter(&upper) {
        let inside_vehicle_id = covered
            .iter()
            .any(|(start, end)| m.start() >= *start && m.end() <= *end);
        if !inside_vehicle_id {
            params.push(m.as_str().to_string());
        }
    }
    params
}

/// Rough complexity score used to pick the generation strategy. Counts
/// analytical constructs; multi-table and multi-step questions score
/// higher.
pub fn estimate_complexity(question: &str) -> u32 {
    let lower = question.to_lowercase();
    let mut score = 0u32;

    const WEIGHTED: &[(&str, u32)] = &[
        ("correlation", 3),
        ("month-over-month", 3),
        ("followed by", 3),
        ("but not", 2),
        ("compare", 2),
        ("trend", 2),
        ("average", 1),
        ("highest", 1),
        ("lowest", 1),
        ("top", 1),
        ("each", 1),
        ("per ", 1),
        ("group", 1),
        (" and ", 1),
    ];
    for (keyword, weight) in WEIGHTED {
        if lower.contains(keyword) {
            score += weight;
        }
    }
    if has_negative_intent(&lower) {
        score += 2;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_question_mark_and_lowercase() {
        assert_eq!(
            normalize_question("Show Blacklisted Vehicles?"),
            "show blacklisted vehicles"
        );
    }

    #[test]
    fn rewrites_time_phrases() {
        let n = normalize_question("alerts generated yesterday");
        assert!(n.contains("in the last 1 day"), "{n}");
    }

    #[test]
    fn rewrites_not_blacklisted_to_predicate() {
        let n = normalize_question("vehicles that are not blacklisted");
        assert!(n.contains("whether_truck_blacklisted = 'N'"), "{n}");
    }

    #[test]
    fn detects_negative_intent() {
        assert!(has_negative_intent("vehicles with no alerts in last 7 days"));
        assert!(!has_negative_intent("vehicles with alerts today"));
    }

    #[test]
    fn extracts_vehicle_id_case_insensitively() {
        assert_eq!(
            extract_vehicle_id("details for rj19gd6553"),
            Some("RJ19GD6553".to_string())
        );
        assert_eq!(extract_vehicle_id("show all vehicles"), None);
    }

    #[test]
    fn parameters_keep_order_and_skip_id_digits() {
        let params = extract_parameters("alerts for RJ19GD6553 in last 30 days");
        assert_eq!(params, vec!["RJ19GD6553".to_string(), "30".to_string()]);
    }

    #[test]
    fn complexity_ranks_analytical_questions_higher() {
        let simple = estimate_complexity("show blacklisted vehicles");
        let complex = estimate_complexity(
            "correlation between stoppage_violations and risk score month-over-month per transporter",
        );
        assert!(complex > simple);
        assert!(complex > 5);
    }
}
