//! Deterministic query handlers.
//!
//! Each handler recognizes a narrow question shape and emits the query
//! directly, skipping the LLM entirely. Handlers run in a fixed order;
//! the first match wins. A `None` from every handler sends the question
//! on to the cache and the generation loop.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use fleetql_core::models::QuerySource;
use fleetql_retrieval::{extract_vehicle_id, has_negative_intent};
use fleetql_schema::rules::{KNOWN_TABLES, CONCEPT_COLUMNS};

static RE_SPECIFIC_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").unwrap());
static RE_INTERVAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)last\s+(\d+)\s+(hour|day|week|month|year)s?").unwrap()
});
static RE_TEMPORAL_EXCLUSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)last\s+(\d+)\s+(day|week|month|year)s?\s+but\s+not\s+(?:in\s+)?(?:the\s+)?last\s+(\d+)\s+(day|week|month|year)s?",
    )
    .unwrap()
});
static RE_COLUMNS_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:columns?|fields?)\s+(?:are\s+)?(?:in|of|for|does)\s").unwrap()
});
static RE_COMMON_COLUMNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:common|shared|same)\s+columns?").unwrap());
static RE_WHICH_TABLE_STORES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:which|what)\s+tables?\s+(?:stores?|has|have|contains?|holds?)\s+([\w ]+)")
        .unwrap()
});
static RE_FOLLOWED_BY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\w[\w ]*?)\s+(?:alert\s+)?followed\s+by\s+(?:an?\s+)?(\w[\w ]*?)\s+(?:alert\s+)?within\s+(\d+)\s+(minute|hour|day)s?",
    )
    .unwrap()
});
static RE_NO_DATA_DAYS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:not\s+report|no\s+data|stopped\s+reporting|offline).*?(\d+)\s+days?")
        .unwrap()
});

/// Violation-count columns by the phrase that names them, for the
/// correlation template.
const METRIC_COLUMNS: &[(&str, &str)] = &[
    ("stoppage", "stoppage_violations_count"),
    ("route deviation", "route_deviation_count"),
    ("speed", "speed_violation_count"),
    ("night driving", "night_driving_count"),
    ("offline", "device_offline_count"),
    ("tamper", "device_tamper_count"),
    ("continuous driving", "continuous_driving_count"),
    ("no halt", "no_halt_zone_count"),
];

/// SQL plus the handler that produced it.
pub type HandledQuery = (String, QuerySource);

/// Handlers that run before the cache: vehicle timeline, schema
/// catalog, temporal exclusion, negative existence.
pub fn early_handler(question: &str) -> Option<HandledQuery> {
    vehicle_timeline(question)
        .or_else(|| schema_introspection(question))
        .or_else(|| temporal_exclusion(question))
        .or_else(|| negative_existence(question))
}

/// Keyword-matched analytical templates. Run after a cache miss,
/// before the LLM.
pub fn analytical_template(question: &str) -> Option<HandledQuery> {
    performance_improvement(question)
        .or_else(|| correlation(question))
        .or_else(|| month_over_month(question))
        .or_else(|| followed_by_within(question))
        .or_else(|| no_data_reporting(question))
}

/// Timeline of everything recorded for one vehicle. A specific date in
/// the question overrides any relative interval.
fn vehicle_timeline(question: &str) -> Option<HandledQuery> {
    let vehicle_id = extract_vehicle_id(question)?;
    let lower = question.to_lowercase();
    if !["history", "timeline", "details", "report", "activity", "happened"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        return None;
    }

    let (violation_filter, alert_filter) = match RE_SPECIFIC_DATE.captures(question) {
        Some(caps) => {
            let date = &caps[1];
            (
                format!(" AND DATE(vah.vts_end_datetime) = '{date}'"),
                format!(" AND DATE(a.created_at) = '{date}'"),
            )
        }
        None => match RE_INTERVAL.captures(question) {
            Some(caps) => {
                let n = &caps[1];
                let unit = caps[2].to_lowercase();
                (
                    format!(
                        " AND vah.vts_end_datetime >= CURRENT_DATE - INTERVAL '{n} {unit}s'"
                    ),
                    format!(" AND a.created_at >= CURRENT_DATE - INTERVAL '{n} {unit}s'"),
                )
            }
            None => (String::new(), String::new()),
        },
    };

    let sql = format!(
        "SELECT 'violation' AS event_type, vah.violation_type AS detail, \
         vah.vts_end_datetime AS event_time, vah.location_name AS location \
         FROM vts_alert_history vah WHERE vah.tl_number = '{vehicle_id}'{violation_filter} \
         UNION ALL \
         SELECT 'alert' AS event_type, a.alert_type AS detail, \
         a.created_at AS event_time, NULL AS location \
         FROM alerts a WHERE a.vehicle_number = '{vehicle_id}'{alert_filter} \
         ORDER BY event_time DESC"
    );
    debug!(vehicle_id = %vehicle_id, "vehicle timeline handler matched");
    Some((sql, QuerySource::DirectVehicleId))
}

/// Metadata questions answered straight from the catalog. A question
/// that also asks for row data falls through to the LLM.
fn schema_introspection(question: &str) -> Option<HandledQuery> {
    let lower = question.to_lowercase();
    let is_schema_question = lower.contains("what tables")
        || lower.contains("which tables")
        || lower.contains("list tables")
        || lower.contains("structure of")
        || RE_COLUMNS_IN.is_match(&lower)
        || RE_COMMON_COLUMNS.is_match(&lower)
        || RE_WHICH_TABLE_STORES.is_match(&lower);
    if !is_schema_question {
        return None;
    }
    // Compound questions ("what columns ... and show me the top 5")
    // need real data, not just the catalog.
    if ["show me", "list the", "top ", "highest", "count of"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        debug!("compound schema question, deferring to generation");
        return None;
    }

    let named: Vec<&str> = KNOWN_TABLES
        .iter()
        .filter(|t| lower.contains(*t))
        .copied()
        .collect();

    let sql = if RE_COMMON_COLUMNS.is_match(&lower) && named.len() >= 2 {
        format!(
            "SELECT column_name FROM information_schema.columns WHERE table_name = '{}' \
             INTERSECT \
             SELECT column_name FROM information_schema.columns WHERE table_name = '{}'",
            named[0], named[1]
        )
    } else if RE_COLUMNS_IN.is_match(&lower) && !named.is_empty() {
        named
            .iter()
            .map(|t| {
                format!(
                    "SELECT table_name, column_name, ordinal_position \
                     FROM information_schema.columns WHERE table_name = '{t}'"
                )
            })
            .collect::<Vec<_>>()
            .join(" UNION ALL ")
            + " ORDER BY table_name, ordinal_position"
    } else if let Some(caps) = RE_WHICH_TABLE_STORES.captures(&lower) {
        let concept = caps[1].trim().to_string();
        let column: String = CONCEPT_COLUMNS
            .iter()
            .find(|(kw, _)| concept.contains(kw))
            .and_then(|(_, cols)| cols.first())
            .map(|col| (*col).to_string())
            .unwrap_or_else(|| concept.replace(' ', "_"));
        format!(
            "SELECT DISTINCT table_name FROM information_schema.columns \
             WHERE column_name = '{column}' ORDER BY table_name"
        )
    } else {
        "SELECT DISTINCT table_name FROM information_schema.columns ORDER BY table_name"
            .to_string()
    };
    Some((sql, QuerySource::SchemaIntrospection))
}

/// "Active in period A but quiet in period B" over the alert history.
fn temporal_exclusion(question: &str) -> Option<HandledQuery> {
    let caps = RE_TEMPORAL_EXCLUSION.captures(question)?;
    let (outer_n, outer_unit) = (&caps[1], caps[2].to_lowercase());
    let (inner_n, inner_unit) = (&caps[3], caps[4].to_lowercase());
    let sql = format!(
        "SELECT older.tl_number FROM \
         (SELECT DISTINCT tl_number FROM vts_alert_history \
         WHERE vts_end_datetime >= CURRENT_DATE - INTERVAL '{outer_n} {outer_unit}s') older \
         LEFT JOIN \
         (SELECT DISTINCT tl_number FROM vts_alert_history \
         WHERE vts_end_datetime >= CURRENT_DATE - INTERVAL '{inner_n} {inner_unit}s') recent \
         ON older.tl_number = recent.tl_number \
         WHERE recent.tl_number IS NULL"
    );
    Some((sql, QuerySource::TemporalExclusion))
}

/// "Vehicles with no alerts in the last N days" and friends. Starts
/// from the master table so vehicles with zero rows still appear.
fn negative_existence(question: &str) -> Option<HandledQuery> {
    if !has_negative_intent(question) {
        return None;
    }
    let lower = question.to_lowercase();
    if !lower.contains("alert") || !lower.contains("vehicle") {
        return None;
    }
    let caps = RE_INTERVAL.captures(question)?;
    let (n, unit) = (&caps[1], caps[2].to_lowercase());
    let sql = format!(
        "SELECT vtm.truck_no, vtm.transporter_name FROM vts_truck_master vtm \
         WHERE NOT EXISTS (SELECT 1 FROM alerts a \
         WHERE a.vehicle_number = vtm.truck_no \
         AND a.created_at >= CURRENT_DATE - INTERVAL '{n} {unit}s')"
    );
    Some((sql, QuerySource::NegativeExistence))
}

fn performance_improvement(question: &str) -> Option<HandledQuery> {
    let lower = question.to_lowercase();
    if !lower.contains("improv") || !(lower.contains("performance") || lower.contains("risk")) {
        return None;
    }
    let sql = "WITH monthly AS (SELECT vah.tl_number, \
               date_trunc('month', vah.vts_end_datetime) AS month, \
               COUNT(*) AS violations FROM vts_alert_history vah \
               GROUP BY vah.tl_number, date_trunc('month', vah.vts_end_datetime)) \
               SELECT tl_number FROM (SELECT tl_number, violations, \
               LAG(violations) OVER (PARTITION BY tl_number ORDER BY month) AS prev_violations \
               FROM monthly) t \
               WHERE prev_violations IS NOT NULL AND violations < prev_violations"
        .to_string();
    Some((sql, QuerySource::AnalyticalTemplate("performance_improvement".to_string())))
}

fn correlation(question: &str) -> Option<HandledQuery> {
    let lower = question.to_lowercase();
    if !lower.contains("correlation") || !lower.contains("risk") {
        return None;
    }
    let metric = METRIC_COLUMNS
        .iter()
        .find(|(kw, _)| lower.contains(kw))
        .map(|(_, col)| *col)
        .unwrap_or("speed_violation_count");
    let sql = format!(
        "WITH per_vehicle AS (SELECT vah.tl_number, SUM(vah.{metric}) AS metric_total, \
         MAX(trs.risk_score) AS risk FROM vts_alert_history vah \
         JOIN vts_truck_master vtm ON vtm.truck_no = vah.tl_number \
         JOIN tt_risk_score trs ON trs.tt_number = vtm.truck_no \
         GROUP BY vah.tl_number) \
         SELECT corr(metric_total, risk) AS correlation FROM per_vehicle"
    );
    Some((sql, QuerySource::AnalyticalTemplate("correlation".to_string())))
}

fn month_over_month(question: &str) -> Option<HandledQuery> {
    let lower = question.to_lowercase();
    if !lower.contains("month-over-month") && !lower.contains("month over month") {
        return None;
    }
    let sql = "SELECT date_trunc('month', vah.vts_end_datetime) AS month, \
               COUNT(*) AS violations, \
               COUNT(*) - LAG(COUNT(*)) OVER (ORDER BY date_trunc('month', vah.vts_end_datetime)) \
               AS change_from_previous \
               FROM vts_alert_history vah \
               GROUP BY date_trunc('month', vah.vts_end_datetime) \
               ORDER BY month"
        .to_string();
    Some((sql, QuerySource::AnalyticalTemplate("month_over_month".to_string())))
}

/// Event sequences: "tamper followed by offline within 2 hours".
fn followed_by_within(question: &str) -> Option<HandledQuery> {
    let caps = RE_FOLLOWED_BY.captures(question)?;
    let first = last_word(&caps[1]).to_uppercase();
    let second = last_word(&caps[2]).to_uppercase();
    let (n, unit) = (&caps[3], caps[4].to_lowercase());
    let sql = format!(
        "SELECT DISTINCT f.tl_number FROM \
         (SELECT tl_number, vts_end_datetime FROM vts_alert_history \
         WHERE violation_type LIKE '%{first}%') f \
         JOIN \
         (SELECT tl_number, vts_end_datetime FROM vts_alert_history \
         WHERE violation_type LIKE '%{second}%') s \
         ON s.tl_number = f.tl_number \
         AND s.vts_end_datetime > f.vts_end_datetime \
         AND s.vts_end_datetime <= f.vts_end_datetime + INTERVAL '{n} {unit}s'"
    );
    Some((sql, QuerySource::AnalyticalTemplate("followed_by_within".to_string())))
}

/// Vehicles silent for N days across both event streams.
fn no_data_reporting(question: &str) -> Option<HandledQuery> {
    let lower = question.to_lowercase();
    if !(lower.contains("not report") || lower.contains("no data") || lower.contains("offline")) {
        return None;
    }
    let caps = RE_NO_DATA_DAYS.captures(&lower)?;
    let days = &caps[1];
    let sql = format!(
        "SELECT vtm.truck_no, vtm.transporter_name FROM vts_truck_master vtm \
         WHERE NOT EXISTS (SELECT 1 FROM alerts a WHERE a.vehicle_number = vtm.truck_no \
         AND a.created_at >= CURRENT_DATE - INTERVAL '{days} days') \
         AND NOT EXISTS (SELECT 1 FROM vts_alert_history vah \
         WHERE vah.tl_number = vtm.truck_no \
         AND vah.vts_end_datetime >= CURRENT_DATE - INTERVAL '{days} days')"
    );
    Some((sql, QuerySource::AnalyticalTemplate("no_data_reporting".to_string())))
}

fn last_word(phrase: &str) -> &str {
    phrase.trim().rsplit(' ').next().unwrap_or(phrase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_timeline_matches_report_questions() {
        let (sql, source) =
            early_handler("Give me a comprehensive report for MH12AB1234").unwrap();
        assert_eq!(source, QuerySource::DirectVehicleId);
        assert!(sql.contains("'MH12AB1234'"));
        assert!(sql.contains("UNION ALL"));
        assert!(!sql.contains("INTERVAL"));
    }

    #[test]
    fn specific_date_overrides_interval() {
        let (sql, _) = early_handler(
            "What happened with MH12AB1234 on 2026-08-20 in the last 30 days",
        )
        .unwrap();
        assert!(sql.contains("DATE(vah.vts_end_datetime) = '2026-08-20'"));
        assert!(!sql.contains("30 days"));
    }

    #[test]
    fn schema_question_hits_the_catalog() {
        let (sql, source) = early_handler("What tables are in the database?").unwrap();
        assert_eq!(source, QuerySource::SchemaIntrospection);
        assert!(sql.contains("information_schema.columns"));
    }

    #[test]
    fn columns_in_two_tables_uses_union_all() {
        let (sql, _) =
            early_handler("What columns are in alerts and tt_risk_score?").unwrap();
        assert!(sql.contains("UNION ALL"));
        assert!(sql.contains("'alerts'"));
        assert!(sql.contains("'tt_risk_score'"));
    }

    #[test]
    fn common_columns_uses_intersect() {
        let (sql, _) = early_handler(
            "Which common columns do vts_alert_history and vts_truck_master share?",
        )
        .unwrap();
        assert!(sql.contains("INTERSECT"));
    }

    #[test]
    fn compound_schema_question_defers_to_generation() {
        assert!(early_handler(
            "What columns are in alerts and show me the top 5 vehicles by alert count"
        )
        .is_none());
    }

    #[test]
    fn temporal_exclusion_builds_left_join() {
        let (sql, source) = early_handler(
            "Vehicles with violations in the last 6 months but not in the last 3 months",
        )
        .unwrap();
        assert_eq!(source, QuerySource::TemporalExclusion);
        assert!(sql.contains("'6 months'"));
        assert!(sql.contains("'3 months'"));
        assert!(sql.contains("IS NULL"));
    }

    #[test]
    fn negative_existence_starts_from_master() {
        let (sql, source) =
            early_handler("Which vehicles have no alerts in the last 7 days?").unwrap();
        assert_eq!(source, QuerySource::NegativeExistence);
        assert!(sql.starts_with("SELECT vtm.truck_no"));
        assert!(sql.contains("NOT EXISTS"));
    }

    #[test]
    fn followed_by_template_substitutes_interval() {
        let (sql, source) = analytical_template(
            "Vehicles with a tamper alert followed by an offline alert within 2 hours",
        )
        .unwrap();
        assert_eq!(
            source,
            QuerySource::AnalyticalTemplate("followed_by_within".to_string())
        );
        assert!(sql.contains("'%TAMPER%'"));
        assert!(sql.contains("'%OFFLINE%'"));
        assert!(sql.contains("INTERVAL '2 hours'"));
    }

    #[test]
    fn correlation_template_picks_the_metric_column() {
        let (sql, _) = analytical_template(
            "Is there a correlation between stoppage violations and risk score?",
        )
        .unwrap();
        assert!(sql.contains("stoppage_violations_count"));
        assert!(sql.contains("corr("));
    }

    #[test]
    fn plain_questions_match_no_handler() {
        assert!(early_handler("Show blacklisted vehicles").is_none());
        assert!(analytical_template("Show blacklisted vehicles").is_none());
    }
}
