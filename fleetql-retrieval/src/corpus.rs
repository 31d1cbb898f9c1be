//! Seed corpus and indexing.
//!
//! Schema snippets, worked examples, and the business rules text that
//! feed the retriever. Indexing is idempotent: document ids are content
//! hashes, so re-running it rewrites the same rows.

use std::sync::Arc;

use tracing::info;

use fleetql_core::documents::{Document, DocumentKind};
use fleetql_core::errors::{FleetqlResult, RetrievalError};
use fleetql_core::models::QaExample;
use fleetql_core::traits::{IDatastore, IEmbeddingProvider};

/// Per-table schema descriptions used both as corpus documents and as
/// the focused-schema prompt section.
pub const SCHEMA_DESCRIPTIONS: &[(&str, &str)] = &[
    (
        "vts_alert_history",
        "Historical record of trip violations. Columns: tl_number (vehicle id, joins to \
         vts_truck_master.truck_no), violation_type (text array, use 'X' = ANY(violation_type)), \
         vts_end_datetime (canonical time column), location_name, stoppage_violations_count, \
         route_deviation_count, speed_violation_count, night_driving_count, device_offline_count, \
         device_tamper_count, continuous_driving_count, no_halt_zone_count, \
         main_supply_removal_count.",
    ),
    (
        "vts_truck_master",
        "Master list of every truck. Columns: truck_no (primary vehicle id), transporter_name, \
         transporter_code, whether_truck_blacklisted ('Y' or 'N'), capacity_of_the_truck, zone, \
         region, ownership.",
    ),
    (
        "vts_ongoing_trips",
        "Currently active trips. Columns: tt_number (vehicle id, joins to truck_no), driver_name \
         (the ONLY table with driver info), violation_type (plain varchar, use equality not ANY), \
         vehicle_location, invoice_number.",
    ),
    (
        "alerts",
        "Live alert stream. Columns: vehicle_number (joins to truck_no), alert_type, created_at \
         (canonical time column), vehicle_unblocked_date.",
    ),
    (
        "tt_risk_score",
        "Current per-vehicle risk. Columns: tt_number (vehicle id), risk_score (high risk means \
         risk_score > 50).",
    ),
    (
        "transporter_risk_score",
        "Current per-transporter risk. Columns: transporter_name, risk_score.",
    ),
    (
        "completed_trips_risk_score",
        "Risk of finished trips, for historical analysis. Columns: tt_number, risk_score, \
         trip_end_date.",
    ),
    (
        "vts_tripauditmaster",
        "Trip audit trail. Columns: tt_number, audit_status, audited_at.",
    ),
];

/// Business rules text stored as one corpus document.
pub const BUSINESS_RULES: &str = "\
Join conventions: vtm.truck_no = vah.tl_number, vtm.truck_no = vot.tt_number, \
vtm.truck_no = a.vehicle_number, vtm.truck_no = trs.tt_number. \
Never join fact tables to each other directly; always bridge through vts_truck_master. \
Blacklist status lives in vts_truck_master.whether_truck_blacklisted ('Y'/'N'). \
High risk means risk_score > 50 in tt_risk_score; transporter risk lives in \
transporter_risk_score. Negative questions ('no alerts', 'not generated') must use \
NOT EXISTS or LEFT JOIN ... IS NULL starting from vts_truck_master. \
Do not add implicit date filters; only filter time when the question names a period.";

/// Curated seed examples. Runtime-learned examples are appended by the
/// cache layer.
pub fn seed_examples() -> Vec<QaExample> {
    [
        (
            "show blacklisted vehicles with their transporter names",
            "SELECT truck_no, transporter_name FROM vts_truck_master \
             WHERE whether_truck_blacklisted = 'Y'",
            "simple_filter",
        ),
        (
            "list vehicles that are not blacklisted",
            "SELECT truck_no FROM vts_truck_master WHERE whether_truck_blacklisted = 'N'",
            "simple_filter",
        ),
        (
            "show vehicles with high risk score",
            "SELECT trs.tt_number, trs.risk_score FROM tt_risk_score trs \
             WHERE trs.risk_score > 50 ORDER BY trs.risk_score DESC",
            "risk",
        ),
        (
            "which transporters have the highest risk score",
            "SELECT transporter_name, risk_score FROM transporter_risk_score \
             ORDER BY risk_score DESC LIMIT 10",
            "risk",
        ),
        (
            "vehicles with no alerts in the last 7 days",
            "SELECT vtm.truck_no, vtm.transporter_name FROM vts_truck_master vtm \
             WHERE NOT EXISTS (SELECT 1 FROM alerts a \
             WHERE a.vehicle_number = vtm.truck_no \
             AND a.created_at >= CURRENT_DATE - INTERVAL '7 days')",
            "negative_existence",
        ),
        (
            "vehicles with violations in the last 6 months but not in the last 3 months",
            "SELECT older.tl_number FROM (SELECT DISTINCT tl_number FROM vts_alert_history \
             WHERE vts_end_datetime >= CURRENT_DATE - INTERVAL '6 months') older \
             LEFT JOIN (SELECT DISTINCT tl_number FROM vts_alert_history \
             WHERE vts_end_datetime >= CURRENT_DATE - INTERVAL '3 months') recent \
             ON older.tl_number = recent.tl_number WHERE recent.tl_number IS NULL",
            "temporal_exclusion",
        ),
        (
            "count alerts per vehicle in the last 30 days",
            "SELECT a.vehicle_number, COUNT(*) AS alert_count FROM alerts a \
             WHERE a.created_at >= CURRENT_DATE - INTERVAL '30 days' \
             GROUP BY a.vehicle_number ORDER BY alert_count DESC",
            "aggregation",
        ),
        (
            "which vehicles had speed violations",
            "SELECT DISTINCT vah.tl_number FROM vts_alert_history vah \
             WHERE 'SPEED' = ANY(vah.violation_type)",
            "violation",
        ),
        (
            "drivers currently on a trip with a route deviation",
            "SELECT vot.driver_name, vot.tt_number FROM vts_ongoing_trips vot \
             WHERE vot.violation_type = 'RD'",
            "live_status",
        ),
        (
            "correlation between stoppage_violations and risk score",
            "WITH correlation_analysis AS (SELECT vah.tl_number, \
             SUM(vah.stoppage_violations_count) AS stoppages, MAX(trs.risk_score) AS risk \
             FROM vts_alert_history vah \
             JOIN vts_truck_master vtm ON vtm.truck_no = vah.tl_number \
             JOIN tt_risk_score trs ON trs.tt_number = vtm.truck_no \
             GROUP BY vah.tl_number) \
             SELECT corr(stoppages, risk) AS correlation FROM correlation_analysis",
            "analytical",
        ),
        (
            "vehicles whose alerts are decreasing and risk increasing month-over-month",
            "WITH monthly AS (SELECT vah.tl_number, \
             date_trunc('month', vah.vts_end_datetime) AS month, COUNT(*) AS alerts, \
             MAX(trs.risk_score) AS risk FROM vts_alert_history vah \
             JOIN vts_truck_master vtm ON vtm.truck_no = vah.tl_number \
             JOIN tt_risk_score trs ON trs.tt_number = vtm.truck_no \
             GROUP BY vah.tl_number, date_trunc('month', vah.vts_end_datetime)) \
             SELECT tl_number FROM (SELECT tl_number, alerts, \
             LAG(alerts) OVER (PARTITION BY tl_number ORDER BY month) AS prev_month_alerts, \
             risk, LAG(risk) OVER (PARTITION BY tl_number ORDER BY month) AS prev_month_risk \
             FROM monthly) trends \
             WHERE alerts < prev_month_alerts AND risk > prev_month_risk",
            "analytical",
        ),
        (
            "vehicles with a tamper alert followed by an offline alert within 2 hours",
            "SELECT DISTINCT t.tl_number FROM (SELECT vah.tl_number, vah.vts_end_datetime \
             FROM vts_alert_history vah WHERE 'TAMPER' = ANY(vah.violation_type)) t \
             JOIN (SELECT vah.tl_number, vah.vts_end_datetime AS tamper_followed_by_offline \
             FROM vts_alert_history vah WHERE 'OFFLINE' = ANY(vah.violation_type)) o \
             ON o.tl_number = t.tl_number \
             AND o.tamper_followed_by_offline BETWEEN t.vts_end_datetime \
             AND t.vts_end_datetime + INTERVAL '2 hours'",
            "sequential",
        ),
        (
            "average capacity of trucks per transporter",
            "SELECT transporter_name, AVG(capacity_of_the_truck) AS avg_capacity \
             FROM vts_truck_master GROUP BY transporter_name",
            "aggregation",
        ),
    ]
    .into_iter()
    .map(|(question, sql, query_type)| QaExample::new(question, sql, query_type))
    .collect()
}

/// Build the full seed document set: one schema document per table, one
/// example document per QA pair, one rules document.
pub fn build_documents(extra_examples: &[QaExample]) -> Vec<Document> {
    let mut documents = Vec::new();
    for (table, description) in SCHEMA_DESCRIPTIONS {
        documents.push(Document::new(
            format!("Table {table}: {description}"),
            DocumentKind::Schema {
                table: (*table).to_string(),
            },
        ));
    }
    for qa in seed_examples().iter().chain(extra_examples.iter()) {
        documents.push(Document::new(
            format!("QUESTION: {}\nSQL: {}", qa.question, qa.sql),
            DocumentKind::Example {
                question: qa.question.clone(),
                sql: qa.sql.clone(),
            },
        ));
    }
    documents.push(Document::new(BUSINESS_RULES, DocumentKind::Rules));
    documents
}

/// Embed and upsert the corpus into the datastore.
pub fn index_corpus(
    datastore: &dyn IDatastore,
    embedder: &Arc<dyn IEmbeddingProvider>,
    extra_examples: &[QaExample],
) -> FleetqlResult<usize> {
    let mut documents = build_documents(extra_examples);
    for doc in documents.iter_mut() {
        doc.embedding = embedder.embed(doc.retrieval_text()).map_err(|e| {
            RetrievalError::IndexingFailed {
                reason: format!("embedding corpus document failed: {e}"),
            }
        })?;
        datastore.upsert_document(doc)?;
    }
    info!(documents = documents.len(), "corpus indexed");
    Ok(documents.len())
}
