//! Domain rule tables consumed by the validator and the retriever.
//!
//! Kept as plain data so the rules can be tested without driving the
//! whole pipeline.

/// Tables the fleet schema exposes. Introspection is limited to these.
pub const KNOWN_TABLES: &[&str] = &[
    "vts_alert_history",
    "vts_truck_master",
    "vts_ongoing_trips",
    "alerts",
    "vts_tripauditmaster",
    "tt_risk_score",
    "transporter_risk_score",
    "completed_trips_risk_score",
];

/// Canonical alias for each table, used in prompts and suggestions.
pub const TABLE_ALIASES: &[(&str, &str)] = &[
    ("vts_alert_history", "vah"),
    ("vts_truck_master", "vtm"),
    ("vts_ongoing_trips", "vot"),
    ("alerts", "a"),
    ("tt_risk_score", "trs"),
    ("vts_tripauditmaster", "tam"),
];

/// Aliases that may appear in queries without being table names.
pub const KNOWN_ALIAS_NAMES: &[&str] = &["vah", "vtm", "vot", "a", "trs", "tam", "md"];

/// Column references models hallucinate often enough to reject by name,
/// each paired with the real column.
pub const KNOWN_WRONG_COLUMNS: &[(&str, &str)] = &[
    ("vah.vehicle_number", "vah.tl_number"),
    ("a.device_tamper_count", "vah.device_tamper_count"),
    ("a.device_offline_count", "vah.device_offline_count"),
    ("vtm.blacklist", "vtm.whether_truck_blacklisted"),
    ("blacklisted", "whether_truck_blacklisted"),
    ("is_blacklisted", "whether_truck_blacklisted"),
    ("violation_types", "violation_type"),
    ("capacity", "capacity_of_the_truck"),
];

/// Table pairs that must not be joined directly. Joining these fact
/// tables without the bridge produces Cartesian-product results.
pub const FORBIDDEN_JOINS: &[(&str, &str)] = &[
    ("vts_alert_history", "alerts"),
    ("vts_alert_history", "vts_ongoing_trips"),
    ("alerts", "vts_ongoing_trips"),
];

/// The master table whose presence legitimizes a forbidden pair.
pub const BRIDGE_TABLE: &str = "vts_truck_master";

/// Statement keywords that make a query mutating. The system is
/// read-only.
pub const DANGEROUS_OPS: &[&str] = &["delete", "update", "insert", "drop", "alter", "truncate"];

/// Domain concept to plausible column names, for suggestion building.
pub const CONCEPT_COLUMNS: &[(&str, &[&str])] = &[
    (
        "vehicle",
        &["tt_number", "tl_number", "truck_no", "vehicle_number", "trucknumber"],
    ),
    ("blacklist", &["whether_truck_blacklisted"]),
    ("blacklisted", &["whether_truck_blacklisted"]),
    ("transporter", &["transporter_name", "transporter_code"]),
    ("location", &["location_name", "vehicle_location"]),
    ("datetime", &["created_at", "vts_end_datetime", "createdat"]),
    ("invoice", &["invoice_number", "invoicenumber", "invoice_no"]),
    ("risk", &["risk_score"]),
];

/// Canonical timestamp column per table, used by the post-execution
/// sanity checks.
pub const CANONICAL_TIME_COLUMNS: &[(&str, &str)] = &[
    ("vts_alert_history", "vts_end_datetime"),
    ("alerts", "created_at"),
];

/// SQL keywords filtered out when scanning a statement for identifiers.
pub const SQL_KEYWORDS: &[&str] = &[
    "select", "from", "where", "join", "on", "group", "by", "having", "order", "limit",
    "distinct", "as", "and", "or", "not", "in", "exists", "between", "like", "ilike", "case",
    "when", "then", "else", "end", "union", "all", "desc", "asc", "is", "null", "lateral",
    "unnest", "left", "right", "inner", "outer", "interval", "current_date", "now", "any",
    "true", "false",
];

/// Alias for a table name, falling back to its first three characters.
pub fn alias_for(table: &str) -> String {
    TABLE_ALIASES
        .iter()
        .find(|(t, _)| *t == table)
        .map(|(_, a)| (*a).to_string())
        .unwrap_or_else(|| table.chars().take(3).collect())
}

/// Table for a known alias, if any.
pub fn table_for_alias(alias: &str) -> Option<&'static str> {
    TABLE_ALIASES
        .iter()
        .find(|(_, a)| *a == alias)
        .map(|(t, _)| *t)
}
