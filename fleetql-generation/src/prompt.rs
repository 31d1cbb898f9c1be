//! Prompt construction.
//!
//! Two strategies share a skeleton: FEW-SHOT leans on retrieved worked
//! examples and a focused schema; FULL-CONTEXT dumps every schema table
//! and the business rules for questions the focused prompt keeps
//! getting wrong. Retry prompts append the failed SQL, the validator's
//! feedback, and a targeted fix instruction.

use std::fmt::Write as _;

use fleetql_core::documents::DocumentKind;
use fleetql_core::models::GenerationAttempt;
use fleetql_retrieval::corpus::SCHEMA_DESCRIPTIONS;
use fleetql_retrieval::ScoredDocument;

/// Which prompt shape to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStrategy {
    FewShot,
    FullContext,
}

const CRITICAL_INSTRUCTIONS: &str = "\
CRITICAL INSTRUCTIONS:
1. Return ONLY a single PostgreSQL SELECT statement. No explanation, no markdown.
2. Use ONLY tables and columns shown in the schema below. Never invent names.
3. The vehicle id column differs per table: truck_no in vts_truck_master, \
tl_number in vts_alert_history, tt_number in vts_ongoing_trips and tt_risk_score, \
vehicle_number in alerts.
4. Never join vts_alert_history, alerts, or vts_ongoing_trips to each other \
directly. Join each of them to vts_truck_master instead.
5. Blacklist status is vts_truck_master.whether_truck_blacklisted with values \
'Y' and 'N'. There is no column named blacklisted, is_blacklisted, or blocked.
6. vts_alert_history.violation_type is a text array: use 'X' = ANY(violation_type). \
vts_ongoing_trips.violation_type is plain text: use equality.
7. Every non-aggregated SELECT column must appear in GROUP BY.
8. Do not add date filters the question does not ask for.
9. For 'no X' / 'not generated' / 'without' questions, start from vts_truck_master \
and use NOT EXISTS or LEFT JOIN ... IS NULL.
10. Driver information exists only in vts_ongoing_trips.driver_name.
11. Use explicit JOIN ... ON syntax, never comma joins.";

const SCHEMA_HINTS: &str = "\
COLUMN NAME TRANSLATIONS (wrong -> right):
vah.vehicle_number -> vah.tl_number
blacklisted, is_blacklisted, blocked -> whether_truck_blacklisted ('Y'/'N')
capacity -> capacity_of_the_truck
violation_types -> violation_type

SEMANTIC DEFINITIONS:
'high risk' means risk_score > 50.
'recent' without a number means the last 7 days.
Time columns: vts_alert_history.vts_end_datetime, alerts.created_at.";

const DRIVER_RULE: &str = "\
DRIVER RULE: driver_name exists ONLY in vts_ongoing_trips. To relate drivers to \
alerts or risk, join vts_ongoing_trips to vts_truck_master on tt_number = truck_no \
first.";

/// Build the generation prompt for one attempt.
pub fn build_prompt(
    question: &str,
    strategy: PromptStrategy,
    context: &[ScoredDocument],
    relevant_tables: &[String],
    history: &[GenerationAttempt],
) -> String {
    let mut prompt = String::with_capacity(4096);
    prompt.push_str(
        "You are an expert PostgreSQL analyst for a vehicle tracking system.\n\n",
    );
    prompt.push_str(CRITICAL_INSTRUCTIONS);
    prompt.push_str("\n\n");

    prompt.push_str("SCHEMA:\n");
    for (table, description) in SCHEMA_DESCRIPTIONS {
        let relevant = match strategy {
            PromptStrategy::FullContext => true,
            PromptStrategy::FewShot => {
                relevant_tables.is_empty() || relevant_tables.iter().any(|t| t == table)
            }
        };
        if relevant {
            let _ = writeln!(prompt, "- {table}: {description}");
        }
    }
    prompt.push('\n');
    prompt.push_str(SCHEMA_HINTS);
    prompt.push_str("\n\n");

    if question.to_lowercase().contains("driver") {
        prompt.push_str(DRIVER_RULE);
        prompt.push_str("\n\n");
    }

    push_context(&mut prompt, strategy, context);
    push_error_feedback(&mut prompt, history);

    let _ = write!(prompt, "QUESTION: {question}\n\nSQL:");
    prompt
}

fn push_context(prompt: &mut String, strategy: PromptStrategy, context: &[ScoredDocument]) {
    let examples: Vec<&ScoredDocument> = context
        .iter()
        .filter(|d| d.document.kind.example_sql().is_some())
        .collect();
    if !examples.is_empty() {
        prompt.push_str("EXAMPLES OF CORRECT QUERIES:\n");
        for scored in &examples {
            let _ = writeln!(prompt, "{}\n", scored.document.text);
        }
    }
    if strategy == PromptStrategy::FullContext {
        for scored in context {
            if matches!(scored.document.kind, DocumentKind::Rules) {
                let _ = writeln!(prompt, "BUSINESS RULES:\n{}\n", scored.document.text);
            }
        }
    }
}

/// Append failure feedback from earlier attempts in this invocation.
/// When the same class of error repeats the instruction escalates from
/// "fix" to "rewrite from scratch".
fn push_error_feedback(prompt: &mut String, history: &[GenerationAttempt]) {
    let Some(last) = history.last() else {
        return;
    };
    let Some(error) = &last.validation_error else {
        return;
    };

    prompt.push_str("YOUR PREVIOUS ATTEMPT FAILED.\n");
    let _ = writeln!(prompt, "Failed SQL:\n{}\n", last.resulting_sql);
    let _ = writeln!(prompt, "Error: {error}\n");
    let _ = writeln!(prompt, "Fix instruction: {}", fix_instruction(error));

    let repeats = history
        .iter()
        .filter(|a| a.validation_error.as_deref() == Some(error.as_str()))
        .count();
    if repeats > 1 {
        prompt.push_str(
            "You made this exact mistake before. Discard your previous approach \
             entirely and write a structurally different query.\n",
        );
    }
    prompt.push('\n');
}

/// Targeted instruction derived from the validator's feedback text.
fn fix_instruction(error: &str) -> &'static str {
    let lower = error.to_lowercase();
    if lower.contains("does not exist") || lower.contains("no such column") {
        "Replace the nonexistent column with one from the schema above, checking \
         the column name translations."
    } else if lower.contains("group by") {
        "Add every non-aggregated SELECT column to the GROUP BY clause."
    } else if lower.contains("join") && lower.contains("directly") {
        "Remove the direct join between fact tables and route both through \
         vts_truck_master."
    } else if lower.contains("missing from-clause") || lower.contains("alias") {
        "Add the missing table to the FROM clause or fix the alias reference."
    } else if lower.contains("array") || lower.contains("any(") {
        "Use 'VALUE' = ANY(violation_type) for vts_alert_history and plain \
         equality for vts_ongoing_trips."
    } else if lower.contains("timestamp") || lower.contains("date") {
        "Compare timestamp columns against CURRENT_DATE - INTERVAL 'N units', \
         not against integers."
    } else {
        "Re-read the schema section and rewrite the query using only listed \
         tables and columns."
    }
}
