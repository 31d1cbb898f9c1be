//! Natural-language answer synthesis.

use std::fmt::Write as _;

use tracing::warn;

use fleetql_core::models::ExecutionResult;
use fleetql_core::traits::ILlmProvider;

/// Rows shown to the synthesis model. Enough to answer, small enough
/// that the model cannot wander.
const MAX_SYNTHESIS_ROWS: usize = 5;

/// Turn result rows into a short prose answer. An empty result short
/// circuits; an unreachable model degrades to a counted summary.
pub fn synthesize_answer(
    llm: &dyn ILlmProvider,
    model: &str,
    question: &str,
    result: &ExecutionResult,
) -> String {
    if result.is_empty() {
        return format!("No information was found for your request: '{question}'");
    }

    let prompt = synthesis_prompt(question, result);
    match llm.generate(model, &prompt) {
        Ok(answer) if !answer.trim().is_empty() => answer.trim().to_string(),
        Ok(_) => fallback_answer(result),
        Err(e) => {
            warn!(error = %e, "answer synthesis unavailable, using summary");
            fallback_answer(result)
        }
    }
}

fn synthesis_prompt(question: &str, result: &ExecutionResult) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str(
        "You are a fleet data analyst. Answer the question in one or two plain \
         sentences using ONLY the data below. Do not mention SQL, tables, or \
         columns. Do not invent numbers.\n\n",
    );
    let _ = writeln!(prompt, "QUESTION: {question}");
    let _ = writeln!(prompt, "TOTAL MATCHING ROWS: {}", result.count);
    prompt.push_str("DATA (first rows):\n");
    for row in result.rows.iter().take(MAX_SYNTHESIS_ROWS) {
        let _ = writeln!(prompt, "{row}");
    }
    prompt.push_str("\nANSWER:");
    prompt
}

fn fallback_answer(result: &ExecutionResult) -> String {
    let mut answer = format!("Found {} matching record(s).", result.count);
    if let Some(first) = result.rows.first() {
        let _ = write!(answer, " First result: {first}");
    }
    answer
}
