//! Multi-model generation loop.
//!
//! Tries each configured model up to `max_retries` times, validating
//! every candidate and threading the validator's feedback into the next
//! prompt. Per-model counters feed the benchmark report.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use fleetql_core::constants::FAILED_GENERATION_SQL;
use fleetql_core::models::{GenerationAttempt, GenerationOutcome, ModelStats};
use fleetql_core::traits::ILlmProvider;
use fleetql_retrieval::ScoredDocument;
use fleetql_schema::SqlValidator;

use crate::fixes::clean_response;
use crate::prompt::{build_prompt, PromptStrategy};

/// One `generate` call's inputs beyond the question itself.
pub struct GenerationRequest<'a> {
    pub question: &'a str,
    pub strategy: PromptStrategy,
    pub context: &'a [ScoredDocument],
    pub relevant_tables: &'a [String],
    /// Try this model first when set.
    pub preferred_model: Option<&'a str>,
    /// Whether to fall through to the remaining models.
    pub allow_fallback: bool,
    /// Hard wall-clock cutoff for the whole loop.
    pub deadline: Option<Instant>,
    /// A failure from outside the loop (execution error, sanity check)
    /// to feed into the first prompt as retry feedback.
    pub failed_attempt: Option<GenerationAttempt>,
}

pub struct GenerationOrchestrator {
    llm: Arc<dyn ILlmProvider>,
    validator: Arc<SqlValidator>,
    models: Vec<String>,
    max_retries: usize,
    stats: DashMap<String, ModelStats>,
}

impl GenerationOrchestrator {
    pub fn new(
        llm: Arc<dyn ILlmProvider>,
        validator: Arc<SqlValidator>,
        models: Vec<String>,
        max_retries: usize,
    ) -> Self {
        Self {
            llm,
            validator,
            models,
            max_retries: max_retries.max(1),
            stats: DashMap::new(),
        }
    }

    /// Run the model ladder until a candidate validates. Infrastructure
    /// failures move to the next model; validation failures retry the
    /// same model with feedback. Exhaustion returns the failure sentinel.
    pub fn generate(&self, request: &GenerationRequest<'_>) -> GenerationOutcome {
        let models = self.model_order(request.preferred_model, request.allow_fallback);
        let mut history: Vec<GenerationAttempt> = Vec::new();
        history.extend(request.failed_attempt.clone());
        let mut last_model = String::new();

        for model in &models {
            for attempt_number in 1..=self.max_retries {
                if deadline_passed(request.deadline) {
                    warn!(model = %model, "generation deadline reached");
                    return GenerationOutcome::failure(FAILED_GENERATION_SQL, model.clone());
                }
                last_model = model.clone();

                let prompt = build_prompt(
                    request.question,
                    request.strategy,
                    request.context,
                    request.relevant_tables,
                    &history,
                );
                let started = Instant::now();
                self.bump(model, |s| s.attempts += 1);

                let raw = match self.llm.generate(model, &prompt) {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!(model = %model, error = %e, "model unreachable, moving on");
                        self.bump(model, |s| s.failures += 1);
                        break;
                    }
                };

                let sql = clean_response(&raw);
                let error = if sql.is_empty() {
                    Some("response contained no SELECT statement".to_string())
                } else {
                    match self.validator.validate(&sql) {
                        Ok(verdict) if verdict.valid => None,
                        Ok(verdict) => Some(verdict.message),
                        Err(e) => {
                            warn!(model = %model, error = %e, "validation unavailable");
                            self.bump(model, |s| s.failures += 1);
                            break;
                        }
                    }
                };

                match error {
                    None => {
                        let elapsed = started.elapsed().as_millis() as u64;
                        self.bump(model, |s| {
                            s.successes += 1;
                            s.total_time_ms += elapsed;
                        });
                        info!(model = %model, attempt = attempt_number, "query generated");
                        return GenerationOutcome::success(sql, model.clone());
                    }
                    Some(message) => {
                        debug!(
                            model = %model,
                            attempt = attempt_number,
                            error = %message,
                            "candidate rejected"
                        );
                        self.bump(model, |s| s.failures += 1);
                        history.push(GenerationAttempt {
                            model: model.clone(),
                            attempt_number,
                            prompt,
                            resulting_sql: sql,
                            validation_error: Some(message),
                        });
                    }
                }
            }
        }

        warn!("all models exhausted without a valid query");
        GenerationOutcome::failure(FAILED_GENERATION_SQL, last_model)
    }

    fn model_order(&self, preferred: Option<&str>, allow_fallback: bool) -> Vec<String> {
        match preferred {
            Some(preferred) => {
                let mut models = vec![preferred.to_string()];
                if allow_fallback {
                    models.extend(self.models.iter().filter(|m| *m != preferred).cloned());
                }
                models
            }
            None => self.models.clone(),
        }
    }

    fn bump(&self, model: &str, update: impl FnOnce(&mut ModelStats)) {
        let mut entry = self.stats.entry(model.to_string()).or_default();
        update(entry.value_mut());
    }

    /// Per-model counters, best success rate first.
    pub fn performance_report(&self) -> Vec<(String, ModelStats)> {
        let mut report: Vec<(String, ModelStats)> = self
            .stats
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        report.sort_by(|a, b| b.1.success_rate().total_cmp(&a.1.success_rate()));
        report
    }
}

fn deadline_passed(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}
