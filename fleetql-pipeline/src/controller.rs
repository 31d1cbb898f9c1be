//! The question-to-answer controller.
//!
//! Order of attack for every question: deterministic handlers, the
//! success cache, analytical templates, then LLM generation with the
//! logical-plan cross-check, execution, sanity checks, and at most one
//! forced regeneration. Whatever survives becomes the answer and is
//! cached for next time.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use fleetql_cache::{LearnedExampleStore, SuccessCache};
use fleetql_core::config::FleetqlConfig;
use fleetql_core::models::{
    ExecutionResult, GenerationAttempt, ModelStats, PipelineResponse, PipelineStats, QaExample,
    QuerySource,
};
use fleetql_core::traits::{IDatastore, IEmbeddingProvider, ILlmProvider, IReranker, QueryOutcome};
use fleetql_generation::{GenerationOrchestrator, GenerationRequest, PromptStrategy};
use fleetql_retrieval::{
    determine_relevant_tables, estimate_complexity, has_negative_intent, normalize_question,
    ContextRetriever, ScoredDocument,
};
use fleetql_schema::{SchemaMirror, SqlValidator};

use crate::answer::synthesize_answer;
use crate::audit::AuditLog;
use crate::handlers::{analytical_template, early_handler};
use crate::logical::cross_check;
use crate::sanity::sanity_issues;

pub struct Pipeline {
    datastore: Arc<dyn IDatastore>,
    llm: Arc<dyn ILlmProvider>,
    retriever: ContextRetriever,
    validator: Arc<SqlValidator>,
    orchestrator: GenerationOrchestrator,
    cache: Mutex<SuccessCache>,
    learned: Mutex<LearnedExampleStore>,
    audit: AuditLog,
    stats: Mutex<PipelineStats>,
    config: FleetqlConfig,
}

/// An answered question ready for synthesis and caching.
struct Answered {
    sql: String,
    result: ExecutionResult,
    source: QuerySource,
}

impl Pipeline {
    pub fn new(
        datastore: Arc<dyn IDatastore>,
        embedder: Arc<dyn IEmbeddingProvider>,
        reranker: Arc<dyn IReranker>,
        llm: Arc<dyn ILlmProvider>,
        config: FleetqlConfig,
    ) -> fleetql_core::errors::FleetqlResult<Self> {
        let mirror = SchemaMirror::from_datastore(&*datastore)?;
        let validator = Arc::new(SqlValidator::new(datastore.clone(), mirror));
        let retriever = ContextRetriever::new(
            datastore.clone(),
            embedder,
            reranker,
            config.retrieval.oversample,
        );
        let orchestrator = GenerationOrchestrator::new(
            llm.clone(),
            validator.clone(),
            config.generation.models.clone(),
            config.generation.max_retries,
        );
        let cache = Mutex::new(SuccessCache::load(
            &config.cache.cache_path,
            config.cache.similarity_threshold,
        ));
        let learned = Mutex::new(LearnedExampleStore::load(&config.cache.examples_path));
        let audit = AuditLog::new(config.pipeline.audit_log_path.clone());
        Ok(Self {
            datastore,
            llm,
            retriever,
            validator,
            orchestrator,
            cache,
            learned,
            audit,
            stats: Mutex::new(PipelineStats::default()),
            config,
        })
    }

    /// Embed and index the seed corpus plus everything learned so far.
    pub fn index_corpus(&self) -> fleetql_core::errors::FleetqlResult<usize> {
        let learned = lock(&self.learned);
        fleetql_retrieval::index_corpus(
            &*self.datastore,
            self.retriever.embedder(),
            learned.examples(),
        )
    }

    pub fn ask(&self, question: &str) -> PipelineResponse {
        self.ask_with_model(question, None)
    }

    /// Answer a question, optionally trying `requested_model` first.
    pub fn ask_with_model(&self, question: &str, requested_model: Option<&str>) -> PipelineResponse {
        let started = Instant::now();
        let deadline = match self.config.pipeline.deadline_secs {
            0 => None,
            secs => Some(started + Duration::from_secs(secs)),
        };
        let response = self.answer_question(question, requested_model, deadline);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        lock(&self.stats).observe(response.source.as_ref(), response.success, elapsed_ms);
        self.audit.record(
            question,
            response.sql.as_deref(),
            &response
                .source
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "none".to_string()),
            response.success,
            response.result.as_ref().map(|r| r.count),
            started.elapsed().as_millis(),
        );
        response
    }

    fn answer_question(
        &self,
        question: &str,
        requested_model: Option<&str>,
        deadline: Option<Instant>,
    ) -> PipelineResponse {
        let embedding = self.question_embedding(question);
        // Handlers match against the rewritten vocabulary, so "trucks"
        // and "yesterday" reach them in extractable form.
        let normalized = normalize_question(question);

        if let Some(done) = self.try_handler(question, early_handler(&normalized)) {
            return self.finish(question, done, &embedding);
        }
        if let Some(done) = self.try_cache(question, &embedding) {
            return self.finish(question, done, &embedding);
        }
        if let Some(done) = self.try_handler(question, analytical_template(&normalized)) {
            return self.finish(question, done, &embedding);
        }
        match self.generate_and_execute(question, requested_model, deadline) {
            Ok(done) => self.finish(question, done, &embedding),
            Err(last_error) => {
                warn!(question, error = %last_error, "pipeline exhausted");
                PipelineResponse::failure(format!(
                    "I'm sorry, I could not produce a reliable answer for your \
                     question. Last error: {last_error}"
                ))
            }
        }
    }

    /// Validate and execute a deterministic handler's SQL. Any problem
    /// falls through to the next stage rather than failing the question.
    fn try_handler(
        &self,
        question: &str,
        handled: Option<(String, QuerySource)>,
    ) -> Option<Answered> {
        let (sql, source) = handled?;
        // Timeline queries read several fact tables at once by design.
        match self.validator.validate_with_options(&sql, true) {
            Ok(verdict) if verdict.valid => {}
            Ok(verdict) => {
                warn!(source = %source, reason = %verdict.message, "handler query rejected");
                return None;
            }
            Err(e) => {
                warn!(source = %source, error = %e, "handler validation unavailable");
                return None;
            }
        }
        match self.datastore.execute(&sql) {
            Ok(QueryOutcome::Rows(result)) => {
                let issues = sanity_issues(
                    question,
                    &sql,
                    &source,
                    &result,
                    self.config.pipeline.max_sane_rows,
                );
                if issues.is_empty() {
                    info!(source = %source, rows = result.count, "handler answered");
                    Some(Answered { sql, result, source })
                } else {
                    warn!(source = %source, ?issues, "handler result looked wrong");
                    None
                }
            }
            Ok(QueryOutcome::Failed { error }) => {
                warn!(source = %source, error = %error, "handler query failed to execute");
                None
            }
            Err(e) => {
                warn!(source = %source, error = %e, "datastore unavailable for handler");
                None
            }
        }
    }

    /// Serve from the success cache, revalidating against the live
    /// schema. A stale entry is invalidated and the question continues
    /// down the pipeline.
    fn try_cache(&self, question: &str, embedding: &[f32]) -> Option<Answered> {
        let hit = lock(&self.cache).lookup(question, embedding)?;
        debug!(similarity = hit.similarity, "cache candidate found");

        let still_valid = match self.validator.validate(&hit.sql) {
            Ok(verdict) => verdict.valid,
            Err(e) => {
                warn!(error = %e, "cache revalidation unavailable");
                return None;
            }
        };
        if !still_valid {
            self.invalidate(question);
            return None;
        }
        match self.datastore.execute(&hit.sql) {
            Ok(QueryOutcome::Rows(result)) => {
                let issues = sanity_issues(
                    question,
                    &hit.sql,
                    &QuerySource::CacheHit,
                    &result,
                    self.config.pipeline.max_sane_rows,
                );
                if !issues.is_empty() {
                    warn!(?issues, "cached result looked wrong, dropping entry");
                    self.invalidate(question);
                    return None;
                }
                Some(Answered {
                    sql: hit.sql,
                    result,
                    source: QuerySource::CacheHit,
                })
            }
            Ok(QueryOutcome::Failed { error }) => {
                warn!(error = %error, "cached query no longer executes");
                self.invalidate(question);
                None
            }
            Err(e) => {
                warn!(error = %e, "datastore unavailable for cache hit");
                None
            }
        }
    }

    /// The LLM path: generate, cross-check against a gold standard,
    /// execute, sanity-check, and regenerate at most once on failure.
    fn generate_and_execute(
        &self,
        question: &str,
        requested_model: Option<&str>,
        deadline: Option<Instant>,
    ) -> Result<Answered, String> {
        let complexity = estimate_complexity(question);
        let full_context_first = complexity > self.config.pipeline.complexity_cutoff
            && requested_model == Some(self.config.pipeline.high_capability_model.as_str());
        let strategy = if full_context_first {
            PromptStrategy::FullContext
        } else {
            PromptStrategy::FewShot
        };
        let k = match strategy {
            PromptStrategy::FewShot => self.config.retrieval.few_shot_top_k,
            PromptStrategy::FullContext => self.config.retrieval.full_context_top_k,
        };
        let mut strategy = strategy;
        let mut context = self.retriever.retrieve(question, k);
        let mut relevant_tables = determine_relevant_tables(question, &context);
        debug!(complexity, ?strategy, ?relevant_tables, "generation planned");

        let mut outcome = self.orchestrator.generate(&GenerationRequest {
            question,
            strategy,
            context: &context,
            relevant_tables: &relevant_tables,
            preferred_model: requested_model,
            allow_fallback: true,
            deadline,
            failed_attempt: None,
        });
        if !outcome.success && strategy == PromptStrategy::FewShot {
            info!("focused generation exhausted, widening to full context");
            strategy = PromptStrategy::FullContext;
            context = self
                .retriever
                .retrieve(question, self.config.retrieval.full_context_top_k);
            relevant_tables = determine_relevant_tables(question, &context);
            outcome = self.orchestrator.generate(&GenerationRequest {
                question,
                strategy,
                context: &context,
                relevant_tables: &relevant_tables,
                preferred_model: requested_model,
                allow_fallback: true,
                deadline,
                failed_attempt: None,
            });
        }
        if !outcome.success {
            return Err("no model produced a valid query".to_string());
        }
        let mut source = match strategy {
            PromptStrategy::FewShot => QuerySource::FewShot(outcome.model_used.clone()),
            PromptStrategy::FullContext => QuerySource::FullContext(outcome.model_used.clone()),
        };
        let mut sql = outcome.sql;
        let negative = has_negative_intent(&normalize_question(question));

        if let Some((gold, score)) = self
            .retriever
            .retrieve_gold_standard(question, self.config.pipeline.gold_standard_threshold)
        {
            if let Some(gold_sql) = gold.kind.example_sql() {
                if let Err(feedback) = cross_check(&sql, gold_sql, negative) {
                    debug!(score, feedback = %feedback, "logical plan mismatch, regenerating");
                    let regenerated = self.regenerate(
                        question,
                        &context,
                        &relevant_tables,
                        &sql,
                        &feedback,
                        deadline,
                    )?;
                    sql = regenerated.0;
                    source = regenerated.1;
                }
            }
        }

        let mut regenerated_once = source_is_regenerated(&source);
        loop {
            let feedback = match self.datastore.execute(&sql) {
                Ok(QueryOutcome::Rows(result)) => {
                    let issues = sanity_issues(
                        question,
                        &sql,
                        &source,
                        &result,
                        self.config.pipeline.max_sane_rows,
                    );
                    if issues.is_empty() {
                        return Ok(Answered { sql, result, source });
                    }
                    issues.join("; ")
                }
                Ok(QueryOutcome::Failed { error }) => error,
                Err(e) => return Err(e.to_string()),
            };

            if regenerated_once {
                return Err(feedback);
            }
            info!(feedback = %feedback, "forcing one regeneration");
            let (new_sql, new_source) = self.regenerate(
                question,
                &context,
                &relevant_tables,
                &sql,
                &feedback,
                deadline,
            )?;
            sql = new_sql;
            source = new_source;
            regenerated_once = true;
        }
    }

    /// One full-context regeneration seeded with the failure feedback.
    fn regenerate(
        &self,
        question: &str,
        context: &[ScoredDocument],
        relevant_tables: &[String],
        failed_sql: &str,
        feedback: &str,
        deadline: Option<Instant>,
    ) -> Result<(String, QuerySource), String> {
        let outcome = self.orchestrator.generate(&GenerationRequest {
            question,
            strategy: PromptStrategy::FullContext,
            context,
            relevant_tables,
            preferred_model: None,
            allow_fallback: true,
            deadline,
            failed_attempt: Some(GenerationAttempt {
                model: String::new(),
                attempt_number: 0,
                prompt: String::new(),
                resulting_sql: failed_sql.to_string(),
                validation_error: Some(feedback.to_string()),
            }),
        });
        if !outcome.success {
            return Err(format!("regeneration failed after: {feedback}"));
        }
        Ok((outcome.sql, QuerySource::Regenerated(outcome.model_used)))
    }

    /// Synthesize the answer, persist what we learned, and respond.
    fn finish(&self, question: &str, answered: Answered, embedding: &[f32]) -> PipelineResponse {
        let Answered { sql, result, source } = answered;
        let synthesis_model = self
            .config
            .generation
            .models
            .first()
            .cloned()
            .unwrap_or_default();
        let answer = synthesize_answer(&*self.llm, &synthesis_model, question, &result);

        if source != QuerySource::CacheHit {
            if let Err(e) =
                lock(&self.cache).store(question, &sql, &source.to_string(), embedding.to_vec())
            {
                warn!(error = %e, "could not persist cache entry");
            }
        }
        if source.is_llm() {
            let example =
                QaExample::new(normalize_question(question), sql.clone(), source.to_string());
            if let Err(e) = lock(&self.learned).record(example) {
                warn!(error = %e, "could not persist learned example");
            }
        }
        PipelineResponse {
            answer,
            sql: Some(sql),
            result: Some(result),
            source: Some(source),
            success: true,
        }
    }

    fn question_embedding(&self, question: &str) -> Vec<f32> {
        let normalized = normalize_question(question);
        match self.retriever.embedder().embed(&normalized) {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "question embedding failed, approximate cache disabled");
                Vec::new()
            }
        }
    }

    fn invalidate(&self, question: &str) {
        if let Err(e) = lock(&self.cache).invalidate(question) {
            warn!(error = %e, "cache invalidation failed");
        }
    }

    /// Per-model generation counters, best first.
    pub fn performance_report(&self) -> Vec<(String, ModelStats)> {
        self.orchestrator.performance_report()
    }

    /// Snapshot of the strategy-sequence counters.
    pub fn pipeline_stats(&self) -> PipelineStats {
        lock(&self.stats).clone()
    }

    /// Validator rejection counters by category.
    pub fn error_stats(&self) -> Vec<(String, u64)> {
        self.validator.error_stats()
    }
}

fn source_is_regenerated(source: &QuerySource) -> bool {
    matches!(source, QuerySource::Regenerated(_))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
