//! End-to-end pipeline tests over the embedded datastore, the hashed
//! embedder, and a scripted model backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use fleetql_core::config::FleetqlConfig;
use fleetql_core::documents::Document;
use fleetql_core::errors::{FleetqlResult, GenerationError};
use fleetql_core::models::{CacheEntry, ExecutionResult, QuerySource};
use fleetql_core::traits::{IDatastore, ILlmProvider, PlanOutcome, QueryOutcome, SchemaMap};
use fleetql_datastore::SqliteDatastore;
use fleetql_embeddings::{HashedEmbedder, LexicalReranker};
use fleetql_pipeline::Pipeline;

/// Pops one canned response per call; errors once the script runs out.
struct ScriptedLlm {
    responses: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ILlmProvider for ScriptedLlm {
    fn generate(&self, _model: &str, _prompt: &str) -> FleetqlResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(GenerationError::BackendUnreachable {
                reason: "script exhausted".to_string(),
            }
            .into());
        }
        Ok(responses.remove(0))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn pipeline_with(dir: &TempDir, llm: Arc<ScriptedLlm>) -> Pipeline {
    let datastore = Arc::new(SqliteDatastore::in_memory().unwrap());
    datastore.seed_fixtures().unwrap();

    let mut config = FleetqlConfig::default();
    config.cache.cache_path = dir.path().join("cache.json");
    config.cache.examples_path = dir.path().join("learned.json");
    config.generation.models = vec!["test-model".to_string()];

    let pipeline = Pipeline::new(
        datastore,
        Arc::new(HashedEmbedder::new()),
        Arc::new(LexicalReranker::new()),
        llm,
        config,
    )
    .unwrap();
    pipeline.index_corpus().unwrap();
    pipeline
}

#[test]
fn generated_query_is_answered_then_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let llm = ScriptedLlm::new(&[
        "SELECT truck_no, transporter_name FROM vts_truck_master \
         WHERE whether_truck_blacklisted = 'Y'",
        "Two vehicles are currently blacklisted.",
    ]);
    let pipeline = pipeline_with(&dir, llm.clone());

    let question = "Show blacklisted vehicles with their transporter names";
    let first = pipeline.ask(question);
    assert!(first.success, "{}", first.answer);
    assert_eq!(
        first.source,
        Some(QuerySource::FewShot("test-model".to_string()))
    );
    assert_eq!(first.result.as_ref().unwrap().count, 2);
    assert_eq!(first.answer, "Two vehicles are currently blacklisted.");
    let calls_after_first = llm.calls();

    let second = pipeline.ask(question);
    assert!(second.success);
    assert_eq!(second.source, Some(QuerySource::CacheHit));
    assert_eq!(second.result.as_ref().unwrap().count, 2);
    // one synthesis attempt, zero generation calls
    assert_eq!(llm.calls(), calls_after_first + 1);
}

#[test]
fn schema_questions_never_touch_generation() {
    let dir = TempDir::new().unwrap();
    let llm = ScriptedLlm::new(&[]);
    let pipeline = pipeline_with(&dir, llm.clone());

    let response = pipeline.ask("What tables are in the database?");
    assert!(response.success, "{}", response.answer);
    assert_eq!(response.source, Some(QuerySource::SchemaIntrospection));
    let result = response.result.unwrap();
    assert!(result
        .rows
        .iter()
        .any(|r| r["table_name"] == "vts_truck_master"));
    // only the (failed) synthesis attempt
    assert_eq!(llm.calls(), 1);
}

#[test]
fn vehicle_timeline_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let llm = ScriptedLlm::new(&[]);
    let pipeline = pipeline_with(&dir, llm);

    let response = pipeline.ask("Give me a comprehensive report for MH12AB1234");
    assert!(response.success, "{}", response.answer);
    assert_eq!(response.source, Some(QuerySource::DirectVehicleId));
    // two history rows plus one live alert for this vehicle
    assert_eq!(response.result.unwrap().count, 3);
}

#[test]
fn sanity_failure_forces_one_regeneration() {
    let dir = TempDir::new().unwrap();
    let llm = ScriptedLlm::new(&[
        "SELECT truck_no FROM vts_truck_master",
        "SELECT tt_number, risk_score FROM tt_risk_score",
        "Here are the risk scores.",
    ]);
    let pipeline = pipeline_with(&dir, llm.clone());

    let response = pipeline.ask("Show each vehicle with its risk score");
    assert!(response.success, "{}", response.answer);
    assert!(matches!(
        response.source,
        Some(QuerySource::Regenerated(_))
    ));
    assert!(response.sql.unwrap().contains("risk_score"));
    assert_eq!(llm.calls(), 3);
}

#[test]
fn exhausted_generation_apologizes() {
    let dir = TempDir::new().unwrap();
    let llm = ScriptedLlm::new(&[]);
    let pipeline = pipeline_with(&dir, llm);

    let response = pipeline.ask("Compare transporter fuel efficiency trends");
    assert!(!response.success);
    assert!(response.answer.contains("I'm sorry"));
    assert!(response.sql.is_none());
}

#[test]
fn model_counters_reflect_the_run() {
    let dir = TempDir::new().unwrap();
    let llm = ScriptedLlm::new(&[
        "SELECT truck_no, transporter_name FROM vts_truck_master \
         WHERE whether_truck_blacklisted = 'Y'",
        "Two vehicles are currently blacklisted.",
    ]);
    let pipeline = pipeline_with(&dir, llm);
    pipeline.ask("Show blacklisted vehicles with their transporter names");

    let report = pipeline.performance_report();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].0, "test-model");
    assert_eq!(report[0].1.successes, 1);
}

#[test]
fn pipeline_counters_track_each_strategy() {
    let dir = TempDir::new().unwrap();
    let llm = ScriptedLlm::new(&[
        "SELECT truck_no, transporter_name FROM vts_truck_master \
         WHERE whether_truck_blacklisted = 'Y'",
        "Two vehicles are currently blacklisted.",
        "One vehicle matched.",
    ]);
    let pipeline = pipeline_with(&dir, llm);
    pipeline.ask("Show blacklisted vehicles with their transporter names");
    pipeline.ask("Show blacklisted vehicles with their transporter names");
    pipeline.ask("Show me the complete history for vehicle MH12AB1234");

    let stats = pipeline.pipeline_stats();
    assert_eq!(stats.total_questions, 3);
    assert_eq!(stats.few_shot, 1);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.deterministic, 1);
    assert_eq!(stats.failures, 0);
}

/// Produces valid SQL only when the prompt lists the whole schema;
/// focused prompts get an unusable statement back.
struct SchemaHungryLlm {
    calls: AtomicUsize,
    full_prompt_calls: AtomicUsize,
}

impl SchemaHungryLlm {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            full_prompt_calls: AtomicUsize::new(0),
        })
    }
}

impl ILlmProvider for SchemaHungryLlm {
    fn generate(&self, _model: &str, prompt: &str) -> FleetqlResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.contains("vts_tripauditmaster") {
            self.full_prompt_calls.fetch_add(1, Ordering::SeqCst);
            Ok("SELECT truck_no, transporter_name FROM vts_truck_master \
                WHERE whether_truck_blacklisted = 'Y'"
                .to_string())
        } else {
            Ok("SELECT truck_no,\nFROM vts_truck_master".to_string())
        }
    }

    fn name(&self) -> &str {
        "schema-hungry"
    }
}

#[test]
fn exhausted_few_shot_falls_back_to_full_context() {
    let dir = TempDir::new().unwrap();
    let llm = SchemaHungryLlm::new();

    let datastore = Arc::new(SqliteDatastore::in_memory().unwrap());
    datastore.seed_fixtures().unwrap();
    let mut config = FleetqlConfig::default();
    config.cache.cache_path = dir.path().join("cache.json");
    config.cache.examples_path = dir.path().join("learned.json");
    config.generation.models = vec!["test-model".to_string()];
    let pipeline = Pipeline::new(
        datastore,
        Arc::new(HashedEmbedder::new()),
        Arc::new(LexicalReranker::new()),
        llm.clone(),
        config,
    )
    .unwrap();
    pipeline.index_corpus().unwrap();

    let response = pipeline.ask("Show blacklisted vehicles with their transporter names");
    assert!(response.success, "{}", response.answer);
    assert_eq!(
        response.source,
        Some(QuerySource::FullContext("test-model".to_string()))
    );
    // three focused attempts, one widened attempt, one synthesis call
    assert_eq!(llm.calls.load(Ordering::SeqCst), 5);
    assert_eq!(llm.full_prompt_calls.load(Ordering::SeqCst), 1);
    let stats = pipeline.pipeline_stats();
    assert_eq!(stats.full_context, 1);
    assert_eq!(stats.few_shot, 0);
}

/// SQLite stand-in that also takes interval date arithmetic, the way
/// the production backend does.
struct IntervalCapableStore {
    inner: SqliteDatastore,
}

impl IDatastore for IntervalCapableStore {
    fn introspect_schema(&self) -> FleetqlResult<SchemaMap> {
        self.inner.introspect_schema()
    }

    fn plan(&self, sql: &str) -> FleetqlResult<PlanOutcome> {
        if sql.contains("INTERVAL") {
            return Ok(PlanOutcome::Accepted);
        }
        self.inner.plan(sql)
    }

    fn execute(&self, sql: &str) -> FleetqlResult<QueryOutcome> {
        if sql.contains("INTERVAL") {
            return Ok(QueryOutcome::Rows(ExecutionResult::new(
                vec!["truck_no".to_string(), "transporter_name".to_string()],
                vec![serde_json::json!({
                    "truck_no": "DL01EF4321",
                    "transporter_name": "Capital Movers"
                })],
            )));
        }
        self.inner.execute(sql)
    }

    fn upsert_document(&self, document: &Document) -> FleetqlResult<()> {
        self.inner.upsert_document(document)
    }

    fn nearest_documents(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> FleetqlResult<Vec<(Document, f64)>> {
        self.inner.nearest_documents(embedding, limit)
    }

    fn document_count(&self) -> FleetqlResult<usize> {
        self.inner.document_count()
    }
}

#[test]
fn synonym_rewrites_reach_the_handlers() {
    let dir = TempDir::new().unwrap();
    let llm = ScriptedLlm::new(&[]);

    let inner = SqliteDatastore::in_memory().unwrap();
    inner.seed_fixtures().unwrap();
    let mut config = FleetqlConfig::default();
    config.cache.cache_path = dir.path().join("cache.json");
    config.cache.examples_path = dir.path().join("learned.json");
    config.generation.models = vec!["test-model".to_string()];
    let pipeline = Pipeline::new(
        Arc::new(IntervalCapableStore { inner }),
        Arc::new(HashedEmbedder::new()),
        Arc::new(LexicalReranker::new()),
        llm,
        config,
    )
    .unwrap();
    pipeline.index_corpus().unwrap();

    // "trucks" only matches the handler after the synonym rewrite.
    let response = pipeline.ask("Which trucks had no alerts in the last 7 days?");
    assert!(response.success, "{}", response.answer);
    assert_eq!(response.source, Some(QuerySource::NegativeExistence));
    assert!(response.sql.unwrap().contains("NOT EXISTS"));
}

#[test]
fn stale_cache_hit_fails_sanity_and_is_invalidated() {
    let dir = TempDir::new().unwrap();
    let question = "What is the risk score of vehicle MH12AB1234";
    let stale = CacheEntry {
        normalized_question: "what is the risk score of vehicle mh12ab1234".to_string(),
        sql: "SELECT truck_no FROM vts_truck_master WHERE truck_no = 'MH12AB1234'".to_string(),
        source: "few_shot_llm_test-model".to_string(),
        params: vec!["MH12AB1234".to_string()],
        embedding: Vec::new(),
        stored_at: chrono::Utc::now(),
    };
    std::fs::write(
        dir.path().join("cache.json"),
        serde_json::to_string(&vec![stale]).unwrap(),
    )
    .unwrap();

    let llm = ScriptedLlm::new(&[
        "SELECT tt_number, risk_score FROM tt_risk_score WHERE tt_number = 'MH12AB1234'",
        "The risk score of MH12AB1234 is 72.5.",
    ]);
    let pipeline = pipeline_with(&dir, llm);

    let response = pipeline.ask(question);
    assert!(response.success, "{}", response.answer);
    // the cached query has no risk_score column, so the hit is dropped
    // and the question generates a fresh query instead
    assert_eq!(
        response.source,
        Some(QuerySource::FewShot("test-model".to_string()))
    );
    assert!(response.sql.unwrap().contains("risk_score"));
}
