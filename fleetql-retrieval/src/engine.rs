//! Retrieval pipeline: embed, search, boost, rerank, truncate.

use std::sync::Arc;

use tracing::{debug, warn};

use fleetql_core::documents::Document;
use fleetql_core::errors::FleetqlResult;
use fleetql_core::traits::{IDatastore, IEmbeddingProvider, IReranker};

use crate::intent;
use crate::normalize::{has_negative_intent, normalize_question};

/// Score boost for exclusion-pattern examples on negative questions.
const NEGATIVE_INTENT_BOOST: f64 = 0.15;

/// A retrieved document with its first-pass and rerank scores.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Document,
    /// Cosine similarity from vector search, plus any boost.
    pub score: f64,
    /// Pairwise rerank score; ordering key of the final result.
    pub rerank_score: f64,
}

/// Context retriever over the datastore's document corpus.
pub struct ContextRetriever {
    datastore: Arc<dyn IDatastore>,
    embedder: Arc<dyn IEmbeddingProvider>,
    reranker: Arc<dyn IReranker>,
    oversample: usize,
}

impl ContextRetriever {
    pub fn new(
        datastore: Arc<dyn IDatastore>,
        embedder: Arc<dyn IEmbeddingProvider>,
        reranker: Arc<dyn IReranker>,
        oversample: usize,
    ) -> Self {
        Self {
            datastore,
            embedder,
            reranker,
            oversample: oversample.max(1),
        }
    }

    pub fn embedder(&self) -> &Arc<dyn IEmbeddingProvider> {
        &self.embedder
    }

    /// Return the `k` most supporting documents for a question, best
    /// first. Never fails the pipeline: an unreachable corpus yields an
    /// empty set and a warning.
    pub fn retrieve(&self, question: &str, k: usize) -> Vec<ScoredDocument> {
        let normalized = normalize_question(question);
        let negative = has_negative_intent(&normalized);

        let candidates = match self.search(&normalized, k * self.oversample) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "retrieval failed, prompting without context");
                Vec::new()
            }
        };

        let mut scored: Vec<ScoredDocument> = candidates
            .into_iter()
            .map(|(document, mut score)| {
                if negative && has_exclusion_pattern(&document) {
                    score += NEGATIVE_INTENT_BOOST;
                }
                ScoredDocument {
                    document,
                    score,
                    rerank_score: 0.0,
                }
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        for doc in scored.iter_mut() {
            doc.rerank_score = match self.reranker.score(&normalized, &doc.document.text) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "rerank failed, keeping first-pass score");
                    doc.score
                }
            };
        }
        scored.sort_by(|a, b| b.rerank_score.total_cmp(&a.rerank_score));
        scored.truncate(k);

        // Intent templates outrank everything retrieved.
        if let Some(template) = intent::match_intent(&normalized) {
            let top_score = scored.first().map(|d| d.rerank_score).unwrap_or(0.0);
            scored.insert(
                0,
                ScoredDocument {
                    document: template,
                    score: top_score + 1.0,
                    rerank_score: top_score + 1.0,
                },
            );
            scored.truncate(k.max(1));
        }

        debug!(
            question = normalized,
            returned = scored.len(),
            negative_intent = negative,
            "context retrieval complete"
        );
        scored
    }

    /// Closest gold-standard worked example above `threshold`, used for
    /// the logical-plan cross-check.
    pub fn retrieve_gold_standard(
        &self,
        question: &str,
        threshold: f64,
    ) -> Option<(Document, f64)> {
        let normalized = normalize_question(question);
        let candidates = match self.search(&normalized, 10) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "gold-standard lookup failed");
                return None;
            }
        };
        candidates
            .into_iter()
            .filter(|(doc, _)| doc.kind.example_sql().is_some())
            .filter(|(_, score)| *score >= threshold)
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    fn search(&self, normalized: &str, limit: usize) -> FleetqlResult<Vec<(Document, f64)>> {
        let embedding = self.embedder.embed(normalized)?;
        self.datastore.nearest_documents(&embedding, limit)
    }
}

fn has_exclusion_pattern(document: &Document) -> bool {
    document
        .kind
        .example_sql()
        .map(|sql| {
            let lower = sql.to_lowercase();
            lower.contains("not exists")
                || (lower.contains("left join") && lower.contains("is null"))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetql_core::documents::DocumentKind;
    use fleetql_core::models::ExecutionResult;
    use fleetql_core::traits::{PlanOutcome, QueryOutcome, SchemaMap};
    use fleetql_core::vector::cosine_similarity;
    use fleetql_embeddings::{HashedEmbedder, LexicalReranker};
    use std::sync::Mutex;

    struct MemoryDatastore {
        documents: Mutex<Vec<Document>>,
    }

    impl MemoryDatastore {
        fn with_documents(documents: Vec<Document>) -> Self {
            Self {
                documents: Mutex::new(documents),
            }
        }
    }

    impl IDatastore for MemoryDatastore {
        fn introspect_schema(&self) -> FleetqlResult<SchemaMap> {
            Ok(SchemaMap::new())
        }

        fn plan(&self, _sql: &str) -> FleetqlResult<PlanOutcome> {
            Ok(PlanOutcome::Accepted)
        }

        fn execute(&self, _sql: &str) -> FleetqlResult<QueryOutcome> {
            Ok(QueryOutcome::Rows(ExecutionResult::new(vec![], vec![])))
        }

        fn upsert_document(&self, document: &Document) -> FleetqlResult<()> {
            let mut docs = self.documents.lock().unwrap();
            docs.retain(|d| d.id != document.id);
            docs.push(document.clone());
            Ok(())
        }

        fn nearest_documents(
            &self,
            embedding: &[f32],
            limit: usize,
        ) -> FleetqlResult<Vec<(Document, f64)>> {
            let docs = self.documents.lock().unwrap();
            let mut scored: Vec<(Document, f64)> = docs
                .iter()
                .map(|d| (d.clone(), cosine_similarity(embedding, &d.embedding)))
                .collect();
            scored.sort_by(|a, b| b.1.total_cmp(&a.1));
            scored.truncate(limit);
            Ok(scored)
        }

        fn document_count(&self) -> FleetqlResult<usize> {
            Ok(self.documents.lock().unwrap().len())
        }
    }

    fn example(question: &str, sql: &str, embedder: &HashedEmbedder) -> Document {
        let text = format!("QUESTION: {question}\nSQL: {sql}");
        let mut doc = Document::new(
            text,
            DocumentKind::Example {
                question: question.to_string(),
                sql: sql.to_string(),
            },
        );
        let embedding = embedder.embed(doc.retrieval_text()).unwrap();
        doc.embedding = embedding;
        doc
    }

    fn retriever(documents: Vec<Document>) -> ContextRetriever {
        ContextRetriever::new(
            Arc::new(MemoryDatastore::with_documents(documents)),
            Arc::new(HashedEmbedder::new()),
            Arc::new(LexicalReranker::new()),
            3,
        )
    }

    #[test]
    fn retrieves_matching_example_first() {
        let embedder = HashedEmbedder::new();
        let docs = vec![
            example(
                "show blacklisted vehicles",
                "SELECT truck_no FROM vts_truck_master WHERE whether_truck_blacklisted = 'Y'",
                &embedder,
            ),
            example(
                "average risk score per transporter",
                "SELECT transporter_name, AVG(risk_score) FROM transporter_risk_score GROUP BY transporter_name",
                &embedder,
            ),
        ];
        let r = retriever(docs);
        let results = r.retrieve("show blacklisted vehicles", 1);
        assert_eq!(results.len(), 1);
        assert!(results[0].document.text.contains("whether_truck_blacklisted"));
    }

    #[test]
    fn negative_intent_boosts_exclusion_examples() {
        let embedder = HashedEmbedder::new();
        let docs = vec![
            example(
                "vehicles with alerts in the last 7 days",
                "SELECT vehicle_number FROM alerts WHERE created_at >= CURRENT_DATE - INTERVAL '7 days'",
                &embedder,
            ),
            example(
                "vehicles with no alerts in the last 7 days",
                "SELECT vtm.truck_no FROM vts_truck_master vtm WHERE NOT EXISTS \
                 (SELECT 1 FROM alerts a WHERE a.vehicle_number = vtm.truck_no)",
                &embedder,
            ),
        ];
        let r = retriever(docs);
        let results = r.retrieve("vehicles with no alerts in the last 7 days", 2);
        assert!(results[0].document.text.contains("NOT EXISTS"));
    }

    #[test]
    fn intent_template_is_prepended() {
        let r = retriever(vec![]);
        let results = r.retrieve("show the history for RJ19GD6553", 3);
        assert!(!results.is_empty());
        match &results[0].document.kind {
            DocumentKind::TemplateGuidance { intent, .. } => {
                assert_eq!(intent, "vehicle_history")
            }
            other => panic!("expected template guidance, got {other:?}"),
        }
    }

    #[test]
    fn empty_corpus_returns_empty_set() {
        let r = retriever(vec![]);
        assert!(r.retrieve("show blacklisted vehicles", 5).is_empty());
    }

    #[test]
    fn gold_standard_requires_high_similarity() {
        let embedder = HashedEmbedder::new();
        let docs = vec![example(
            "show blacklisted vehicles",
            "SELECT truck_no FROM vts_truck_master WHERE whether_truck_blacklisted = 'Y'",
            &embedder,
        )];
        let r = retriever(docs);
        assert!(r
            .retrieve_gold_standard("show blacklisted vehicles", 0.85)
            .is_some());
        assert!(r
            .retrieve_gold_standard("average driver speed in june", 0.85)
            .is_none());
    }
}
