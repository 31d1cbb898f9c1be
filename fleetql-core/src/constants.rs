/// Fleetql system version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Cosine similarity threshold for approximate success-cache hits.
pub const DEFAULT_CACHE_SIMILARITY_THRESHOLD: f64 = 0.96;

/// Maximum LLM generation attempts per candidate model.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Documents requested from the datastore per retrieval, as a multiple of k.
pub const RETRIEVAL_OVERSAMPLE: usize = 3;

/// Default number of context documents in a few-shot prompt.
pub const DEFAULT_FEW_SHOT_TOP_K: usize = 5;

/// Default number of context documents in a full-context prompt.
pub const DEFAULT_FULL_CONTEXT_TOP_K: usize = 10;

/// Row count above which a non-aggregate result is treated as anomalous.
pub const DEFAULT_MAX_SANE_ROWS: usize = 20_000;

/// Embedding similarity threshold for gold-standard example lookup.
pub const DEFAULT_GOLD_STANDARD_THRESHOLD: f64 = 0.85;

/// Complexity score above which full-context generation runs first.
pub const DEFAULT_COMPLEXITY_CUTOFF: u32 = 5;

/// Minimum overall pass rate for the demo benchmark (percent).
pub const DEFAULT_BENCHMARK_PASS_RATE: f64 = 80.0;

/// Sentinel SQL returned when every model and retry has been exhausted.
pub const FAILED_GENERATION_SQL: &str =
    "SELECT 'LLM generation failed after trying all models' AS error";
