//! `fleetql`: ask natural-language questions of the fleet database.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fleetql_core::config::FleetqlConfig;
use fleetql_core::constants::DEFAULT_BENCHMARK_PASS_RATE;
use fleetql_datastore::SqliteDatastore;
use fleetql_embeddings::{
    CachedEmbedder, DegradingEmbedder, HashedEmbedder, LexicalReranker, OllamaEmbedder, OllamaLlm,
};
use fleetql_pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "fleetql", version, about = "Natural-language queries over fleet tracking data")]
struct Cli {
    /// Configuration file (missing file uses built-in defaults).
    #[arg(long, default_value = "fleetql.toml")]
    config: PathBuf,

    /// SQLite database file.
    #[arg(long, default_value = "fleetql.db")]
    database: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask one question and print the answer.
    Ask {
        /// The question, as free text.
        question: Vec<String>,
        /// Model to try first.
        #[arg(long)]
        model: Option<String>,
        /// Print the generated SQL and result rows too.
        #[arg(long)]
        verbose: bool,
    },
    /// (Re)index the retrieval corpus, optionally loading demo data.
    Index {
        /// Load the bundled demo fixture rows first.
        #[arg(long)]
        fixtures: bool,
    },
    /// Run the benchmark question set against every configured model.
    Bench {
        /// Required pass rate in percent.
        #[arg(long)]
        pass_rate: Option<f64>,
    },
}

const BENCH_QUESTIONS: &[&str] = &[
    "Show blacklisted vehicles with their transporter names",
    "Which vehicles have no alerts in the last 7 days?",
    "What tables are in the database?",
    "Give me a comprehensive report for MH12AB1234",
    "Show vehicles with high risk score",
    "Count alerts per vehicle in the last 30 days",
    "Which transporters have the highest risk score?",
    "Vehicles with violations in the last 6 months but not in the last 3 months",
    "Which vehicles had speed violations?",
    "Average capacity of trucks per transporter",
];

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = FleetqlConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let pipeline = build_pipeline(&cli.database, &config)?;

    match cli.command {
        Command::Ask {
            question,
            model,
            verbose,
        } => {
            let question = question.join(" ");
            anyhow::ensure!(!question.trim().is_empty(), "no question given");
            let response = pipeline.ask_with_model(&question, model.as_deref());
            println!("{}", response.answer);
            if verbose {
                if let Some(sql) = &response.sql {
                    println!("\nSQL: {sql}");
                }
                if let Some(source) = &response.source {
                    println!("source: {source}");
                }
                if let Some(result) = &response.result {
                    println!("rows: {}", result.count);
                    for row in result.rows.iter().take(20) {
                        println!("  {row}");
                    }
                }
            }
            if !response.success {
                std::process::exit(1);
            }
        }
        Command::Index { fixtures } => {
            if fixtures {
                pipeline_datastore(&cli.database)?.seed_fixtures()?;
            }
            let indexed = pipeline.index_corpus()?;
            println!("indexed {indexed} documents");
        }
        Command::Bench { pass_rate } => {
            let required = pass_rate.unwrap_or(DEFAULT_BENCHMARK_PASS_RATE);
            run_benchmark(&pipeline, required)?;
        }
    }
    Ok(())
}

fn build_pipeline(database: &PathBuf, config: &FleetqlConfig) -> anyhow::Result<Pipeline> {
    let datastore = Arc::new(
        SqliteDatastore::open(database)
            .with_context(|| format!("opening {}", database.display()))?,
    );
    let ollama = Arc::new(OllamaEmbedder::new(
        config.retrieval.embedding_url.clone(),
        config.retrieval.embedding_model.clone(),
    ));
    let embedder = Arc::new(DegradingEmbedder::new(
        Arc::new(CachedEmbedder::new(ollama, 10_000)),
        Arc::new(HashedEmbedder::new()),
    ));
    let llm = Arc::new(OllamaLlm::new(
        config.generation.llm_url.clone(),
        config.generation.request_timeout_secs,
        config.generation.temperature,
    ));
    let pipeline = Pipeline::new(
        datastore,
        embedder,
        Arc::new(LexicalReranker::new()),
        llm,
        config.clone(),
    )?;
    Ok(pipeline)
}

fn pipeline_datastore(database: &PathBuf) -> anyhow::Result<Arc<SqliteDatastore>> {
    Ok(Arc::new(SqliteDatastore::open(database)?))
}

fn run_benchmark(pipeline: &Pipeline, required_pass_rate: f64) -> anyhow::Result<()> {
    let mut passed = 0usize;
    for question in BENCH_QUESTIONS {
        let response = pipeline.ask(question);
        let status = if response.success { "PASS" } else { "FAIL" };
        let source = response
            .source
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{status}  [{source}] {question}");
        if status == "PASS" {
            passed += 1;
        }
    }
    let rate = passed as f64 / BENCH_QUESTIONS.len() as f64 * 100.0;
    println!("\npass rate: {rate:.1}% (required {required_pass_rate:.1}%)");

    let stats = pipeline.pipeline_stats();
    println!(
        "sources: {} deterministic, {} cache, {} few-shot, {} full-context, {} regenerated, {} failed",
        stats.deterministic,
        stats.cache_hits,
        stats.few_shot,
        stats.full_context,
        stats.regenerated,
        stats.failures
    );

    println!("\nmodel performance:");
    for (model, stats) in pipeline.performance_report() {
        println!(
            "  {model}: {}/{} ok ({:.1}%), avg {:.0} ms",
            stats.successes,
            stats.attempts,
            stats.success_rate(),
            stats.avg_time_ms()
        );
    }
    for (category, count) in pipeline.error_stats() {
        info!(category = %category, count, "validator rejections");
    }

    if rate < required_pass_rate {
        anyhow::bail!("benchmark below required pass rate");
    }
    Ok(())
}
