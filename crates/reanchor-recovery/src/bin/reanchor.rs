//! reanchor: command-line front end for the recovery engine.
//!
//! Reads a JSON batch, runs annotation recovery or connection remapping,
//! and writes the outcome partition plus a summary as JSON. Logs go to
//! stderr so stdout stays machine-readable.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use reanchor_core::{
    Chunk, Connection, OutcomeSummary, RecoveryConfig, RecoveryOutcomeSet, StoredReference,
};
use reanchor_recovery::{AnnotationRecoveryOrchestrator, ConnectionRemapOrchestrator};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "reanchor")]
#[command(author, version, about = "Recover annotations and connections after reprocessing")]
#[command(propagate_version = true)]
struct Cli {
    /// TOML config file with a [recovery] table (default: REANCHOR_CONFIG or env)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Recover annotation positions against the current document text
    Annotations {
        /// JSON file with document_text, chunks and references
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remap connections after a document was re-chunked
    Connections {
        /// JSON file with document_id, chunks, retained_embeddings and connections
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Deserialize)]
struct AnnotationBatch {
    document_text: String,
    #[serde(default)]
    chunks: Vec<Chunk>,
    references: Vec<StoredReference>,
}

#[derive(Debug, Deserialize)]
struct ConnectionBatch {
    document_id: Uuid,
    chunks: Vec<Chunk>,
    #[serde(default)]
    retained_embeddings: HashMap<Uuid, Vec<f32>>,
    connections: Vec<Connection>,
}

#[derive(Serialize)]
struct BatchReport<T> {
    summary: OutcomeSummary,
    outcomes: RecoveryOutcomeSet<T>,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "reanchor=info,reanchor_recovery=info,reanchor_match=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RecoveryConfig> {
    let config = match path {
        Some(path) => RecoveryConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RecoveryConfig::load().context("loading config from environment")?,
    };
    debug!(
        exact_policy = %config.exact_policy,
        fold_typography = config.fold_typography,
        "Configuration loaded"
    );
    Ok(config)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Annotations { input, output } => {
            cmd_annotations(config, &input, output.as_deref())?;
        }
        Commands::Connections { input, output } => {
            cmd_connections(&config, &input, output.as_deref())?;
        }
    }

    Ok(())
}

fn read_batch<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn write_report<T: Serialize>(report: &T, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn cmd_annotations(
    config: RecoveryConfig,
    input: &Path,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let batch: AnnotationBatch = read_batch(input)?;
    let orchestrator = AnnotationRecoveryOrchestrator::new(config);
    let outcomes =
        orchestrator.recover_annotations(&batch.references, &batch.document_text, &batch.chunks);

    let summary = outcomes.summary();
    info!(
        success = summary.success,
        needs_review = summary.needs_review,
        lost = summary.lost,
        "Annotations processed"
    );
    write_report(&BatchReport { summary, outcomes }, output)
}

fn cmd_connections(
    config: &RecoveryConfig,
    input: &Path,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let batch: ConnectionBatch = read_batch(input)?;
    let orchestrator = ConnectionRemapOrchestrator::new(config);
    let outcomes = orchestrator.remap_connections(
        &batch.connections,
        &batch.retained_embeddings,
        batch.document_id,
        &batch.chunks,
    );

    let summary = outcomes.summary();
    info!(
        success = summary.success,
        needs_review = summary.needs_review,
        lost = summary.lost,
        "Connections processed"
    );
    write_report(&BatchReport { summary, outcomes }, output)
}
