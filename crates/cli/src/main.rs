//! tablesink - pipe NDJSON into a ClickHouse table
//!
//! # Usage
//!
//! ```bash
//! # append every object read from stdin to raw.orders
//! tablesink --config tablesink.toml --table orders --schema orders.json < orders.ndjson
//!
//! # replace the table's content; an empty line ends a cycle
//! producer | tablesink --table totals --schema totals.json --disposition truncate
//! ```
//!
//! The schema file is a JSON array of fields, e.g.
//! `[{"name": "id", "type": "string", "required": true}]`.

mod ingest;
mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use tablesink::{
    Disposition, EnvSecretsManager, FieldSchema, FlushError, Schema, SinkBuilder,
};
use tablesink_config::Config;
use tablesink_metrics::{CounterRegistry, spawn_reporter};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// tablesink - batch NDJSON records from stdin into a ClickHouse table
#[derive(Parser, Debug)]
#[command(name = "tablesink")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "TABLESINK_CONFIG")]
    config: Option<PathBuf>,

    /// Target table name
    #[arg(short, long)]
    table: String,

    /// JSON file with the table's fields
    #[arg(short, long)]
    schema: PathBuf,

    /// How each cycle treats the table's existing rows
    #[arg(short, long, value_enum, default_value_t = DispositionArg::Append)]
    disposition: DispositionArg,

    /// Fetch warehouse credentials from TABLESINK_SECRET_* variables
    #[arg(long)]
    secrets_from_env: bool,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long)]
    log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DispositionArg {
    Append,
    Truncate,
}

impl From<DispositionArg> for Disposition {
    fn from(arg: DispositionArg) -> Self {
        match arg {
            DispositionArg::Append => Disposition::Append,
            DispositionArg::Truncate => Disposition::Truncate,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.log.level.as_str().to_string());
    logging::init_logging(&config.log, &level)?;

    let schema = load_schema(&cli.schema, &cli.table, cli.disposition.into())?;
    run(cli, config, schema).await
}

fn load_schema(path: &Path, table: &str, disposition: Disposition) -> Result<Schema> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema {}", path.display()))?;
    let fields: Vec<FieldSchema> = serde_json::from_str(&contents)
        .with_context(|| format!("invalid schema {}", path.display()))?;
    if fields.is_empty() {
        bail!("schema {} has no fields", path.display());
    }
    Ok(Schema::new(table, disposition).with_fields(fields))
}

async fn run(cli: Cli, config: Config, schema: Schema) -> Result<()> {
    let registry = Arc::new(CounterRegistry::new());
    let cancel = CancellationToken::new();
    let reporter = spawn_reporter(registry.clone(), &config.metrics, cancel.clone());

    let (error_tx, error_rx) = mpsc::channel(16);
    let printer = tokio::spawn(print_errors(error_rx));

    let mut builder = SinkBuilder::from_config(&config)
        .with_metrics(registry.clone())
        .with_error_output(error_tx);
    if cli.secrets_from_env {
        builder = builder.with_secrets(Arc::new(EnvSecretsManager::new()));
    }
    let stream = builder.register_stream(&cli.table, schema);
    let sink = builder.start().await.context("failed to start sink")?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let summary = tokio::select! {
        summary = ingest::ingest(stdin, &stream) => Some(summary?),
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, stopping without a final flush");
            None
        }
    };
    drop(stream);

    match summary {
        Some(summary) => {
            info!(
                records = summary.records,
                cycles = summary.cycles,
                skipped = summary.skipped,
                "input exhausted"
            );
            sink.join().await;
        }
        None => sink.shutdown().await,
    }

    let failures = printer.await.context("error printer failed")?;

    cancel.cancel();
    if let Some(reporter) = reporter {
        let _ = reporter.await;
    }

    if failures > 0 {
        bail!("{failures} flush(es) failed");
    }
    Ok(())
}

/// Print forwarded flush failures until the sink stops; returns their count
async fn print_errors(mut errors: mpsc::Receiver<FlushError>) -> usize {
    let mut count = 0;
    while let Some(err) = errors.recv().await {
        count += 1;
        eprintln!("flush of stream '{}' failed: {err}", err.stream());
    }
    count
}
