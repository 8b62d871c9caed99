//! # LogLens CLI (`loglens`)
//!
//! The `loglens` binary drives the ingestion and retrieval pipeline. The
//! corpus goes to stdout; progress and diagnostics go to stderr, so stdout
//! stays parseable for scripts.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `loglens ingest <dir>` | Normalize a directory of logs into a corpus |
//! | `loglens recall <dir>` | Ingest, then print similar stored analyses plus the corpus |
//! | `loglens remember` | Store an analysis text in the vector store |
//! | `loglens search <text>` | Find stored analyses similar to a text |
//! | `loglens stats` | Show vector store statistics |
//! | `loglens clear` | Reset the vector store |
//!
//! All commands accept `--config` pointing to a TOML file; without one the
//! built-in defaults apply.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use loglens::config::{self, Config};
use loglens::embedding::{create_embedder, Embedder};
use loglens::eventlog::UnavailableEventLog;
use loglens::ingest::{IngestReport, Ingestor};
use loglens::progress::{ProgressEvent, ProgressMode};
use loglens::store::VectorStore;

/// LogLens — a local-first log ingestion and retrieval engine.
#[derive(Parser)]
#[command(
    name = "loglens",
    about = "LogLens — normalize heterogeneous logs and recall similar past analyses",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply if absent.
    #[arg(long, global = true, default_value = "./loglens.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize every supported log under a directory into one corpus.
    ///
    /// The corpus is printed to stdout, one normalized record per line.
    Ingest {
        /// Root directory to ingest.
        path: PathBuf,

        /// Progress output: off, human, or json. Defaults by TTY.
        #[arg(long)]
        progress: Option<String>,

        /// Override the configured line cap for this run.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Ingest a directory, then print the most similar stored analyses
    /// followed by the corpus.
    ///
    /// Requires an embedding provider to be configured.
    Recall {
        /// Root directory to ingest.
        path: PathBuf,

        /// Number of similar analyses to retrieve.
        #[arg(short)]
        k: Option<usize>,

        /// Progress output: off, human, or json. Defaults by TTY.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Store an analysis text in the vector store.
    Remember {
        /// The text to store.
        text: Option<String>,

        /// Read the text from a file instead.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Find stored analyses similar to a query text.
    Search {
        /// Query text.
        text: String,

        /// Number of results.
        #[arg(short)]
        k: Option<usize>,
    },

    /// Show vector store statistics.
    Stats,

    /// Reset the vector store to empty.
    Clear {
        /// Confirm the reset.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Ingest {
            path,
            progress,
            limit,
        } => {
            let report = run_ingest(&cfg, &path, progress.as_deref(), limit).await?;
            println!("{}", report.corpus);
        }
        Commands::Recall { path, k, progress } => {
            require_embeddings(&cfg)?;
            let report = run_ingest(&cfg, &path, progress.as_deref(), None).await?;
            let embedder = create_embedder(&cfg.embedding)?;
            let store = VectorStore::open(&cfg.store.path)?;

            let query = embedder.embed(&report.corpus).await?;
            let k = k.unwrap_or(cfg.store.default_k);
            let similar = store.search(&query, k);

            if similar.is_empty() {
                eprintln!("No similar analyses stored yet.");
            } else {
                println!("=== similar analyses ({}) ===", similar.len());
                for (i, text) in similar.iter().enumerate() {
                    println!("--- match {} ---", i + 1);
                    println!("{}", text);
                }
            }
            println!("=== corpus ===");
            println!("{}", report.corpus);
        }
        Commands::Remember { text, file } => {
            let text = match (text, file) {
                (Some(t), None) => t,
                (None, Some(path)) => std::fs::read_to_string(&path)?,
                _ => anyhow::bail!("provide exactly one of <text> or --file"),
            };
            require_embeddings(&cfg)?;
            let embedder = create_embedder(&cfg.embedding)?;
            let mut store = VectorStore::open(&cfg.store.path)?;
            store.add(embedder.as_ref(), &text).await?;
            println!("stored ({} records total)", store.len());
        }
        Commands::Search { text, k } => {
            require_embeddings(&cfg)?;
            let embedder = create_embedder(&cfg.embedding)?;
            let store = VectorStore::open(&cfg.store.path)?;
            let query = embedder.embed(&text).await?;
            let results = store.search(&query, k.unwrap_or(cfg.store.default_k));
            if results.is_empty() {
                println!("No results.");
            } else {
                for (i, result) in results.iter().enumerate() {
                    println!("--- match {} ---", i + 1);
                    println!("{}", result);
                }
            }
        }
        Commands::Stats => {
            let store = VectorStore::open(&cfg.store.path)?;
            let stats = store.stats();
            println!("LogLens — Vector Store Stats");
            println!("============================");
            println!();
            println!("  Location:    {}", stats.path.display());
            println!("  Records:     {}", stats.total_records);
            println!("  Dimension:   {}", stats.dimension);
        }
        Commands::Clear { yes } => {
            if !yes {
                anyhow::bail!("refusing to clear the store without --yes");
            }
            let mut store = VectorStore::open(&cfg.store.path)?;
            store.clear()?;
            println!("store cleared");
        }
    }

    Ok(())
}

fn require_embeddings(cfg: &Config) -> Result<()> {
    if !cfg.embedding.is_enabled() {
        anyhow::bail!("this command requires embeddings. Set [embedding] provider in config.");
    }
    Ok(())
}

/// Run one ingestion with a progress drain attached.
async fn run_ingest(
    cfg: &Config,
    path: &PathBuf,
    progress: Option<&str>,
    limit: Option<usize>,
) -> Result<IngestReport> {
    let mode = match progress {
        Some("off") => ProgressMode::Off,
        Some("human") => ProgressMode::Human,
        Some("json") => ProgressMode::Json,
        Some(other) => anyhow::bail!("unknown progress mode: {} (off, human, json)", other),
        None => ProgressMode::default_for_tty(),
    };
    let reporter = mode.reporter();

    let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
    let drain = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            reporter.report(&event);
        }
    });

    let mut ingest_config = cfg.ingest.clone();
    if let Some(limit) = limit {
        ingest_config.max_lines = limit;
    }

    let mut ingestor = Ingestor::new(ingest_config, Arc::new(UnavailableEventLog));
    let result = ingestor.run(path, &tx).await;

    drop(tx);
    let _ = drain.await;

    Ok(result?)
}
