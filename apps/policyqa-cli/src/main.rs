//! `policyqa` command line: ingest policy documents and ask questions about them.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use policyqa_core::config::{Config, Settings};
use policyqa_core::types::{Outcome, Response, RetrievalResult};
use policyqa_rag::{check_citations, CorpusIndex, IngestReport, PolicyQa};

#[derive(Parser)]
#[command(name = "policyqa", version, about = "Answer questions from company policy documents")]
struct Cli {
    /// Directory holding config.toml; relative paths in it resolve from here.
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk, embed and index every document in a directory.
    Ingest {
        /// Defaults to `data.policies_dir`.
        dir: Option<PathBuf>,
        /// Clear the index first.
        #[arg(long)]
        reset: bool,
    },
    /// Ask a question and print a cited answer.
    Ask {
        question: String,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Print the full response as JSON.
        #[arg(long)]
        json: bool,
        /// Do not ingest the policies directory when the index is empty.
        #[arg(long)]
        no_auto_index: bool,
    },
    /// Show the nearest chunks for a query without generating an answer.
    Search {
        query: String,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Report index size and models in use.
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Delete every chunk from the index.
    Reset,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr).with_filter(filter))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{e:#}");
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_in(&cli.config_dir).context("loading configuration")?;
    let settings = config.settings()?;
    let policies_dir = config.resolve_path(&settings.data.policies_dir);

    match cli.command {
        Command::Ingest { dir, reset } => {
            let corpus = CorpusIndex::from_config(&config, &settings).await?;
            if reset {
                corpus.reset().await?;
            }
            let dir = dir.unwrap_or(policies_dir);
            let report = corpus.ingest(&dir).await?;
            print_ingest_report(&dir, &report);
        }
        Command::Ask { question, top_k, json, no_auto_index } => {
            let qa = PolicyQa::from_config(&config).await?;
            if !no_auto_index {
                if let Some(report) = qa.ensure_indexed(&policies_dir).await? {
                    print_ingest_report(&policies_dir, &report);
                }
            }
            let k = top_k.unwrap_or_else(|| qa.top_k());
            let response = qa.answer_with_k(&question, k).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_response(&response);
            }
        }
        Command::Search { query, top_k, json } => {
            let corpus = CorpusIndex::from_config(&config, &settings).await?;
            let k = top_k.unwrap_or(settings.retrieval.top_k);
            let results = corpus.search(&query, k).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_results(&results);
            }
        }
        Command::Stats { json } => {
            let corpus = CorpusIndex::from_config(&config, &settings).await?;
            let stats = corpus.stats().await?;
            if json {
                let value = serde_json::json!({
                    "total_chunks": stats.total_chunks,
                    "embedding_dim": stats.embedding_dim,
                    "model": settings.generation.model,
                    "similarity_threshold": settings.retrieval.similarity_threshold,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                print_stats(&settings, stats.total_chunks, stats.embedding_dim);
            }
        }
        Command::Reset => {
            let corpus = CorpusIndex::from_config(&config, &settings).await?;
            corpus.reset().await?;
            println!("Index cleared.");
        }
    }
    Ok(())
}

fn print_ingest_report(dir: &Path, report: &IngestReport) {
    println!("Indexed {}", dir.display());
    println!("  files processed: {}", report.files_processed);
    println!("  chunks built:    {}", report.chunks_built);
    println!("  chunks indexed:  {}", report.chunks_indexed);
    println!("  total in index:  {}", report.total_in_index);
    for skipped in &report.skipped {
        println!("  skipped {}: {}", skipped.path.display(), skipped.reason);
    }
}

fn print_response(response: &Response) {
    println!("{}", response.answer);
    if response.outcome != Outcome::Answered {
        return;
    }

    println!();
    println!("Sources:");
    for s in &response.sources {
        match &s.heading {
            Some(h) => println!("  - {} ({}) / {h}  similarity {:.3}", s.doc_id, s.source, s.similarity),
            None => println!("  - {} ({})  similarity {:.3}", s.doc_id, s.source, s.similarity),
        }
    }
    println!("Confidence: {:.3}", response.confidence);

    let report = check_citations(&response.answer, &response.sources);
    for c in &report.unknown {
        warn!(source = %c.source, doc_id = %c.doc_id, "answer cites a document that was not retrieved");
    }
}

fn print_results(results: &[RetrievalResult]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }
    for (rank, r) in results.iter().enumerate() {
        let meta = &r.chunk.metadata;
        println!(
            "{:>2}. {:.3}  {} ({}){}",
            rank + 1,
            r.similarity,
            meta.doc_id,
            meta.source,
            meta.heading.as_deref().map(|h| format!(" / {h}")).unwrap_or_default()
        );
        let preview: String = r.chunk.content.chars().take(160).collect();
        println!("    {}", preview.replace('\n', " "));
    }
}

fn print_stats(settings: &Settings, total_chunks: usize, embedding_dim: usize) {
    println!("Chunks in index:      {total_chunks}");
    println!("Embedding dimension:  {embedding_dim}");
    println!("Generation model:     {}", settings.generation.model);
    println!("Similarity threshold: {}", settings.retrieval.similarity_threshold);
}
