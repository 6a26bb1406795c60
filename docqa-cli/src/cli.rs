//! Command-line surface and command dispatch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use docqa_rag::document::{SOURCE_KEY, SOURCE_TYPE_KEY};
use docqa_rag::openai::{OpenAIChatProvider, OpenAIEmbeddingProvider};
use docqa_rag::{
    InMemoryVectorStore, Metadata, MetadataFilter, MetadataValue, QueryOptions, QueryOutcome,
    RagPipeline, SourceType,
};
use serde::Serialize;
use tracing::info;

use crate::config::{AppConfig, api_key};

#[derive(Parser, Debug)]
#[command(name = "docqa")]
#[command(about = "Ask questions about your own documents", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a YAML config file (defaults to ./docqa.yaml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk, embed and store a plain-text file
    Ingest(IngestArgs),
    /// Answer a question from the stored documents
    Query(QueryArgs),
    /// Show chunk and source counts
    Stats,
    /// List stored chunks
    List,
    /// Delete every chunk from a source
    DeleteSource {
        /// Source name as given at ingestion
        source: String,
    },
    /// Delete one chunk by id
    Delete {
        /// Chunk identifier
        id: String,
    },
    /// Remove every stored chunk
    Clear,
    /// Check that the backends are reachable
    Health,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Plain-text file; extract PDF or HTML content to text before ingesting
    pub file: PathBuf,

    /// Source name recorded on every chunk (defaults to the file name)
    #[arg(long)]
    pub source: Option<String>,

    /// Origin kind: pdf, web or text (web for .html/.htm, text otherwise)
    #[arg(long)]
    pub source_type: Option<SourceType>,

    /// Extra metadata as key=value, repeatable
    #[arg(long = "meta", value_parser = parse_key_value)]
    pub meta: Vec<(String, MetadataValue)>,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// The question to answer
    pub question: String,

    /// Number of candidate chunks to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Minimum relevance score for a chunk to be used as context
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Do not print the chunks used as context
    #[arg(long)]
    pub no_sources: bool,

    /// Restrict retrieval to chunks whose metadata matches key=value, repeatable
    #[arg(long = "filter", value_parser = parse_key_value)]
    pub filter: Vec<(String, MetadataValue)>,
}

/// Parse `key=value`, typing the value as integer, float, bool or string.
///
/// The reserved `source` and `source_type` keys always hold strings.
pub fn parse_key_value(input: &str) -> Result<(String, MetadataValue), String> {
    let (key, value) =
        input.split_once('=').ok_or_else(|| format!("expected key=value, got '{input}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{input}'"));
    }
    let value = value.trim();
    let value = if key == SOURCE_KEY || key == SOURCE_TYPE_KEY {
        MetadataValue::from(value)
    } else {
        parse_value(value)
    };
    Ok((key.to_string(), value))
}

// `nan` and `inf` stay strings; the store rejects non-finite floats.
fn parse_value(value: &str) -> MetadataValue {
    if let Ok(i) = value.parse::<i64>() {
        MetadataValue::Int(i)
    } else if let Some(f) = value.parse::<f64>().ok().filter(|f| f.is_finite()) {
        MetadataValue::Float(f)
    } else if let Ok(b) = value.parse::<bool>() {
        MetadataValue::Bool(b)
    } else {
        MetadataValue::Str(value.to_string())
    }
}

/// Infer the source type from a file extension.
///
/// Only text-bearing extensions are recognised; a PDF must be extracted to
/// text first and tagged with `--source-type pdf`.
pub fn source_type_for(path: &Path) -> SourceType {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("html" | "htm") => SourceType::Web,
        _ => SourceType::Text,
    }
}

/// Wire the pipeline from configuration.
pub async fn build_pipeline(config: &AppConfig) -> anyhow::Result<RagPipeline> {
    let embedder = OpenAIEmbeddingProvider::new(api_key(config.embedding.api_key_env.as_deref())?)
        .with_base_url(&config.embedding.base_url)
        .with_model(&config.embedding.model)
        .with_native_dimensions(config.embedding.dimensions);
    let generator = OpenAIChatProvider::new(
        api_key(config.llm.api_key_env.as_deref())?,
        &config.llm.model,
    )
    .with_base_url(&config.llm.base_url)
    .with_sampling(config.llm.sampling());
    let store = InMemoryVectorStore::persistent(&config.storage.persist_directory)
        .context("cannot open vector store")?;

    let pipeline = RagPipeline::builder()
        .config(config.rag.clone())
        .embedding_provider(Arc::new(embedder))
        .vector_store(Arc::new(store))
        .generation_provider(Arc::new(generator))
        .build()
        .await?;
    info!(
        persist_directory = %config.storage.persist_directory.display(),
        embedding_model = %config.embedding.model,
        llm_model = %config.llm.model,
        "pipeline ready"
    );
    Ok(pipeline)
}

/// Run one command against the pipeline, printing its result to stdout.
pub async fn run(pipeline: &RagPipeline, command: Commands, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::Ingest(args) => {
            let text = tokio::fs::read_to_string(&args.file)
                .await
                .with_context(|| format!("cannot read '{}'", args.file.display()))?;
            let source = match args.source {
                Some(source) => source,
                None => file_name(&args.file)?,
            };
            let source_type = args.source_type.unwrap_or_else(|| source_type_for(&args.file));
            let extra: Metadata = args.meta.into_iter().collect();
            let ids = pipeline
                .ingest(&text, &source, source_type, (!extra.is_empty()).then_some(&extra))
                .await?;
            if json {
                print_json(&serde_json::json!({ "source": source, "chunk_ids": ids }))?;
            } else {
                println!("Ingested {} chunks from {source}", ids.len());
            }
        }
        Commands::Query(args) => {
            let filter = (!args.filter.is_empty())
                .then(|| args.filter.into_iter().collect::<MetadataFilter>());
            let options = QueryOptions {
                top_k: args.top_k,
                filter,
                relevance_threshold: args.threshold,
                return_sources: !args.no_sources,
            };
            let outcome = pipeline.query(&args.question, &options).await?;
            if json { print_json(&outcome)? } else { print_outcome(&outcome) }
        }
        Commands::Stats => {
            let stats = pipeline.statistics().await?;
            if json {
                print_json(&stats)?;
            } else {
                println!("Chunks:  {}", stats.total_documents);
                println!("Sources: {}", stats.unique_sources);
                for source in &stats.sources {
                    println!("  - {source}");
                }
            }
        }
        Commands::List => {
            let documents = pipeline.list_documents().await?;
            if json {
                let listing: Vec<_> = documents
                    .iter()
                    .map(|d| {
                        serde_json::json!({ "id": d.id, "text": d.text, "metadata": d.metadata })
                    })
                    .collect();
                print_json(&listing)?;
            } else {
                for document in &documents {
                    let source = document.source().unwrap_or("Unknown");
                    println!("{}  {source}  {} chars", document.id, document.text.chars().count());
                }
            }
        }
        Commands::DeleteSource { source } => {
            let removed = pipeline.delete_source(&source).await?;
            println!("Deleted {removed} chunks from {source}");
        }
        Commands::Delete { id } => {
            if !pipeline.delete_document(&id).await? {
                bail!("no chunk with id '{id}'");
            }
            println!("Deleted {id}");
        }
        Commands::Clear => {
            pipeline.clear().await?;
            println!("Cleared all chunks");
        }
        Commands::Health => {
            let report = pipeline.health().await;
            if json {
                print_json(&report)?;
            } else {
                println!("Status:        {}", report.status);
                println!("Vector store:  {}", report.vector_store_status);
                println!("Embeddings:    {}", report.embedding_model);
                println!("Generation:    {}", report.generation_model);
            }
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("'{}' has no file name; pass --source", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_outcome(outcome: &QueryOutcome) {
    println!("{}", outcome.answer);
    let Some(sources) = &outcome.sources else { return };
    if sources.is_empty() {
        return;
    }
    println!();
    println!("Sources ({}):", outcome.num_sources);
    for (i, excerpt) in sources.iter().enumerate() {
        let source = excerpt.metadata.get(SOURCE_KEY).map(ToString::to_string);
        println!(
            "  [{}] {} (relevance {:.3})",
            i + 1,
            source.as_deref().unwrap_or("Unknown"),
            excerpt.relevance_score
        );
    }
}
