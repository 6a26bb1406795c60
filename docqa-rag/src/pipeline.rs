//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] ties the chunker, the [`VectorIndex`], the
//! [`Retriever`] and a [`GenerationProvider`] together. It owns ingestion
//! (chunk → embed → store), question answering (embed → search → filter →
//! assemble context → generate) and corpus statistics.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{RagPipeline, RagConfig, InMemoryVectorStore, QueryOptions, SourceType};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .generation_provider(Arc::new(my_model))
//!     .build()
//!     .await?;
//!
//! pipeline.ingest(text, "handbook.pdf", SourceType::Pdf, None).await?;
//! let outcome = pipeline.query("How do I reset it?", &QueryOptions::default()).await?;
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{
    IndexedDocument, Metadata, MetadataFilter, MetadataValue, SOURCE_KEY, SOURCE_TYPE_KEY,
    SourceType,
};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;
use crate::index::VectorIndex;
use crate::prompt::{NO_CONTEXT_ANSWER, SourceExcerpt, build_turns, format_context};
use crate::retriever::{RetrieveOptions, Retriever};
use crate::vectorstore::VectorStore;

/// Per-query options. Unset retrieval fields use the pipeline configuration.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Number of candidates to retrieve.
    pub top_k: Option<usize>,
    /// Exact-match metadata filter applied during search.
    pub filter: Option<MetadataFilter>,
    /// Minimum relevance score for context.
    pub relevance_threshold: Option<f32>,
    /// Whether to report the chunks used as context.
    pub return_sources: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self { top_k: None, filter: None, relevance_threshold: None, return_sources: true }
    }
}

impl QueryOptions {
    fn retrieve_options(&self) -> RetrieveOptions {
        RetrieveOptions {
            top_k: self.top_k,
            filter: self.filter.clone(),
            relevance_threshold: self.relevance_threshold,
        }
    }
}

/// The answer to a question and the context it was grounded in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryOutcome {
    /// The model's answer, trimmed.
    pub answer: String,
    /// Number of chunks used as context.
    pub num_sources: usize,
    /// The chunks used as context, best first, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceExcerpt>>,
}

/// Corpus statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Statistics {
    /// Number of stored chunks.
    pub total_documents: usize,
    /// Number of distinct `source` values.
    pub unique_sources: usize,
    /// The distinct `source` values, sorted.
    pub sources: Vec<String>,
}

/// Liveness of the pipeline's backends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthReport {
    /// `healthy` when every backend responded, `degraded` otherwise.
    pub status: String,
    /// `healthy` or `unhealthy: <cause>`.
    pub vector_store_status: String,
    /// Name of the embedding model.
    pub embedding_model: String,
    /// Name of the generation model.
    pub generation_model: String,
}

/// The RAG pipeline orchestrator. Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    chunker: Arc<dyn Chunker>,
    index: Arc<VectorIndex>,
    retriever: Retriever,
    generator: Arc<dyn GenerationProvider>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector index.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Chunk `text` and store the chunks, returning their identifiers in
    /// chunk order.
    ///
    /// Every chunk's metadata carries `source`, `source_type`, `chunk_index`
    /// and `start_index`, plus any `extra_metadata` (which cannot override
    /// `source` or `source_type`).
    ///
    /// # Errors
    ///
    /// [`RagError::EmptyInput`] if `text` has no content, otherwise the
    /// embedding or storage error unchanged. Ingestion is all-or-nothing.
    pub async fn ingest(
        &self,
        text: &str,
        source: &str,
        source_type: SourceType,
        extra_metadata: Option<&Metadata>,
    ) -> Result<Vec<String>> {
        let mut metadata = extra_metadata.cloned().unwrap_or_default();
        metadata.insert(SOURCE_KEY.to_string(), MetadataValue::from(source));
        metadata.insert(SOURCE_TYPE_KEY.to_string(), MetadataValue::from(source_type.as_str()));

        let chunks = self.chunker.chunk(text, &metadata).inspect_err(|e| {
            warn!(source, error = %e, "rejected ingestion input");
        })?;
        info!(
            source,
            %source_type,
            text_len = text.len(),
            chunk_count = chunks.len(),
            "chunked text"
        );

        let ids = self.index.insert(&chunks).await.inspect_err(|e| {
            error!(source, error = %e, "ingestion failed");
        })?;
        info!(source, chunk_count = ids.len(), "ingested text");
        Ok(ids)
    }

    /// Answer `question` from the indexed corpus.
    ///
    /// When retrieval finds nothing the fixed [`NO_CONTEXT_ANSWER`] is
    /// returned and the generation model is not called.
    ///
    /// # Errors
    ///
    /// Embedding, storage and generation errors are propagated unchanged.
    pub async fn query(&self, question: &str, options: &QueryOptions) -> Result<QueryOutcome> {
        info!(question, "processing query");

        let results = self
            .retriever
            .retrieve(question, &options.retrieve_options())
            .await
            .inspect_err(|e| error!(error = %e, "retrieval failed"))?;

        if results.is_empty() {
            warn!("no relevant documents found");
            return Ok(QueryOutcome {
                answer: NO_CONTEXT_ANSWER.to_string(),
                num_sources: 0,
                sources: options.return_sources.then(Vec::new),
            });
        }

        let context = format_context(&results);
        let turns = build_turns(question, &context);
        let answer = self.generator.generate(&turns).await.inspect_err(|e| {
            error!(model = self.generator.name(), error = %e, "generation failed");
        })?;

        let sources =
            options.return_sources.then(|| results.iter().map(SourceExcerpt::from).collect());
        info!(num_sources = results.len(), answer_len = answer.len(), "query answered");

        Ok(QueryOutcome { answer: answer.trim().to_string(), num_sources: results.len(), sources })
    }

    /// Count stored chunks and collect their distinct sources.
    pub async fn statistics(&self) -> Result<Statistics> {
        let total_documents = self.index.count().await?;
        let sources: BTreeSet<String> = self
            .index
            .get_all()
            .await?
            .iter()
            .map(|d| d.source().unwrap_or("Unknown").to_string())
            .collect();
        Ok(Statistics {
            total_documents,
            unique_sources: sources.len(),
            sources: sources.into_iter().collect(),
        })
    }

    /// Every stored chunk, in insertion order.
    pub async fn list_documents(&self) -> Result<Vec<IndexedDocument>> {
        self.index.get_all().await
    }

    /// Number of stored chunks.
    pub async fn count(&self) -> Result<usize> {
        self.index.count().await
    }

    /// Delete one chunk by identifier. Returns whether it existed.
    pub async fn delete_document(&self, id: &str) -> Result<bool> {
        self.index.delete_by_id(id).await
    }

    /// Delete every chunk from `source`. Returns how many were removed.
    pub async fn delete_source(&self, source: &str) -> Result<usize> {
        self.index.delete_by_source(source).await
    }

    /// Remove every chunk.
    pub async fn clear(&self) -> Result<()> {
        self.index.clear().await
    }

    /// Probe the vector store and report backend status.
    pub async fn health(&self) -> HealthReport {
        let vector_store_status = match self.index.count().await {
            Ok(_) => "healthy".to_string(),
            Err(e) => {
                warn!(error = %e, "vector store health check failed");
                format!("unhealthy: {e}")
            }
        };
        let status = if vector_store_status == "healthy" { "healthy" } else { "degraded" };
        HealthReport {
            status: status.to_string(),
            vector_store_status,
            embedding_model: self.index.embedding_provider().name().to_string(),
            generation_model: self.generator.name().to_string(),
        }
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// The embedding provider, vector store and generation provider are
/// required. The configuration defaults to [`RagConfig::default()`] and the
/// chunker to a [`RecursiveChunker`] built from it.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    generation_provider: Option<Arc<dyn GenerationProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the generation provider.
    pub fn generation_provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.generation_provider = Some(provider);
        self
    }

    /// Replace the default recursive chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Validate the configuration, open the index and build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if the configuration is
    /// invalid or a required component is missing, and
    /// [`RagError::StorageError`] if the collection cannot be opened.
    pub async fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let embedding_provider = self.embedding_provider.ok_or_else(|| {
            RagError::InvalidConfiguration("embedding_provider is required".to_string())
        })?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::InvalidConfiguration("vector_store is required".to_string()))?;
        let generator = self.generation_provider.ok_or_else(|| {
            RagError::InvalidConfiguration("generation_provider is required".to_string())
        })?;
        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(RecursiveChunker::from_config(&config)?),
        };

        let index = Arc::new(
            VectorIndex::open(config.collection_name.clone(), vector_store, embedding_provider)
                .await?,
        );
        let retriever = Retriever::new(Arc::clone(&index), &config);

        Ok(RagPipeline { config, chunker, index, retriever, generator })
    }
}
