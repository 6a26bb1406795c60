//! # docqa-rag
//!
//! Retrieval-augmented question answering over a private text corpus.
//!
//! ## Overview
//!
//! Ingestion splits raw text with a [`RecursiveChunker`], embeds every chunk
//! with an [`EmbeddingProvider`] and stores it in a [`VectorIndex`]. A query
//! embeds the question, fetches the nearest chunks, keeps those that clear
//! the relevance threshold (falling back to the single best match), assembles
//! them into a numbered context block and asks a [`GenerationProvider`] to
//! answer from that context only.
//!
//! The embedding model, the language model and the storage engine are
//! traits, so any backend can be plugged in. [`InMemoryVectorStore`] is the
//! bundled store; it can persist a JSON snapshot to disk.
//!
//! ## Features
//!
//! - `openai`: OpenAI-compatible embedding and chat providers (also usable
//!   with local servers such as llama.cpp or Ollama).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_rag::{InMemoryVectorStore, QueryOptions, RagConfig, RagPipeline, SourceType};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::builder().chunk_size(256).chunk_overlap(50).build()?)
//!     .embedding_provider(Arc::new(embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .generation_provider(Arc::new(model))
//!     .build()
//!     .await?;
//!
//! pipeline.ingest("The sky is blue.", "a.txt", SourceType::Text, None).await?;
//! let outcome = pipeline.query("What color is the sky?", &QueryOptions::default()).await?;
//! println!("{}", outcome.answer);
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod inmemory;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod vectorstore;

pub use chunking::{Chunker, RecursiveChunker, TextSpan};
pub use config::{DEFAULT_SEPARATORS, FallbackPolicy, RagConfig, RagConfigBuilder};
pub use document::{
    Chunk, IndexedDocument, Metadata, MetadataFilter, MetadataValue, ScoredResult, SourceType,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::{GenerationProvider, Role, Turn};
pub use index::VectorIndex;
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{
    HealthReport, QueryOptions, QueryOutcome, RagPipeline, RagPipelineBuilder, Statistics,
};
pub use prompt::{NO_CONTEXT_ANSWER, SourceExcerpt};
pub use retriever::{RetrieveOptions, Retriever};
pub use vectorstore::VectorStore;
