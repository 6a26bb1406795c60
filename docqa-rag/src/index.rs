//! The vector index: one collection of a [`VectorStore`] plus the embedding
//! model that populates it.

use std::sync::Arc;

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::document::{
    CHUNK_INDEX_KEY, Chunk, IndexedDocument, MetadataFilter, MetadataValue, ScoredResult,
};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// A similarity-searchable set of embedded chunks.
///
/// Identifiers are random UUIDs assigned at insert time, so concurrent
/// inserts never collide and an identifier is never handed out twice.
///
/// Inserts are all-or-nothing: every chunk is embedded before anything is
/// written, and the batch is written under a single store lock. If any
/// embedding fails, the index is left unchanged and the embedding error is
/// returned.
pub struct VectorIndex {
    collection: String,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl VectorIndex {
    /// Open (creating if needed) the collection `collection` in `store`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::StorageError`] if the collection cannot be created.
    pub async fn open(
        collection: impl Into<String>,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let collection = collection.into();
        store.create_collection(&collection, embedder.dimensions()).await.map_err(|e| {
            error!(collection = %collection, error = %e, "failed to open collection");
            e
        })?;
        info!(
            collection = %collection,
            backend = store.backend(),
            embedder = embedder.name(),
            "vector index ready"
        );
        Ok(Self { collection, store, embedder })
    }

    /// The collection name backing this index.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The embedding model used for documents and queries.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Embed the query text with the index's embedding model.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder.embed(text).await
    }

    /// Embed and store `chunks`, returning one fresh identifier per chunk in
    /// input order.
    ///
    /// # Errors
    ///
    /// Returns the embedding provider's error unchanged
    /// ([`RagError::EmbeddingFailure`] or [`RagError::EmbeddingUnavailable`])
    /// if any chunk fails to embed; nothing is stored in that case.
    /// Returns [`RagError::StorageError`] if the write fails.
    pub async fn insert(&self, chunks: &[Chunk]) -> Result<Vec<String>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await.map_err(|e| {
            error!(
                collection = %self.collection,
                chunk_count = chunks.len(),
                error = %e,
                "embedding failed, nothing inserted"
            );
            e
        })?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::EmbeddingFailure {
                provider: self.embedder.name().to_string(),
                message: format!(
                    "expected {} embeddings, provider returned {}",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }

        let documents: Vec<IndexedDocument> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                let mut metadata = chunk.metadata.clone();
                metadata
                    .insert(CHUNK_INDEX_KEY.to_string(), MetadataValue::from(chunk.chunk_index));
                IndexedDocument {
                    id: Uuid::new_v4().to_string(),
                    text: chunk.text.clone(),
                    metadata,
                    embedding,
                }
            })
            .collect();
        let ids: Vec<String> = documents.iter().map(|d| d.id.clone()).collect();

        self.store.insert(&self.collection, documents).await.map_err(|e| {
            error!(collection = %self.collection, error = %e, "insert failed");
            e
        })?;

        info!(collection = %self.collection, inserted = ids.len(), "inserted documents");
        Ok(ids)
    }

    /// Return up to `k` documents nearest to `query_vector`, ascending by
    /// distance, restricted to documents matching `filter`.
    ///
    /// An empty index or a filter that matches nothing yields an empty result.
    pub async fn search(
        &self,
        query_vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let filter = filter.filter(|f| !f.is_empty());
        let results = self.store.search(&self.collection, query_vector, k, filter).await?;
        debug!(collection = %self.collection, k, result_count = results.len(), "search completed");
        Ok(results)
    }

    /// Delete a single document. Returns whether it existed.
    pub async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let removed = self.store.delete(&self.collection, &[id]).await?;
        info!(collection = %self.collection, id, removed, "deleted document by id");
        Ok(removed > 0)
    }

    /// Delete every document whose `source` metadata equals `source`.
    /// Returns how many were removed.
    pub async fn delete_by_source(&self, source: &str) -> Result<usize> {
        let removed =
            self.store.delete_where(&self.collection, &MetadataFilter::source(source)).await?;
        info!(collection = %self.collection, source, removed, "deleted documents by source");
        Ok(removed)
    }

    /// Number of documents currently stored.
    pub async fn count(&self) -> Result<usize> {
        self.store.count(&self.collection).await
    }

    /// Every stored document, in insertion order.
    pub async fn get_all(&self) -> Result<Vec<IndexedDocument>> {
        self.store.list(&self.collection).await
    }

    /// Remove every document and recreate an empty collection of the same name.
    pub async fn clear(&self) -> Result<()> {
        self.store.reset_collection(&self.collection, self.embedder.dimensions()).await?;
        info!(collection = %self.collection, "cleared vector index");
        Ok(())
    }
}
