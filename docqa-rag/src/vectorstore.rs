//! Storage backend trait for embedded documents.

use async_trait::async_trait;

use crate::document::{IndexedDocument, MetadataFilter, ScoredResult};
use crate::error::Result;

/// A storage engine for embedded documents with similarity search.
///
/// Implementations manage named collections of [`IndexedDocument`]s. The
/// [`VectorIndex`](crate::VectorIndex) wraps one collection of a store and is
/// the interface the rest of the pipeline uses.
///
/// Writers must be serialized against each other and readers must never
/// observe a partially written batch or a partially deleted set.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// The backend name used in logs and errors.
    fn backend(&self) -> &str;

    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data. No-op if it does not exist.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Replace a collection with an empty one of the same name.
    ///
    /// The default implementation deletes and recreates the collection in two
    /// steps. Backends that can do it under a single write lock should
    /// override it.
    async fn reset_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.delete_collection(name).await?;
        self.create_collection(name, dimensions).await
    }

    /// Insert a batch of documents atomically, preserving batch order.
    ///
    /// Fails without writing anything if any ID already exists.
    async fn insert(&self, collection: &str, documents: Vec<IndexedDocument>) -> Result<()>;

    /// Delete documents by ID, returning how many were removed.
    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<usize>;

    /// Delete every document matching `filter`, returning how many were removed.
    async fn delete_where(&self, collection: &str, filter: &MetadataFilter) -> Result<usize>;

    /// Return up to `top_k` documents nearest to `embedding`.
    ///
    /// Results are ordered by ascending cosine distance with ties broken by
    /// insertion order, restricted to documents matching `filter`.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredResult>>;

    /// Number of documents in the collection.
    async fn count(&self, collection: &str) -> Result<usize>;

    /// Every document in the collection, in insertion order.
    async fn list(&self, collection: &str) -> Result<Vec<IndexedDocument>>;
}

/// Cosine distance between two vectors: `1 - cosine_similarity`.
///
/// Lies in `[0, 2]`. A zero-magnitude vector is treated as orthogonal to
/// everything (distance `1.0`).
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    (1.0 - dot / (norm_a * norm_b)).clamp(0.0, 2.0)
}
