//! Embedding port: text in, fixed-length vector out.

use async_trait::async_trait;

use crate::error::Result;

/// A model that maps text to a fixed-length embedding vector.
///
/// Implementations must be deterministic for a fixed model version: the same
/// text always yields the same vector. Calls may be slow (model inference)
/// and are never retried by the pipeline.
///
/// # Errors
///
/// Implementations return [`RagError::EmbeddingUnavailable`] when the model is
/// not loaded or cannot be reached, and [`RagError::EmbeddingFailure`] when
/// inference on a particular input fails.
///
/// [`RagError::EmbeddingUnavailable`]: crate::RagError::EmbeddingUnavailable
/// [`RagError::EmbeddingFailure`]: crate::RagError::EmbeddingFailure
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// A short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of inputs, in input order.
    ///
    /// The default implementation calls [`embed`](EmbeddingProvider::embed)
    /// sequentially and stops at the first failure. Backends with native
    /// batching should override it.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Dimensionality of the vectors produced by this provider.
    fn dimensions(&self) -> usize;
}
