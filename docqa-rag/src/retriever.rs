//! Relevance-filtered retrieval with a best-match fallback.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{FallbackPolicy, RagConfig};
use crate::document::{MetadataFilter, ScoredResult};
use crate::error::Result;
use crate::index::VectorIndex;

/// Per-call overrides for [`Retriever::retrieve`]. Unset fields use the
/// retriever's configured defaults.
#[derive(Debug, Clone, Default)]
pub struct RetrieveOptions {
    /// Number of candidates to fetch.
    pub top_k: Option<usize>,
    /// Exact-match metadata filter.
    pub filter: Option<MetadataFilter>,
    /// Minimum relevance score.
    pub relevance_threshold: Option<f32>,
}

/// Turns a question into a ranked list of context candidates.
///
/// The question is embedded, the `k` nearest documents are fetched and those
/// scoring below the relevance threshold are dropped. When every candidate is
/// dropped the [`FallbackPolicy`] decides what survives; with the default
/// [`FallbackPolicy::BestOnly`] exactly the best candidate is kept, so
/// retrieval only comes back empty when the (filtered) index is empty.
pub struct Retriever {
    index: Arc<VectorIndex>,
    top_k: usize,
    relevance_threshold: f32,
    fallback: FallbackPolicy,
}

impl Retriever {
    /// Create a retriever over `index` with the retrieval fields of `config`.
    pub fn new(index: Arc<VectorIndex>, config: &RagConfig) -> Self {
        Self {
            index,
            top_k: config.top_k,
            relevance_threshold: config.relevance_threshold,
            fallback: config.fallback,
        }
    }

    /// The index this retriever searches.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Retrieve context candidates for `question`, best first.
    ///
    /// # Errors
    ///
    /// Propagates embedding and storage errors unchanged. Finding nothing is
    /// not an error.
    pub async fn retrieve(
        &self,
        question: &str,
        options: &RetrieveOptions,
    ) -> Result<Vec<ScoredResult>> {
        let top_k = options.top_k.unwrap_or(self.top_k);
        let threshold = options.relevance_threshold.unwrap_or(self.relevance_threshold);

        let query_vector = self.index.embed_query(question).await?;
        let candidates = self.index.search(&query_vector, top_k, options.filter.as_ref()).await?;
        let selected = apply_threshold(candidates, threshold, self.fallback);

        info!(top_k, threshold, selected = selected.len(), "retrieval completed");
        Ok(selected)
    }
}

/// Keep candidates scoring at least `threshold`, falling back according to
/// `fallback` when none do. `candidates` must be ordered best first.
pub fn apply_threshold(
    candidates: Vec<ScoredResult>,
    threshold: f32,
    fallback: FallbackPolicy,
) -> Vec<ScoredResult> {
    if candidates.is_empty() {
        return candidates;
    }

    let passing: Vec<ScoredResult> =
        candidates.iter().filter(|r| r.relevance_score >= threshold).cloned().collect();
    if !passing.is_empty() {
        return passing;
    }

    warn!(
        candidates = candidates.len(),
        threshold,
        ?fallback,
        "no candidate met the relevance threshold"
    );
    match fallback {
        FallbackPolicy::BestOnly => candidates.into_iter().take(1).collect(),
        FallbackPolicy::AllCandidates => candidates,
    }
}
