//! In-memory vector store using cosine distance.
//!
//! [`InMemoryVectorStore`] keeps every collection in a `HashMap` guarded by a
//! `tokio::sync::RwLock`. Searches take the read lock and so see a consistent
//! snapshot; inserts, deletes and resets take the write lock and are
//! serialized. A store opened with [`InMemoryVectorStore::persistent`] also
//! writes a JSON snapshot to disk after every mutation and reloads it on open.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::document::{IndexedDocument, MetadataFilter, ScoredResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, cosine_distance};

const BACKEND: &str = "InMemory";
const SNAPSHOT_FILE: &str = "vector_store.json";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Collection {
    dimensions: usize,
    /// Insertion order doubles as the search tie-breaker.
    documents: Vec<IndexedDocument>,
}

/// An in-memory vector store, optionally persisted to a JSON snapshot.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::persistent("./data/vectors")?;
/// store.create_collection("documents", 384).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
    snapshot_path: Option<PathBuf>,
}

impl InMemoryVectorStore {
    /// Create a new empty, non-persistent store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store persisted under `directory`, loading any existing snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::StorageError`] if the directory cannot be created
    /// or an existing snapshot cannot be read or parsed.
    pub fn persistent(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref();
        std::fs::create_dir_all(directory).map_err(|e| {
            RagError::storage(BACKEND, format!("cannot create '{}': {e}", directory.display()))
        })?;

        let path = directory.join(SNAPSHOT_FILE);
        let collections = if path.exists() {
            let bytes = std::fs::read(&path).map_err(|e| {
                RagError::storage(BACKEND, format!("cannot read '{}': {e}", path.display()))
            })?;
            let collections: HashMap<String, Collection> =
                serde_json::from_slice(&bytes).map_err(|e| {
                    let message = format!("corrupt snapshot '{}': {e}", path.display());
                    RagError::storage(BACKEND, message)
                })?;
            info!(
                path = %path.display(),
                collections = collections.len(),
                "loaded vector store snapshot"
            );
            collections
        } else {
            HashMap::new()
        };

        Ok(Self { collections: RwLock::new(collections), snapshot_path: Some(path) })
    }

    /// Where the snapshot is written, if this store is persistent.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Apply `mutate` under the write lock and persist the result.
    ///
    /// For a persistent store the mutation runs on a copy that replaces the
    /// live map only once the snapshot is on disk, so a failed write leaves
    /// memory and disk both unchanged. `mutate` returns the call's result and
    /// whether anything changed.
    async fn commit<T>(
        &self,
        mutate: impl FnOnce(&mut HashMap<String, Collection>) -> Result<(T, bool)>,
    ) -> Result<T> {
        let mut collections = self.collections.write().await;
        let Some(path) = &self.snapshot_path else {
            return mutate(&mut *collections).map(|(output, _)| output);
        };

        let mut next = collections.clone();
        let (output, changed) = mutate(&mut next)?;
        if changed {
            write_snapshot(path, &next).await?;
            *collections = next;
        }
        Ok(output)
    }
}

/// Write the snapshot to a temporary file and rename it over the old one.
async fn write_snapshot(path: &Path, collections: &HashMap<String, Collection>) -> Result<()> {
    let bytes = serde_json::to_vec(collections)
        .map_err(|e| RagError::storage(BACKEND, format!("cannot serialize snapshot: {e}")))?;

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes).await.map_err(|e| {
        RagError::storage(BACKEND, format!("cannot write '{}': {e}", tmp.display()))
    })?;
    tokio::fs::rename(&tmp, path).await.map_err(|e| {
        RagError::storage(BACKEND, format!("cannot replace '{}': {e}", path.display()))
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "flushed vector store snapshot");
    Ok(())
}

fn missing(collection: &str) -> RagError {
    RagError::storage(BACKEND, format!("collection '{collection}' does not exist"))
}

fn check_dimensions(collection: &Collection, embedding: &[f32]) -> Result<()> {
    if collection.dimensions != 0 && embedding.len() != collection.dimensions {
        return Err(RagError::storage(
            BACKEND,
            format!(
                "embedding has {} dimensions, collection expects {}",
                embedding.len(),
                collection.dimensions
            ),
        ));
    }
    Ok(())
}

/// JSON has no representation for NaN or infinity, so a snapshot holding one
/// could never be read back.
fn check_finite(document: &IndexedDocument) -> Result<()> {
    if !document.embedding.iter().all(|x| x.is_finite()) {
        return Err(RagError::storage(
            BACKEND,
            format!("document '{}' has a non-finite embedding value", document.id),
        ));
    }
    if let Some((key, _)) = document.metadata.iter().find(|(_, v)| !v.is_finite()) {
        return Err(RagError::storage(
            BACKEND,
            format!("document '{}' has a non-finite value for metadata '{key}'", document.id),
        ));
    }
    Ok(())
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.commit(|collections| {
            if collections.contains_key(name) {
                return Ok(((), false));
            }
            collections.insert(name.to_string(), Collection { dimensions, documents: Vec::new() });
            Ok(((), true))
        })
        .await
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.commit(|collections| Ok(((), collections.remove(name).is_some()))).await
    }

    async fn reset_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.commit(|collections| {
            collections.insert(name.to_string(), Collection { dimensions, documents: Vec::new() });
            Ok(((), true))
        })
        .await
    }

    async fn insert(&self, collection: &str, documents: Vec<IndexedDocument>) -> Result<()> {
        self.commit(|collections| {
            let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;

            let mut seen: HashSet<&str> = store.documents.iter().map(|d| d.id.as_str()).collect();
            for document in &documents {
                check_dimensions(store, &document.embedding)?;
                check_finite(document)?;
                if !seen.insert(document.id.as_str()) {
                    let message = format!("duplicate id '{}'", document.id);
                    return Err(RagError::storage(BACKEND, message));
                }
            }

            let changed = !documents.is_empty();
            store.documents.extend(documents);
            Ok(((), changed))
        })
        .await
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<usize> {
        self.commit(|collections| {
            let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
            let before = store.documents.len();
            store.documents.retain(|d| !ids.contains(&d.id.as_str()));
            let removed = before - store.documents.len();
            Ok((removed, removed > 0))
        })
        .await
    }

    async fn delete_where(&self, collection: &str, filter: &MetadataFilter) -> Result<usize> {
        self.commit(|collections| {
            let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
            let before = store.documents.len();
            store.documents.retain(|d| !filter.matches(&d.metadata));
            let removed = before - store.documents.len();
            Ok((removed, removed > 0))
        })
        .await
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredResult>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;
        check_dimensions(store, embedding)?;

        let mut scored: Vec<ScoredResult> = store
            .documents
            .iter()
            .filter(|d| filter.is_none_or(|f| f.matches(&d.metadata)))
            .map(|d| ScoredResult::new(d, cosine_distance(&d.embedding, embedding)))
            .collect();

        // Stable sort: equal distances keep insertion order.
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;
        Ok(store.documents.len())
    }

    async fn list(&self, collection: &str) -> Result<Vec<IndexedDocument>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;
        Ok(store.documents.clone())
    }
}
