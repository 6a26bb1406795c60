//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur in RAG operations.
///
/// Configuration and input errors are raised before any I/O happens.
/// Backend errors (embedding, generation, storage) are never retried and
/// carry the original cause in `message`.
#[derive(Debug, Error)]
pub enum RagError {
    /// Chunk sizing or retrieval parameters are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// There was no text to chunk.
    #[error("Empty input: nothing to chunk")]
    EmptyInput,

    /// The embedding model is not loaded or cannot be reached.
    #[error("Embedding model unavailable ({provider}): {message}")]
    EmbeddingUnavailable {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The embedding model failed while embedding an input.
    #[error("Embedding failed ({provider}): {message}")]
    EmbeddingFailure {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The generative model is not loaded or cannot be reached.
    #[error("Generation model unavailable ({model}): {message}")]
    ModelUnavailable {
        /// The model that produced the error.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// The generative model failed during inference.
    #[error("Generation failed ({model}): {message}")]
    GenerationError {
        /// The model that produced the error.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector store backend failed.
    #[error("Storage error ({backend}): {message}")]
    StorageError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },
}

impl RagError {
    pub(crate) fn storage(backend: &str, message: impl Into<String>) -> Self {
        Self::StorageError { backend: backend.to_string(), message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
