//! Error types for the `kodeks-rag` crate.

use thiserror::Error;

/// Errors that can occur in the question-answering pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// The source corpus could not be read or contained no pages.
    #[error("Ingestion error: {0}")]
    Ingestion(String),

    /// A configuration parameter violated a stated invariant.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The index could not be built or persisted.
    #[error("Index build error: {0}")]
    IndexBuild(String),

    /// The index artifact was missing or corrupt at query time.
    #[error("Index load error: {0}")]
    IndexLoad(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during candidate reranking.
    #[error("Reranker error ({reranker}): {message}")]
    Reranker {
        /// The cross-encoder that produced the error.
        reranker: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation capability failed or returned no content.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The generation model that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error in the pipeline orchestration.
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

/// A convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, RagError>;
