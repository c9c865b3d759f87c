//! Data types for corpus pages, chunks, and search results.

use serde::{Deserialize, Serialize};

/// One page of the source corpus.
///
/// Produced by the corpus loader and consumed by the chunker; not retained
/// after chunking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Zero-based position of the page in the source corpus.
    pub page: usize,
    /// The text content of the page.
    pub text: String,
}

/// A bounded span of corpus text with its vector embedding.
///
/// Chunks are the retrieval unit: they are embedded at index-build time and
/// returned by search and reranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk (`chunk_{index}`).
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text. Empty until the
    /// pipeline attaches one at index-build time.
    pub embedding: Vec<f32>,
}

/// A retrieved [`Chunk`] paired with its vector-similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The cosine similarity to the query (higher is more similar).
    pub score: f32,
}
