//! Persisted vector index with flat exact nearest-neighbor search.
//!
//! The index is a self-contained JSON artifact: embedded chunks plus the
//! embedding model identifier and dimensionality needed to detect a
//! build/query model mismatch. It is built offline, loaded read-only at query
//! time, and fully overwritten on rebuild — there is no incremental update
//! path.
//!
//! Search uses cosine similarity over a flat scan. The metric is identical at
//! build and query time by construction, since one structure serves both.

use std::fs;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};

/// A read-only index of embedded chunks supporting top-N search by cosine
/// similarity.
#[derive(Debug, Serialize, Deserialize)]
pub struct VectorIndex {
    embedding_model: String,
    dimensions: usize,
    chunks: Vec<Chunk>,
}

impl VectorIndex {
    /// Build an index over chunks that already carry embeddings.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexBuild`] when `chunks` is empty (an index must
    /// never be silently created from nothing) or when any embedding's length
    /// differs from `dimensions`.
    pub fn build(
        chunks: Vec<Chunk>,
        dimensions: usize,
        embedding_model: impl Into<String>,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(RagError::IndexBuild("cannot build an index from zero chunks".to_string()));
        }
        for chunk in &chunks {
            if chunk.embedding.len() != dimensions {
                return Err(RagError::IndexBuild(format!(
                    "chunk '{}' has embedding of length {}, expected {dimensions}",
                    chunk.id,
                    chunk.embedding.len()
                )));
            }
        }
        Ok(Self { embedding_model: embedding_model.into(), dimensions, chunks })
    }

    /// Persist the index to `path` as a self-contained artifact, creating
    /// parent directories and fully overwriting any previous artifact.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexBuild`] on any I/O or serialization failure.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                RagError::IndexBuild(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let file = File::create(path).map_err(|e| {
            RagError::IndexBuild(format!("cannot write index to {}: {e}", path.display()))
        })?;
        serde_json::to_writer(BufWriter::new(file), self).map_err(|e| {
            RagError::IndexBuild(format!("cannot serialize index to {}: {e}", path.display()))
        })?;

        info!(path = %path.display(), chunk_count = self.chunks.len(), "index saved");
        Ok(())
    }

    /// Load a previously saved index from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexLoad`] when the artifact is missing, corrupt,
    /// or internally inconsistent.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            RagError::IndexLoad(format!("cannot open index at {}: {e}", path.display()))
        })?;
        let index: VectorIndex = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            RagError::IndexLoad(format!("corrupt index artifact at {}: {e}", path.display()))
        })?;

        if index.chunks.iter().any(|c| c.embedding.len() != index.dimensions) {
            return Err(RagError::IndexLoad(format!(
                "index artifact at {} has embeddings inconsistent with its recorded dimensionality",
                path.display()
            )));
        }

        info!(path = %path.display(), chunk_count = index.chunks.len(), "index loaded");
        Ok(index)
    }

    /// Return the `fan_out` chunks nearest to `query_embedding`, ordered by
    /// non-increasing cosine similarity.
    ///
    /// An empty index yields an empty result, not an error.
    pub fn search(&self, query_embedding: &[f32], fan_out: usize) -> Vec<SearchResult> {
        let mut scored: Vec<SearchResult> = self
            .chunks
            .iter()
            .map(|chunk| SearchResult {
                chunk: chunk.clone(),
                score: cosine_similarity(&chunk.embedding, query_embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(fan_out);
        scored
    }

    /// The embedding model identifier recorded at build time.
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Dimensionality of the stored embeddings.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
