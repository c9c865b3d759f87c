//! Cross-encoder reranking of retrieved candidates.
//!
//! Vector search is recall-oriented: the query and chunks are embedded
//! independently, so the ranking is coarse. The [`Reranker`] re-scores each
//! (query, candidate) pair with a [`CrossEncoder`] that encodes them jointly,
//! a stronger query-conditioned relevance signal, and keeps only the top-k.
//! The answer composer consumes reranker output exclusively, never raw search
//! results.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};

/// A relevance model that jointly encodes a query and a candidate text into
/// a scalar score, higher meaning more relevant.
#[async_trait]
pub trait CrossEncoder: Send + Sync {
    /// Name of the underlying model, used in error reports.
    fn name(&self) -> &str;

    /// Score a single (query, candidate) pair.
    async fn score(&self, query: &str, text: &str) -> Result<f32>;

    /// Score a batch of candidates against one query.
    ///
    /// The default implementation calls [`score`](CrossEncoder::score)
    /// sequentially. Override it if the backend scores batches natively.
    async fn score_batch(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(texts.len());
        for text in texts {
            scores.push(self.score(query, text).await?);
        }
        Ok(scores)
    }
}

/// Reorders search candidates by cross-encoder relevance.
pub struct Reranker {
    scorer: Arc<dyn CrossEncoder>,
}

impl Reranker {
    /// Create a reranker backed by the given cross-encoder.
    pub fn new(scorer: Arc<dyn CrossEncoder>) -> Self {
        Self { scorer }
    }

    /// Score `candidates` against `query` and return the `top_k` most
    /// relevant chunks in descending score order. Ties keep the candidates'
    /// original (retriever) order.
    ///
    /// Empty candidates yield an empty result without invoking the scorer.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Reranker`] when the scorer fails or returns a
    /// score count that does not match the candidate count.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<SearchResult>,
        top_k: usize,
    ) -> Result<Vec<Chunk>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = candidates.iter().map(|r| r.chunk.text.as_str()).collect();
        let scores = self.scorer.score_batch(query, &texts).await?;

        if scores.len() != candidates.len() {
            return Err(RagError::Reranker {
                reranker: self.scorer.name().to_string(),
                message: format!(
                    "scorer returned {} scores for {} candidates",
                    scores.len(),
                    candidates.len()
                ),
            });
        }

        let mut scored: Vec<(f32, Chunk)> =
            scores.into_iter().zip(candidates.into_iter().map(|r| r.chunk)).collect();
        // sort_by is stable: ties keep the original retriever order.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        debug!(kept = scored.len(), "candidates reranked");

        Ok(scored.into_iter().map(|(_, chunk)| chunk).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Scores each candidate with a fixed sequence, counting invocations.
    struct FixedScores {
        scores: Vec<f32>,
        calls: AtomicUsize,
    }

    impl FixedScores {
        fn new(scores: Vec<f32>) -> Self {
            Self { scores, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl CrossEncoder for FixedScores {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn score(&self, _query: &str, _text: &str) -> Result<f32> {
            unreachable!("batch scoring is always used")
        }

        async fn score_batch(&self, _query: &str, texts: &[&str]) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.scores[..texts.len()].to_vec())
        }
    }

    fn candidate(id: &str, score: f32) -> SearchResult {
        SearchResult {
            chunk: Chunk { id: id.to_string(), text: format!("текст {id}"), embedding: Vec::new() },
            score,
        }
    }

    #[tokio::test]
    async fn sorts_by_descending_relevance_and_truncates() {
        let reranker = Reranker::new(Arc::new(FixedScores::new(vec![0.2, 0.9, 0.5])));
        let candidates =
            vec![candidate("chunk_0", 0.8), candidate("chunk_1", 0.7), candidate("chunk_2", 0.6)];

        let ranked = reranker.rerank("вопрос", candidates, 2).await.unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, "chunk_1");
        assert_eq!(ranked[1].id, "chunk_2");
    }

    #[tokio::test]
    async fn ties_keep_retriever_order() {
        let reranker = Reranker::new(Arc::new(FixedScores::new(vec![0.5, 0.5, 0.5])));
        let candidates =
            vec![candidate("chunk_0", 0.9), candidate("chunk_1", 0.8), candidate("chunk_2", 0.7)];

        let ranked = reranker.rerank("вопрос", candidates, 3).await.unwrap();

        let ids: Vec<&str> = ranked.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["chunk_0", "chunk_1", "chunk_2"]);
    }

    #[tokio::test]
    async fn empty_candidates_skip_the_scorer() {
        let scorer = Arc::new(FixedScores::new(Vec::new()));
        let reranker = Reranker::new(scorer.clone());

        let ranked = reranker.rerank("вопрос", Vec::new(), 3).await.unwrap();

        assert!(ranked.is_empty());
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn top_k_larger_than_candidates_returns_all() {
        let reranker = Reranker::new(Arc::new(FixedScores::new(vec![0.3, 0.6])));
        let candidates = vec![candidate("chunk_0", 0.9), candidate("chunk_1", 0.8)];

        let ranked = reranker.rerank("вопрос", candidates, 10).await.unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, "chunk_1");
    }
}
