//! Clients for a Hugging Face text-embeddings-inference server.
//!
//! TEI serves both embedding models (`POST /embed`) and cross-encoder
//! rerankers (`POST /rerank`) behind one HTTP interface, which covers both
//! retrieval-side capabilities of this pipeline. Run one server per model.
//!
//! This module is only available when the `tei` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::reranker::CrossEncoder;

/// An [`EmbeddingProvider`] backed by a TEI `/embed` endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use kodeks_rag::tei::TeiEmbeddingClient;
///
/// let provider = TeiEmbeddingClient::new("http://localhost:8080", 384);
/// let embedding = provider.embed("текст статьи").await?;
/// ```
pub struct TeiEmbeddingClient {
    client: reqwest::Client,
    base_url: String,
    dimensions: usize,
}

impl TeiEmbeddingClient {
    /// Create a client for the TEI server at `base_url`.
    ///
    /// `dimensions` must match the embedding model the server hosts.
    pub fn new(base_url: impl Into<String>, dimensions: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            dimensions,
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: Vec<&'a str>,
}

#[async_trait]
impl EmbeddingProvider for TeiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::Embedding {
            provider: "TEI".into(),
            message: "server returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = "TEI", batch_size = texts.len(), "embedding batch");

        let response = self
            .client
            .post(format!("{}/embed", self.base_url))
            .json(&EmbedRequest { inputs: texts.to_vec() })
            .send()
            .await
            .map_err(|e| {
                error!(provider = "TEI", error = %e, "embed request failed");
                RagError::Embedding { provider: "TEI".into(), message: format!("request failed: {e}") }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = "TEI", %status, "embed endpoint returned an error");
            return Err(RagError::Embedding {
                provider: "TEI".into(),
                message: format!("server returned {status}: {body}"),
            });
        }

        let embeddings: Vec<Vec<f32>> = response.json().await.map_err(|e| {
            RagError::Embedding {
                provider: "TEI".into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// A [`CrossEncoder`] backed by a TEI `/rerank` endpoint.
pub struct TeiCrossEncoder {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl TeiCrossEncoder {
    /// Create a client for the TEI reranker server at `base_url`.
    ///
    /// `model` is the cross-encoder identifier the server hosts, reported in
    /// error messages.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: Vec<&'a str>,
}

#[derive(Deserialize)]
struct RerankEntry {
    index: usize,
    score: f32,
}

#[async_trait]
impl CrossEncoder for TeiCrossEncoder {
    fn name(&self) -> &str {
        &self.model
    }

    async fn score(&self, query: &str, text: &str) -> Result<f32> {
        let scores = self.score_batch(query, &[text]).await?;
        scores.into_iter().next().ok_or_else(|| RagError::Reranker {
            reranker: self.model.clone(),
            message: "server returned empty response".into(),
        })
    }

    async fn score_batch(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(reranker = %self.model, batch_size = texts.len(), "scoring batch");

        let response = self
            .client
            .post(format!("{}/rerank", self.base_url))
            .json(&RerankRequest { query, texts: texts.to_vec() })
            .send()
            .await
            .map_err(|e| {
                error!(reranker = %self.model, error = %e, "rerank request failed");
                RagError::Reranker {
                    reranker: self.model.clone(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(reranker = %self.model, %status, "rerank endpoint returned an error");
            return Err(RagError::Reranker {
                reranker: self.model.clone(),
                message: format!("server returned {status}: {body}"),
            });
        }

        let entries: Vec<RerankEntry> = response.json().await.map_err(|e| {
            RagError::Reranker {
                reranker: self.model.clone(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        // TEI returns entries sorted by score; restore input order by index.
        let mut scores = vec![0.0; texts.len()];
        for entry in entries {
            if entry.index >= scores.len() {
                return Err(RagError::Reranker {
                    reranker: self.model.clone(),
                    message: format!("server returned out-of-range index {}", entry.index),
                });
            }
            scores[entry.index] = entry.score;
        }

        Ok(scores)
    }
}
