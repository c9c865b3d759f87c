//! Pipeline orchestrator.
//!
//! [`RagPipeline`] owns the long-lived model clients and wires the two entry
//! points the front-ends consume: [`ingest`](RagPipeline::ingest) (offline
//! index construction) and [`answer`](RagPipeline::answer) (query-time
//! retrieve → rerank → compose). Retrieval and reranking run as plain
//! sequential stages; the composer only ever sees reranked evidence.
//!
//! The pipeline is stateless across requests apart from the shared read-only
//! index, so concurrent `answer` calls are safe. Index building is an
//! offline operation and must not run concurrently with itself against one
//! destination path — the artifact is fully overwritten, not merged.
//!
//! No timeouts are imposed here; embedding, reranking, and generation are
//! unbounded external calls, and request deadlines belong to the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kodeks_rag::{RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .cross_encoder(Arc::new(scorer))
//!     .generation_model(Arc::new(model))
//!     .build()?;
//!
//! pipeline.ingest().await?;
//! let answer = pipeline.answer("Какой штраф?").await?;
//! ```

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::chunking::RecursiveChunker;
use crate::compose::AnswerComposer;
use crate::config::RagConfig;
use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationModel;
use crate::index::VectorIndex;
use crate::loader::load_corpus;
use crate::reranker::{CrossEncoder, Reranker};

/// The question-answering pipeline.
///
/// Model clients are constructed once, at service startup, and held for the
/// process lifetime — no per-request reinitialization. Construct via
/// [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    reranker: Reranker,
    composer: AnswerComposer,
    index: RwLock<Option<Arc<VectorIndex>>>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Ingest the corpus: load → chunk → embed → build → persist.
    ///
    /// Fully overwrites the artifact at the configured index path and
    /// refreshes the in-process index, then returns the number of indexed
    /// chunks. Rerunning with the same corpus and embedding model produces
    /// an index serving identical rankings.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Ingestion`] when the corpus is unreadable or has
    /// no pages, and [`RagError::IndexBuild`] when no chunks survive, an
    /// embedding fails, or the artifact cannot be written.
    pub async fn ingest(&self) -> Result<usize> {
        let documents = load_corpus(&self.config.corpus_path)?;

        let chunker = RecursiveChunker::new(self.config.chunk_size, self.config.chunk_overlap)?;
        let mut chunks = chunker.split(&documents);
        if chunks.is_empty() {
            return Err(RagError::IndexBuild(
                "corpus produced no chunks to index".to_string(),
            ));
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(error = %e, "embedding failed during ingestion");
            RagError::IndexBuild(format!("embedding failed during ingestion: {e}"))
        })?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::IndexBuild(format!(
                "embedding provider returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        let index = VectorIndex::build(
            chunks,
            self.embedding_provider.dimensions(),
            &self.config.embedding_model,
        )?;
        index.save(&self.config.index_path)?;

        let chunk_count = index.len();
        *self.index.write().await = Some(Arc::new(index));

        info!(chunk_count, index_path = %self.config.index_path.display(), "ingestion complete");
        Ok(chunk_count)
    }

    /// Answer a question from the indexed corpus.
    ///
    /// Embeds the query, fetches `fan_out` candidates by cosine similarity,
    /// reranks them with the cross-encoder down to `top_k`, and hands the
    /// evidence to the composer. Empty retrieval is not an error: the
    /// composer still runs and the model's no-answer policy produces the
    /// reply.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexLoad`] when the index artifact is missing or
    /// corrupt, [`RagError::Pipeline`] when query embedding fails, and
    /// [`RagError::Reranker`] / [`RagError::Generation`] from those stages.
    pub async fn answer(&self, query: &str) -> Result<String> {
        let index = self.index().await?;

        let query_embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            RagError::Pipeline(format!("query embedding failed: {e}"))
        })?;

        let candidates: Vec<SearchResult> = index
            .search(&query_embedding, self.config.fan_out)
            .into_iter()
            .filter(|r| r.score >= self.config.similarity_threshold)
            .collect();
        debug!(candidate_count = candidates.len(), "vector search completed");

        let ranked = self.reranker.rerank(query, candidates, self.config.top_k).await?;

        let answer = self.composer.answer(query, &ranked).await?;
        info!(evidence_count = ranked.len(), "query answered");
        Ok(answer)
    }

    /// Return the shared index, loading it from disk on first use.
    ///
    /// The index is read-only at query time; the lock only guards the lazy
    /// load.
    async fn index(&self) -> Result<Arc<VectorIndex>> {
        {
            let guard = self.index.read().await;
            if let Some(index) = guard.as_ref() {
                return Ok(Arc::clone(index));
            }
        }

        let mut guard = self.index.write().await;
        if let Some(index) = guard.as_ref() {
            return Ok(Arc::clone(index));
        }

        let index = VectorIndex::load(&self.config.index_path)?;
        if index.embedding_model() != self.config.embedding_model {
            warn!(
                artifact_model = index.embedding_model(),
                configured_model = %self.config.embedding_model,
                "index was built with a different embedding model; retrieval quality is undefined"
            );
        }

        let index = Arc::new(index);
        *guard = Some(Arc::clone(&index));
        Ok(index)
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// All fields are required. Call [`build()`](RagPipelineBuilder::build) to
/// validate and produce the pipeline.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    cross_encoder: Option<Arc<dyn CrossEncoder>>,
    generation_model: Option<Arc<dyn GenerationModel>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider (shared by ingestion and querying).
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the cross-encoder used for reranking.
    pub fn cross_encoder(mut self, scorer: Arc<dyn CrossEncoder>) -> Self {
        self.cross_encoder = Some(scorer);
        self
    }

    /// Set the generation model.
    pub fn generation_model(mut self, model: Arc<dyn GenerationModel>) -> Self {
        self.generation_model = Some(model);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are
    /// set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if any required field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::Config("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let cross_encoder = self
            .cross_encoder
            .ok_or_else(|| RagError::Config("cross_encoder is required".to_string()))?;
        let generation_model = self
            .generation_model
            .ok_or_else(|| RagError::Config("generation_model is required".to_string()))?;

        let reranker = Reranker::new(cross_encoder);
        let composer = AnswerComposer::new(
            generation_model,
            config.max_tokens,
            config.temperature,
            config.context_budget,
        );

        Ok(RagPipeline {
            config,
            embedding_provider,
            reranker,
            composer,
            index: RwLock::new(None),
        })
    }
}
