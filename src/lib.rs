//! # kodeks-rag
//!
//! Retrieval-augmented question answering over a legal-code corpus.
//!
//! The crate covers the full pipeline between the raw corpus and the
//! generated answer:
//!
//! - offline ingestion: load the corpus, split it into overlapping chunks,
//!   embed them, and persist a [`VectorIndex`] artifact;
//! - query time: embed the question, fetch a fan-out of candidates by cosine
//!   similarity, rerank them with a cross-encoder, and compose a grounded
//!   prompt for the generation model.
//!
//! Retrieval is deliberately two-stage: vector search is cheap and
//! recall-oriented, the cross-encoder is expensive and precision-oriented,
//! so search fans out wider than the final evidence count and the reranker
//! cuts the pool down to `top_k`. The generation prompt pins the model to
//! the supplied context and requires it to say explicitly when the context
//! lacks the answer.
//!
//! Front-ends (HTTP, chat bots) stay outside this crate; they only need
//! [`RagPipeline::ingest`] and [`RagPipeline::answer`].
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kodeks_rag::{RagConfig, RagPipeline};
//! use kodeks_rag::tei::{TeiCrossEncoder, TeiEmbeddingClient};
//! use kodeks_rag::together::TogetherGenerationClient;
//!
//! let config = RagConfig::from_env()?;
//! let pipeline = RagPipeline::builder()
//!     .embedding_provider(Arc::new(TeiEmbeddingClient::new("http://localhost:8080", 384)))
//!     .cross_encoder(Arc::new(TeiCrossEncoder::new("http://localhost:8081", &config.rerank_model)))
//!     .generation_model(Arc::new(TogetherGenerationClient::from_env(&config.generation_model)?))
//!     .config(config)
//!     .build()?;
//!
//! pipeline.ingest().await?;
//! let answer = pipeline.answer("Какой штраф предусмотрен?").await?;
//! ```

pub mod chunking;
pub mod compose;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod loader;
pub mod pipeline;
pub mod reranker;

#[cfg(feature = "tei")]
pub mod tei;
#[cfg(feature = "together")]
pub mod together;

pub use chunking::RecursiveChunker;
pub use compose::{AnswerComposer, NO_CONTEXT_MARKER};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::GenerationModel;
pub use index::VectorIndex;
pub use loader::load_corpus;
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use reranker::{CrossEncoder, Reranker};
