//! Configuration for the question-answering pipeline.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Validated parameters governing one pipeline run.
///
/// A config is immutable once built; there is no runtime mutation. Construct
/// one through [`RagConfig::builder`] (validation runs at build time, not
/// lazily during the first request) or [`RagConfig::from_env`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Path to the corpus text file.
    pub corpus_path: PathBuf,
    /// Path of the persisted index artifact.
    pub index_path: PathBuf,
    /// Embedding model identifier (must match between build and query).
    pub embedding_model: String,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
    /// Cross-encoder model identifier used for reranking.
    pub rerank_model: String,
    /// Number of chunks handed to the answer composer.
    pub top_k: usize,
    /// Candidates fetched by vector search before reranking.
    pub fan_out: usize,
    /// Minimum similarity score; lower-scoring candidates are dropped.
    pub similarity_threshold: f32,
    /// Generation model identifier.
    pub generation_model: String,
    /// Maximum tokens the generation model may produce.
    pub max_tokens: u32,
    /// Sampling temperature for generation.
    pub temperature: f32,
    /// Context block budget in characters.
    pub context_budget: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            corpus_path: PathBuf::from("datasets/kodeks.txt"),
            index_path: PathBuf::from("vectordb/index.json"),
            embedding_model: "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2"
                .to_string(),
            chunk_size: 1000,
            chunk_overlap: 150,
            rerank_model: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
            top_k: 3,
            fan_out: 9,
            similarity_threshold: 0.0,
            generation_model: "meta-llama/Llama-3.3-70B-Instruct-Turbo-Free".to_string(),
            max_tokens: 512,
            temperature: 0.7,
            context_budget: 6000,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Build a config from defaults with `KODEKS_*` environment overrides.
    ///
    /// Recognized variables: `KODEKS_CORPUS_PATH`, `KODEKS_INDEX_PATH`,
    /// `KODEKS_EMBEDDING_MODEL`, `KODEKS_CHUNK_SIZE`, `KODEKS_CHUNK_OVERLAP`,
    /// `KODEKS_RERANK_MODEL`, `KODEKS_TOP_K`, `KODEKS_FAN_OUT`,
    /// `KODEKS_SIMILARITY_THRESHOLD`, `KODEKS_GENERATION_MODEL`,
    /// `KODEKS_MAX_TOKENS`, `KODEKS_TEMPERATURE`, `KODEKS_CONTEXT_BUDGET`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] when a variable fails to parse or the
    /// resulting parameters violate an invariant.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder();

        if let Ok(value) = env::var("KODEKS_CORPUS_PATH") {
            builder = builder.corpus_path(value);
        }
        if let Ok(value) = env::var("KODEKS_INDEX_PATH") {
            builder = builder.index_path(value);
        }
        if let Ok(value) = env::var("KODEKS_EMBEDDING_MODEL") {
            builder = builder.embedding_model(value);
        }
        if let Ok(value) = env::var("KODEKS_CHUNK_SIZE") {
            builder = builder.chunk_size(parse_env("KODEKS_CHUNK_SIZE", &value)?);
        }
        if let Ok(value) = env::var("KODEKS_CHUNK_OVERLAP") {
            builder = builder.chunk_overlap(parse_env("KODEKS_CHUNK_OVERLAP", &value)?);
        }
        if let Ok(value) = env::var("KODEKS_RERANK_MODEL") {
            builder = builder.rerank_model(value);
        }
        if let Ok(value) = env::var("KODEKS_TOP_K") {
            builder = builder.top_k(parse_env("KODEKS_TOP_K", &value)?);
        }
        if let Ok(value) = env::var("KODEKS_FAN_OUT") {
            builder = builder.fan_out(parse_env("KODEKS_FAN_OUT", &value)?);
        }
        if let Ok(value) = env::var("KODEKS_SIMILARITY_THRESHOLD") {
            builder =
                builder.similarity_threshold(parse_env("KODEKS_SIMILARITY_THRESHOLD", &value)?);
        }
        if let Ok(value) = env::var("KODEKS_GENERATION_MODEL") {
            builder = builder.generation_model(value);
        }
        if let Ok(value) = env::var("KODEKS_MAX_TOKENS") {
            builder = builder.max_tokens(parse_env("KODEKS_MAX_TOKENS", &value)?);
        }
        if let Ok(value) = env::var("KODEKS_TEMPERATURE") {
            builder = builder.temperature(parse_env("KODEKS_TEMPERATURE", &value)?);
        }
        if let Ok(value) = env::var("KODEKS_CONTEXT_BUDGET") {
            builder = builder.context_budget(parse_env("KODEKS_CONTEXT_BUDGET", &value)?);
        }

        builder.build()
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| RagError::Config(format!("cannot parse {name}={value:?} as a number")))
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
    fan_out: Option<usize>,
}

impl RagConfigBuilder {
    /// Set the corpus file path.
    pub fn corpus_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.corpus_path = path.into();
        self
    }

    /// Set the index artifact path.
    pub fn index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.index_path = path.into();
        self
    }

    /// Set the embedding model identifier.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the cross-encoder model identifier.
    pub fn rerank_model(mut self, model: impl Into<String>) -> Self {
        self.config.rerank_model = model.into();
        self
    }

    /// Set the number of chunks handed to the answer composer.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the retrieval fan-out. Defaults to `3 * top_k` when unset, giving
    /// the reranker a richer candidate pool than the final evidence count.
    pub fn fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = Some(fan_out);
        self
    }

    /// Set the minimum similarity score for search candidates.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Set the generation model identifier.
    pub fn generation_model(mut self, model: impl Into<String>) -> Self {
        self.config.generation_model = model.into();
        self
    }

    /// Set the maximum tokens the generation model may produce.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature for generation.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the context block budget in characters.
    pub fn context_budget(mut self, budget: usize) -> Self {
        self.config.context_budget = budget;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `top_k == 0` or `fan_out < top_k`
    /// - `max_tokens == 0` or `context_budget == 0`
    /// - `temperature` is negative or not finite
    pub fn build(self) -> Result<RagConfig> {
        let mut config = self.config;
        config.fan_out = self.fan_out.unwrap_or(config.top_k * 3);

        if config.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be greater than zero".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if config.fan_out < config.top_k {
            return Err(RagError::Config(format!(
                "fan_out ({}) must be at least top_k ({})",
                config.fan_out, config.top_k
            )));
        }
        if config.max_tokens == 0 {
            return Err(RagError::Config("max_tokens must be greater than zero".to_string()));
        }
        if config.context_budget == 0 {
            return Err(RagError::Config("context_budget must be greater than zero".to_string()));
        }
        if !config.temperature.is_finite() || config.temperature < 0.0 {
            return Err(RagError::Config(format!(
                "temperature ({}) must be finite and non-negative",
                config.temperature
            )));
        }

        Ok(config)
    }
}
