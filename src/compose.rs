//! Prompt assembly and answer generation.
//!
//! The composer joins the reranked evidence into a context block, renders the
//! instruction prompt, and invokes the generation model exactly once per
//! query. The instruction pins the model to the supplied context: answer only
//! from it, and say so explicitly when it lacks the answer.

use std::sync::Arc;

use tracing::{debug, error};

use crate::document::Chunk;
use crate::error::{RagError, Result};
use crate::generation::GenerationModel;

/// Literal context block used when retrieval produced no evidence.
///
/// Generation is still invoked with this marker in place of the context so
/// the model's no-answer policy triggers; the composer never short-circuits
/// with a hardcoded reply.
pub const NO_CONTEXT_MARKER: &str = "Контекст отсутствует.";

/// Separator between chunk texts inside the context block.
const CHUNK_SEPARATOR: &str = "\n\n";

/// Builds the instruction prompt from ranked evidence and invokes generation.
pub struct AnswerComposer {
    model: Arc<dyn GenerationModel>,
    max_tokens: u32,
    temperature: f32,
    context_budget: usize,
}

impl AnswerComposer {
    /// Create a composer bound to a generation model and its call parameters.
    ///
    /// `context_budget` caps the context block length in characters; chunks
    /// that do not fit are dropped lowest-ranked first, never cut mid-chunk.
    pub fn new(
        model: Arc<dyn GenerationModel>,
        max_tokens: u32,
        temperature: f32,
        context_budget: usize,
    ) -> Self {
        Self { model, max_tokens, temperature, context_budget }
    }

    /// Render the full instruction prompt for `question` over the ranked
    /// chunks.
    pub fn build_prompt(&self, question: &str, ranked_chunks: &[Chunk]) -> String {
        let context = self.build_context(ranked_chunks);
        format!(
            "Ты юридический помощник, отвечающий строго на основе положений закона. \
             Используй приведённый ниже фрагмент закона (контекст), чтобы дать краткий, \
             точный и официальный ответ на вопрос. \
             Если ответа нет в тексте, прямо скажи об этом и не выдумывай.\n\n\
             📘 Контекст:\n{context}\n\n\
             ❓ Вопрос:\n{question}\n\n\
             ⚖️ Ответ:"
        )
    }

    /// Join chunk texts in rank order, dropping whole lowest-ranked chunks
    /// once the budget is exhausted. The top-ranked chunk is always kept.
    fn build_context(&self, ranked_chunks: &[Chunk]) -> String {
        if ranked_chunks.is_empty() {
            return NO_CONTEXT_MARKER.to_string();
        }

        let mut parts: Vec<&str> = Vec::with_capacity(ranked_chunks.len());
        let mut used = 0;

        for chunk in ranked_chunks {
            let cost = chunk.text.chars().count()
                + if parts.is_empty() { 0 } else { CHUNK_SEPARATOR.len() };
            if !parts.is_empty() && used + cost > self.context_budget {
                debug!(
                    kept = parts.len(),
                    dropped = ranked_chunks.len() - parts.len(),
                    "context budget exhausted, dropping lowest-ranked chunks"
                );
                break;
            }
            parts.push(&chunk.text);
            used += cost;
        }

        parts.join(CHUNK_SEPARATOR)
    }

    /// Compose the prompt and invoke generation exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Generation`] when the generation capability fails
    /// or returns empty output; the error propagates to the caller untouched.
    pub async fn answer(&self, question: &str, ranked_chunks: &[Chunk]) -> Result<String> {
        let prompt = self.build_prompt(question, ranked_chunks);
        debug!(
            chunk_count = ranked_chunks.len(),
            prompt_chars = prompt.chars().count(),
            "invoking generation"
        );

        let answer = self.model.generate(&prompt, self.max_tokens, self.temperature).await?;

        if answer.trim().is_empty() {
            error!(model = self.model.name(), "generation returned no content");
            return Err(RagError::Generation {
                provider: self.model.name().to_string(),
                message: "model returned no content".to_string(),
            });
        }

        Ok(answer)
    }
}
