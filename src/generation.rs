//! Generation capability trait.

use async_trait::async_trait;

use crate::error::Result;

/// A text-generation model invoked with a fully assembled prompt.
///
/// The pipeline treats generation as a single blocking external call: no
/// streaming, no retries. Retry policy, if any, belongs to the caller.
#[async_trait]
pub trait GenerationModel: Send + Sync {
    /// Identifier of the underlying model, used in error reports.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String>;
}
