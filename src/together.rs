//! Generation client for the Together completions API.
//!
//! This module is only available when the `together` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::generation::GenerationModel;

/// The Together completions endpoint.
const TOGETHER_COMPLETIONS_URL: &str = "https://api.together.xyz/v1/completions";

/// A [`GenerationModel`] backed by the Together completions API.
///
/// # Example
///
/// ```rust,ignore
/// use kodeks_rag::together::TogetherGenerationClient;
///
/// let model = TogetherGenerationClient::from_env("meta-llama/Llama-3.3-70B-Instruct-Turbo-Free")?;
/// let text = model.generate(&prompt, 512, 0.7).await?;
/// ```
pub struct TogetherGenerationClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl TogetherGenerationClient {
    /// Create a client with the given API key and model identifier.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        let model = model.into();
        if api_key.is_empty() {
            return Err(RagError::Generation {
                provider: model,
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self { client: reqwest::Client::new(), api_key, model })
    }

    /// Create a client using the `TOGETHER_API_KEY` environment variable.
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        let api_key = std::env::var("TOGETHER_API_KEY").map_err(|_| RagError::Generation {
            provider: model.clone(),
            message: "TOGETHER_API_KEY environment variable not set".into(),
        })?;
        Self::new(api_key, model)
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
}

#[async_trait]
impl GenerationModel for TogetherGenerationClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String> {
        debug!(
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            max_tokens,
            "requesting completion"
        );

        let request_body =
            CompletionRequest { model: &self.model, prompt, max_tokens, temperature };

        let response = self
            .client
            .post(TOGETHER_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(model = %self.model, error = %e, "completion request failed");
                RagError::Generation {
                    provider: self.model.clone(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(model = %self.model, %status, "completion endpoint returned an error");
            return Err(RagError::Generation {
                provider: self.model.clone(),
                message: format!("API returned {status}: {body}"),
            });
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            RagError::Generation {
                provider: self.model.clone(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        completion.choices.into_iter().next().map(|c| c.text).ok_or_else(|| {
            RagError::Generation {
                provider: self.model.clone(),
                message: "API returned no choices".into(),
            }
        })
    }
}
