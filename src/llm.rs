//! # Language Model Capability
//!
//! The workflow treats the model as an opaque `generate(prompt, context)`
//! call behind [`LanguageModel`]. [`OllamaModel`] is the production
//! implementation, built on Rig's Ollama provider; tests plug in stubs.
//!
//! No retries happen here. A failed call is reported once and the workflow
//! engine decides what it means for the run.

use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::ollama;
use tracing::debug;

use crate::error::ModelError;
use crate::state::ResearchState;

/// Text generation capability used by the model-backed agents.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for `prompt`.
    ///
    /// `context` is the accumulated research state; implementations may use
    /// it to frame the request (the query, for instance) but must not rely
    /// on any particular field being populated.
    async fn generate(&self, prompt: &str, context: &ResearchState) -> Result<String, ModelError>;

    /// Model name for logging
    fn name(&self) -> &str;
}

// =============================================================================
// OLLAMA
// =============================================================================
/// [`LanguageModel`] backed by a local Ollama server through Rig.
pub struct OllamaModel {
    client: ollama::Client,
    model: String,
    temperature: f32,
}

impl OllamaModel {
    /// Connect to the Ollama server at `host`.
    ///
    /// Rig's Ollama client reads its base URL from `OLLAMA_API_BASE_URL`, so
    /// the host is exported there before the client is built.
    pub fn new(host: &str, model: impl Into<String>) -> Self {
        std::env::set_var("OLLAMA_API_BASE_URL", host);
        let client = ollama::Client::from_env();

        let model = model.into();
        debug!(host = %host, model = %model, "Connected to Ollama");

        Self {
            client,
            model,
            temperature: 0.1,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    async fn generate(&self, prompt: &str, context: &ResearchState) -> Result<String, ModelError> {
        let preamble = format!(
            "You are a careful research assistant working on the question: {}\n\
             Base every statement on the material you are given and cite source URLs.",
            context.query
        );

        let agent = self
            .client
            .agent(&self.model)
            .preamble(&preamble)
            .temperature(f64::from(self.temperature))
            .build();

        debug!(model = %self.model, prompt_len = prompt.len(), "Sending prompt");

        agent
            .prompt(prompt.to_owned())
            .await
            .map_err(|e| classify_failure(&e.to_string()))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Split transport failures (server down) from request failures.
fn classify_failure(message: &str) -> ModelError {
    let lower = message.to_lowercase();
    if lower.contains("connection refused")
        || lower.contains("error trying to connect")
        || lower.contains("dns error")
        || lower.contains("timed out")
    {
        ModelError::Unreachable(message.to_string())
    } else {
        ModelError::Request(message.to_string())
    }
}
