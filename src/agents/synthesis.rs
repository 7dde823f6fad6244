use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::Agent;
use crate::error::AgentError;
use crate::llm::LanguageModel;
use crate::prompts::ResearchPrompts;
use crate::state::{ResearchState, ResearchStatus, StateFragment};

/// Writes the final answer from the analysis; it replaces `analysis`.
pub struct SynthesisAgent {
    model: Arc<dyn LanguageModel>,
}

impl SynthesisAgent {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Agent for SynthesisAgent {
    fn name(&self) -> &str {
        "synthesize"
    }

    async fn step(&self, state: &ResearchState) -> Result<StateFragment, AgentError> {
        info!(model = %self.model.name(), sources = state.sources.len(), "Synthesizing answer");

        let answer = self
            .model
            .generate(&ResearchPrompts::synthesis(state), state)
            .await?;

        Ok(StateFragment::new()
            .with_status(ResearchStatus::Synthesizing)
            .with_analysis(answer.trim()))
    }
}
