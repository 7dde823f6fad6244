use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::Agent;
use crate::error::AgentError;
use crate::llm::LanguageModel;
use crate::prompts::ResearchPrompts;
use crate::state::{ResearchState, ResearchStatus, StateFragment};
use crate::tools::ResearchTools;

/// Interprets the gathered results with the language model.
///
/// The model's answer becomes `analysis`; its most salient sentences are
/// added to `key_insights`.
pub struct AnalysisAgent {
    model: Arc<dyn LanguageModel>,
    tools: ResearchTools,
    max_key_points: usize,
}

impl AnalysisAgent {
    pub fn new(model: Arc<dyn LanguageModel>, tools: ResearchTools) -> Self {
        Self {
            model,
            tools,
            max_key_points: 5,
        }
    }

    pub fn with_max_key_points(mut self, max: usize) -> Self {
        self.max_key_points = max;
        self
    }
}

#[async_trait]
impl Agent for AnalysisAgent {
    fn name(&self) -> &str {
        "analyze"
    }

    async fn step(&self, state: &ResearchState) -> Result<StateFragment, AgentError> {
        info!(
            model = %self.model.name(),
            results = state.search_results.len(),
            "Analyzing search results"
        );

        let analysis = self
            .model
            .generate(&ResearchPrompts::analysis(state), state)
            .await?;

        // blank output just yields no insights
        let insights = self
            .tools
            .extract_key_points(&analysis, self.max_key_points)
            .ok()
            .unwrap_or_default();

        Ok(StateFragment::new()
            .with_status(ResearchStatus::Analyzing)
            .with_analysis(analysis)
            .with_key_insights(insights))
    }
}
