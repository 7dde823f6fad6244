use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::{Agent, InsightQueryRefiner, QueryRefiner};
use crate::error::AgentError;
use crate::state::{ResearchState, ResearchStatus, StateFragment};
use crate::tools::{ResearchTools, ToolCallOutcome};

/// Runs one search pass.
///
/// The first pass searches the query as given; later passes ask the
/// [`QueryRefiner`] for a follow-up query. Key points are pulled from the
/// result snippets. A failed search is recorded as a pass with no results
/// and a low-confidence note, so the workflow carries on.
pub struct SearchAgent {
    tools: ResearchTools,
    refiner: Arc<dyn QueryRefiner>,
    max_results: usize,
    max_key_points: usize,
}

impl SearchAgent {
    pub fn new(tools: ResearchTools) -> Self {
        Self {
            tools,
            refiner: Arc::new(InsightQueryRefiner),
            max_results: 5,
            max_key_points: 5,
        }
    }

    pub fn with_refiner(mut self, refiner: Arc<dyn QueryRefiner>) -> Self {
        self.refiner = refiner;
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    pub fn with_max_key_points(mut self, max: usize) -> Self {
        self.max_key_points = max;
        self
    }
}

#[async_trait]
impl Agent for SearchAgent {
    fn name(&self) -> &str {
        "search"
    }

    async fn step(&self, state: &ResearchState) -> Result<StateFragment, AgentError> {
        let query = if state.search_passes == 0 {
            state.query.trim().to_string()
        } else {
            self.refiner.refine(state).await?
        };

        info!(query = %query, pass = state.search_passes + 1, "Running search pass");
        let fragment = StateFragment::new()
            .with_status(ResearchStatus::Researching)
            .with_search_pass(query.clone());

        match self.tools.web_search(&query, self.max_results).await {
            ToolCallOutcome::Success(results) => {
                if results.is_empty() {
                    return Ok(fragment.with_note(format!("No search results for '{}'", query)));
                }

                let snippets = results
                    .iter()
                    .map(|r| r.snippet.as_str())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");
                let insights = self
                    .tools
                    .extract_key_points(&snippets, self.max_key_points)
                    .ok()
                    .unwrap_or_default();

                Ok(fragment
                    .with_search_results(results)
                    .with_key_insights(insights))
            }
            ToolCallOutcome::Failure { kind, message } => {
                warn!(query = %query, error = %message, "Search failed, continuing with existing state");
                Ok(fragment.with_note(format!(
                    "Low confidence: search for '{}' failed ({}: {})",
                    query, kind, message
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::state::{Depth, ProviderKind};
    use crate::tools::search::testing::StaticBackend;
    use crate::tools::{RawHit, SearchAdapter};

    fn agent_with(backend: Arc<StaticBackend>) -> SearchAgent {
        SearchAgent::new(ResearchTools::new(Arc::new(SearchAdapter::new(vec![backend]))))
    }

    #[tokio::test]
    async fn test_first_pass_uses_query() {
        let backend = StaticBackend::ok(
            ProviderKind::Tavily,
            vec![RawHit::new("T", "u1", "Rust guarantees memory safety.")],
        );
        let agent = agent_with(backend);
        let state = ResearchState::new("  rust safety ", Depth::Basic);

        let fragment = agent.step(&state).await.unwrap();

        assert_eq!(fragment.search_pass.unwrap().query, "rust safety");
        assert_eq!(fragment.sources, vec!["u1".to_string()]);
        assert_eq!(fragment.key_insights, vec!["Rust guarantees memory safety.".to_string()]);
        assert!(fragment.notes.is_empty());
    }

    #[tokio::test]
    async fn test_later_pass_uses_refiner() {
        let backend = StaticBackend::ok(ProviderKind::Tavily, vec![]);
        let agent = agent_with(backend);
        let state = ResearchState::new("rust", Depth::Standard)
            .merge(StateFragment::new().with_search_pass("rust"));

        let fragment = agent.step(&state).await.unwrap();

        assert_eq!(fragment.search_pass.unwrap().query, "rust overview");
        assert_eq!(fragment.notes.len(), 1);
    }

    #[tokio::test]
    async fn test_search_failure_is_absorbed() {
        let backend = StaticBackend::err(
            ProviderKind::Tavily,
            ProviderError::RateLimited {
                provider: ProviderKind::Tavily,
            },
        );
        let agent = agent_with(backend);
        let state = ResearchState::new("rust", Depth::Basic);

        let fragment = agent.step(&state).await.unwrap();

        assert_eq!(fragment.status, Some(ResearchStatus::Researching));
        assert!(fragment.search_results.is_empty());
        assert!(fragment.search_pass.is_some());
        assert!(fragment.notes[0].starts_with("Low confidence"));
        assert!(fragment.notes[0].contains("AllProvidersExhausted"));
    }
}
