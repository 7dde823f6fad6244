//! Follow-up query strategies for repeated search passes

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ModelError;
use crate::llm::LanguageModel;
use crate::prompts::ResearchPrompts;
use crate::state::ResearchState;
use crate::tools::text;

/// Keywords appended to the original query per refinement
const MAX_REFINEMENT_KEYWORDS: usize = 3;

/// Produces the query for the next search pass.
#[async_trait]
pub trait QueryRefiner: Send + Sync {
    async fn refine(&self, state: &ResearchState) -> Result<String, ModelError>;
}

/// Appends the most frequent new keywords from `key_insights` to the query.
///
/// Keywords already in the query or in an earlier refinement are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsightQueryRefiner;

impl InsightQueryRefiner {
    pub fn refine_sync(&self, state: &ResearchState) -> String {
        let mut used: Vec<String> = text::content_words(&state.query).collect();
        for executed in &state.executed_queries {
            used.extend(text::content_words(executed));
        }

        // (count, first appearance)
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        let mut position = 0;
        for insight in &state.key_insights {
            for word in text::content_words(insight) {
                if word.chars().count() < 4 || !word.chars().all(char::is_alphabetic) || used.contains(&word) {
                    continue;
                }
                let entry = counts.entry(word).or_insert((0, position));
                entry.0 += 1;
                position += 1;
            }
        }

        let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
        ranked.sort_by(|(_, (ca, pa)), (_, (cb, pb))| cb.cmp(ca).then(pa.cmp(pb)));
        let keywords: Vec<String> = ranked
            .into_iter()
            .take(MAX_REFINEMENT_KEYWORDS)
            .map(|(word, _)| word)
            .collect();

        if keywords.is_empty() {
            let broadened = format!("{} overview", state.query.trim());
            if state.executed_queries.contains(&broadened) {
                return state.query.trim().to_string();
            }
            return broadened;
        }

        format!("{} {}", state.query.trim(), keywords.join(" "))
    }
}

#[async_trait]
impl QueryRefiner for InsightQueryRefiner {
    async fn refine(&self, state: &ResearchState) -> Result<String, ModelError> {
        Ok(self.refine_sync(state))
    }
}

/// Asks the language model for a related query.
///
/// An empty reply falls back to [`InsightQueryRefiner`]; a failed call is
/// returned to the caller.
pub struct ModelQueryRefiner {
    model: Arc<dyn LanguageModel>,
}

impl ModelQueryRefiner {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl QueryRefiner for ModelQueryRefiner {
    async fn refine(&self, state: &ResearchState) -> Result<String, ModelError> {
        let reply = self
            .model
            .generate(&ResearchPrompts::refinement(state), state)
            .await?;

        let suggestion = reply
            .lines()
            .map(|line| {
                line.trim()
                    .trim_start_matches(['-', '*', '•'])
                    .trim()
                    .trim_matches(['"', '\'', '`'])
                    .trim()
            })
            .find(|line| !line.is_empty());

        match suggestion {
            Some(query) => {
                debug!(query = %query, "Model suggested follow-up query");
                Ok(query.to_string())
            }
            None => {
                warn!("Model returned no follow-up query, using insight keywords");
                Ok(InsightQueryRefiner.refine_sync(state))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::StaticModel;
    use crate::state::{Depth, StateFragment};

    fn state_with_insights(insights: &[&str]) -> ResearchState {
        ResearchState::new("rust async", Depth::Standard).merge(
            StateFragment::new()
                .with_key_insights(insights.iter().map(|s| s.to_string()).collect())
                .with_search_pass("rust async"),
        )
    }

    #[test]
    fn test_insight_refiner_picks_frequent_new_keywords() {
        let state = state_with_insights(&[
            "Tokio is the most used runtime for Rust async code.",
            "The tokio runtime schedules futures.",
            "Executors poll futures to completion.",
        ]);

        let query = InsightQueryRefiner.refine_sync(&state);
        assert_eq!(query, "rust async tokio runtime futures");
    }

    #[test]
    fn test_insight_refiner_without_insights() {
        let state = state_with_insights(&[]);
        assert_eq!(InsightQueryRefiner.refine_sync(&state), "rust async overview");
    }

    #[test]
    fn test_insight_refiner_skips_used_keywords() {
        let state = state_with_insights(&["Tokio runtime details."])
            .merge(StateFragment::new().with_search_pass("rust async tokio runtime"));
        assert_eq!(InsightQueryRefiner.refine_sync(&state), "rust async details");
    }

    #[tokio::test]
    async fn test_model_refiner_uses_first_line() {
        let model = Arc::new(StaticModel::replying("\n- \"tokio work stealing scheduler\"\nextra"));
        let refiner = ModelQueryRefiner::new(model.clone());

        let query = refiner.refine(&state_with_insights(&[])).await.unwrap();
        assert_eq!(query, "tokio work stealing scheduler");
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_model_refiner_propagates_failure() {
        let refiner = ModelQueryRefiner::new(Arc::new(StaticModel::failing()));
        assert!(refiner.refine(&state_with_insights(&[])).await.is_err());
    }
}
