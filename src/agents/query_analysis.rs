use async_trait::async_trait;
use tracing::{debug, info};

use super::Agent;
use crate::error::AgentError;
use crate::state::{Depth, ResearchState, ResearchStatus, StateFragment};

const VAGUE_INDICATORS: &[&str] = &["what", "how", "explain", "tell me about", "describe"];

const COMPLEX_INDICATORS: &[&str] = &[
    "compare",
    "analyze",
    "evaluate",
    "assess",
    "comprehensive",
    "detailed",
];

/// Queries shorter than this are vague when they open with an indicator
const MIN_SPECIFIC_WORDS: usize = 4;

/// Classifies the query before any search happens.
///
/// Short open questions ("what is rust") are flagged for clarification.
/// With escalation enabled, comparative or evaluative queries asked at
/// `basic` depth are bumped to `standard`.
#[derive(Debug, Clone, Default)]
pub struct QueryAnalysisAgent {
    escalate_complex: bool,
}

impl QueryAnalysisAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_escalation(mut self, enabled: bool) -> Self {
        self.escalate_complex = enabled;
        self
    }
}

fn contains_indicator(query: &str, indicators: &[&str]) -> bool {
    let padded = format!(" {} ", query);
    indicators.iter().any(|indicator| {
        // matches at word starts, so "compare" also covers "compared"
        padded.contains(&format!(" {}", indicator))
    })
}

fn is_vague(query: &str) -> bool {
    query.split_whitespace().count() < MIN_SPECIFIC_WORDS
        && contains_indicator(query, VAGUE_INDICATORS)
}

fn is_complex(query: &str) -> bool {
    contains_indicator(query, COMPLEX_INDICATORS)
}

#[async_trait]
impl Agent for QueryAnalysisAgent {
    fn name(&self) -> &str {
        "query_analysis"
    }

    async fn step(&self, state: &ResearchState) -> Result<StateFragment, AgentError> {
        let normalized = state
            .query
            .split(|c: char| !(c.is_alphanumeric() || c.is_whitespace()))
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        let vague = is_vague(&normalized);
        let mut fragment = StateFragment::new()
            .with_status(ResearchStatus::Researching)
            .with_needs_clarification(vague);

        if vague {
            fragment = fragment.with_note("Query is broad; results may lack focus");
        }

        if self.escalate_complex && state.depth == Depth::Basic && is_complex(&normalized) {
            info!(query = %state.query, "Escalating complex query to standard depth");
            fragment = fragment.with_depth(Depth::Standard);
        }

        debug!(vague, "Query analyzed");
        Ok(fragment)
    }
}
