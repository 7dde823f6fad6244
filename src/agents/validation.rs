use async_trait::async_trait;
use tracing::{debug, info};

use super::Agent;
use crate::error::AgentError;
use crate::state::{ResearchState, StateFragment, Validation};
use crate::tools::text::{self, EntityType};

const MAX_FOLLOW_UP_QUESTIONS: usize = 3;

/// Checks the synthesized answer and proposes follow-up questions.
///
/// Validation passes when the answer is non-blank, at least one source was
/// gathered, and at least one key insight exists. Routing on the outcome is
/// left to the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationAgent;

impl ValidationAgent {
    pub fn new() -> Self {
        Self
    }

    fn validate(state: &ResearchState) -> Validation {
        let mut issues = Vec::new();
        if state.analysis_text().trim().is_empty() {
            issues.push("synthesized answer is empty".to_string());
        }
        if state.sources.is_empty() {
            issues.push("answer references no sources".to_string());
        }
        if state.key_insights.is_empty() {
            issues.push("no key insights were extracted".to_string());
        }

        Validation {
            passed: issues.is_empty(),
            issues,
        }
    }

    fn follow_up_questions(state: &ResearchState, passed: bool) -> Vec<String> {
        let query = state.query.trim();
        let mut questions = Vec::new();

        if state.needs_clarification {
            questions.push(format!("Which aspect of \"{}\" matters most to you?", query));
            questions.push("Is there a particular time frame or context to focus on?".to_string());
        }

        if passed {
            let entities = text::extract_entities(state.analysis_text());
            if let Some(entity) = entities
                .iter()
                .find(|e| e.kind != EntityType::Other && !query.to_lowercase().contains(&e.text.to_lowercase()))
            {
                questions.push(format!("What role does {} play in {}?", entity.text, query));
            }
            questions.push(format!("What are the most recent developments regarding {}?", query));
            questions.push("What limitations or criticisms do the sources raise?".to_string());
        } else {
            questions.push(format!("Could \"{}\" be rephrased with more specific terms?", query));
        }

        questions.truncate(MAX_FOLLOW_UP_QUESTIONS);
        questions
    }
}

#[async_trait]
impl Agent for ValidationAgent {
    fn name(&self) -> &str {
        "validate"
    }

    async fn step(&self, state: &ResearchState) -> Result<StateFragment, AgentError> {
        let validation = Self::validate(state);
        if validation.passed {
            info!("Validation passed");
        } else {
            info!(issues = ?validation.issues, "Validation failed");
        }

        let questions = Self::follow_up_questions(state, validation.passed);
        debug!(count = questions.len(), "Follow-up questions generated");

        Ok(StateFragment::new()
            .with_follow_up_questions(questions)
            .with_validation(validation))
    }
}
