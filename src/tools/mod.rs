//! # Tools Module
//!
//! The tools agents can call:
//!
//! - [`search`]: web search across several providers with ordered fallback
//! - [`text`]: pure text analysis over already-fetched text
//!
//! Both report through [`ToolCallOutcome`], so an agent handles a failed
//! search and an empty-input summary the same way.

pub mod search;
pub mod text;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AnalysisError, ErrorDescriptor, ErrorKind, SearchError};
use crate::state::SearchResult;

pub use search::{RawHit, SearchAdapter, SearchBackend};
pub use text::{Entity, EntityType, Sentiment, SentimentLabel};

// =============================================================================
// TOOL CALL OUTCOME
// =============================================================================
/// Uniform result of a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToolCallOutcome<T> {
    Success(T),
    Failure { kind: ErrorKind, message: String },
}

impl<T> ToolCallOutcome<T> {
    pub fn failure(descriptor: ErrorDescriptor) -> Self {
        ToolCallOutcome::Failure {
            kind: descriptor.kind,
            message: descriptor.message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolCallOutcome::Success(_))
    }

    /// The payload, dropping any failure
    pub fn ok(self) -> Option<T> {
        match self {
            ToolCallOutcome::Success(value) => Some(value),
            ToolCallOutcome::Failure { .. } => None,
        }
    }

    pub fn into_result(self) -> Result<T, ErrorDescriptor> {
        match self {
            ToolCallOutcome::Success(value) => Ok(value),
            ToolCallOutcome::Failure { kind, message } => Err(ErrorDescriptor::new(kind, message)),
        }
    }
}

impl<T> From<Result<T, SearchError>> for ToolCallOutcome<T> {
    fn from(result: Result<T, SearchError>) -> Self {
        match result {
            Ok(value) => ToolCallOutcome::Success(value),
            Err(e) => ToolCallOutcome::failure(ErrorDescriptor::from(&e)),
        }
    }
}

impl<T> From<Result<T, AnalysisError>> for ToolCallOutcome<T> {
    fn from(result: Result<T, AnalysisError>) -> Self {
        match result {
            Ok(value) => ToolCallOutcome::Success(value),
            Err(e) => ToolCallOutcome::failure(ErrorDescriptor::from(&e)),
        }
    }
}

// =============================================================================
// RESEARCH TOOLS
// =============================================================================
/// The tool set handed to agents.
///
/// Cloning is cheap; the search adapter is shared.
#[derive(Clone)]
pub struct ResearchTools {
    search: Arc<SearchAdapter>,
}

impl ResearchTools {
    pub fn new(search: Arc<SearchAdapter>) -> Self {
        Self { search }
    }

    pub fn search_adapter(&self) -> &SearchAdapter {
        &self.search
    }

    pub async fn web_search(
        &self,
        query: &str,
        max_results: usize,
    ) -> ToolCallOutcome<Vec<SearchResult>> {
        self.search.search(query, max_results).await.into()
    }

    pub fn summarize(&self, text: &str, target_length: usize) -> ToolCallOutcome<String> {
        text::summarize(text, target_length).into()
    }

    /// Fails with `EmptyInput` on blank text so callers can skip uniformly
    pub fn extract_key_points(&self, text: &str, max_points: usize) -> ToolCallOutcome<Vec<String>> {
        if text.trim().is_empty() {
            return Err::<Vec<String>, _>(AnalysisError::EmptyInput).into();
        }
        ToolCallOutcome::Success(text::extract_key_points(text, max_points))
    }

    pub fn analyze_sentiment(&self, text: &str) -> ToolCallOutcome<Sentiment> {
        ToolCallOutcome::Success(text::analyze_sentiment(text))
    }

    pub fn extract_entities(&self, text: &str) -> ToolCallOutcome<Vec<Entity>> {
        ToolCallOutcome::Success(text::extract_entities(text))
    }
}
