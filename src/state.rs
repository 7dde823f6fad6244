//! Research workflow state definition
//!
//! [`ResearchState`] is created once per research run and threaded through
//! the workflow engine. Nodes never mutate it directly: each one returns a
//! [`StateFragment`] which the engine folds in with [`ResearchState::merge`].
//!
//! Merge rule:
//! - scalar fields (`analysis`, `status`) overwrite, `status` only moving forward
//! - `search_results` append, `sources` and `key_insights` union
//!
//! so findings from earlier iterations survive later ones.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::error::ErrorDescriptor;

// =============================================================================
// ENUMS
// =============================================================================
/// Caller-selected research thoroughness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    /// One search pass, straight to analysis
    Basic,
    /// One refinement pass allowed
    #[default]
    Standard,
    /// Up to `max_search_iterations_deep` refinement passes
    Deep,
}

impl Depth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Depth::Basic => "basic",
            Depth::Standard => "standard",
            Depth::Deep => "deep",
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown research depth '{0}' (expected basic, standard or deep)")]
pub struct ParseDepthError(pub String);

impl FromStr for Depth {
    type Err = ParseDepthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Depth::Basic),
            "standard" => Ok(Depth::Standard),
            "deep" => Ok(Depth::Deep),
            other => Err(ParseDepthError(other.to_string())),
        }
    }
}

/// Lifecycle of a research run: `pending → researching → analyzing →
/// synthesizing → done`, any state may go to `failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchStatus {
    #[default]
    Pending,
    Researching,
    Analyzing,
    Synthesizing,
    Done,
    Failed,
}

impl ResearchStatus {
    fn rank(&self) -> u8 {
        match self {
            ResearchStatus::Pending => 0,
            ResearchStatus::Researching => 1,
            ResearchStatus::Analyzing => 2,
            ResearchStatus::Synthesizing => 3,
            ResearchStatus::Done | ResearchStatus::Failed => 4,
        }
    }

    /// `done` and `failed` end the run
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResearchStatus::Done | ResearchStatus::Failed)
    }

    /// Apply a requested transition, keeping the lifecycle monotonic.
    ///
    /// Terminal states are sticky; `failed` is reachable from anywhere
    /// else; otherwise the later of the two states wins.
    pub fn advance(self, next: ResearchStatus) -> ResearchStatus {
        if self.is_terminal() {
            return self;
        }
        if next == ResearchStatus::Failed || next.rank() > self.rank() {
            next
        } else {
            self
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchStatus::Pending => "pending",
            ResearchStatus::Researching => "researching",
            ResearchStatus::Analyzing => "analyzing",
            ResearchStatus::Synthesizing => "synthesizing",
            ResearchStatus::Done => "done",
            ResearchStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ResearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External web-search backends, in no particular priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Tavily,
    Serper,
    DuckDuckGo,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Tavily => "tavily",
            ProviderKind::Serper => "serper",
            ProviderKind::DuckDuckGo => "duckduckgo",
        }
    }

    /// Whether the backend needs an API key to be enabled
    pub fn requires_credentials(&self) -> bool {
        !matches!(self, ProviderKind::DuckDuckGo)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tavily" => Ok(ProviderKind::Tavily),
            "serper" => Ok(ProviderKind::Serper),
            "duckduckgo" | "ddg" => Ok(ProviderKind::DuckDuckGo),
            other => Err(format!("unknown search provider '{}'", other)),
        }
    }
}

// =============================================================================
// SEARCH RESULT
// =============================================================================
/// A single normalized search hit. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// Backend that actually answered
    pub provider: ProviderKind,
    /// 0-based position within that provider's result list
    pub rank: usize,
}

impl SearchResult {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
        provider: ProviderKind,
        rank: usize,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
            provider,
            rank,
        }
    }
}

/// Outcome of the `validate` node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub passed: bool,
    pub issues: Vec<String>,
}

// =============================================================================
// RESEARCH STATE
// =============================================================================
/// Accumulated state of one research run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchState {
    pub query: String,
    pub depth: Depth,
    /// Node executions so far; never decreases
    pub iteration: usize,
    /// Append-only across iterations
    pub search_results: Vec<SearchResult>,
    pub analysis: Option<String>,
    /// Insertion-ordered set
    pub key_insights: Vec<String>,
    /// Insertion-ordered set of URLs, always drawn from `search_results`
    pub sources: Vec<String>,
    pub status: ResearchStatus,
    pub error: Option<ErrorDescriptor>,

    /// Completed `search` node executions
    pub search_passes: usize,
    /// New sources contributed by the most recent search pass
    pub last_pass_new_sources: usize,
    /// Queries sent to the search adapter, in order
    pub executed_queries: Vec<String>,
    /// Set once `validate` has routed back to `analyze`
    pub revisited: bool,
    pub validation: Option<Validation>,

    pub needs_clarification: bool,
    pub follow_up_questions: Vec<String>,
    /// Low-confidence notes left by degraded steps
    pub notes: Vec<String>,
}

impl ResearchState {
    pub fn new(query: impl Into<String>, depth: Depth) -> Self {
        Self {
            query: query.into(),
            depth,
            ..Default::default()
        }
    }

    /// Fold a node's fragment into the state.
    pub fn merge(mut self, fragment: StateFragment) -> Self {
        if let Some(status) = fragment.status {
            self.status = self.status.advance(status);
        }

        if let Some(analysis) = fragment.analysis {
            self.analysis = Some(analysis);
        }

        if let Some(depth) = fragment.depth {
            // escalation only
            self.depth = self.depth.max(depth);
        }

        self.search_results.extend(fragment.search_results);

        let mut new_sources = 0;
        for url in fragment.sources {
            if self.sources.contains(&url) {
                continue;
            }
            if !self.search_results.iter().any(|r| r.url == url) {
                debug!(url = %url, "Dropping source with no backing search result");
                continue;
            }
            self.sources.push(url);
            new_sources += 1;
        }

        for insight in fragment.key_insights {
            push_unique(&mut self.key_insights, insight);
        }

        if let Some(pass) = fragment.search_pass {
            self.search_passes += 1;
            self.last_pass_new_sources = new_sources;
            self.executed_queries.push(pass.query);
        }

        if let Some(flag) = fragment.needs_clarification {
            self.needs_clarification = flag;
        }

        if let Some(questions) = fragment.follow_up_questions {
            self.follow_up_questions = questions;
        }

        if let Some(validation) = fragment.validation {
            self.validation = Some(validation);
        }

        self.notes.extend(fragment.notes);
        self
    }

    /// Mark the run failed, keeping everything merged so far.
    pub fn fail(mut self, error: ErrorDescriptor) -> Self {
        self.status = self.status.advance(ResearchStatus::Failed);
        self.error = Some(error);
        self
    }

    /// Mark the run done (no-op once terminal).
    pub fn complete(mut self) -> Self {
        self.status = self.status.advance(ResearchStatus::Done);
        self
    }

    pub fn analysis_text(&self) -> &str {
        self.analysis.as_deref().unwrap_or("")
    }

    /// Search results whose URL made it into `sources`, in source order
    pub fn source_results(&self) -> Vec<&SearchResult> {
        self.sources
            .iter()
            .filter_map(|url| self.search_results.iter().find(|r| &r.url == url))
            .collect()
    }
}

fn push_unique(items: &mut Vec<String>, item: String) {
    let trimmed = item.trim();
    if trimmed.is_empty() || items.iter().any(|existing| existing == trimmed) {
        return;
    }
    items.push(trimmed.to_string());
}

// =============================================================================
// STATE FRAGMENT
// =============================================================================
/// Record of one completed search pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPass {
    pub query: String,
}

/// Partial update returned by an agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateFragment {
    pub status: Option<ResearchStatus>,
    pub analysis: Option<String>,
    pub depth: Option<Depth>,
    pub search_results: Vec<SearchResult>,
    pub sources: Vec<String>,
    pub key_insights: Vec<String>,
    pub search_pass: Option<SearchPass>,
    pub needs_clarification: Option<bool>,
    pub follow_up_questions: Option<Vec<String>>,
    pub validation: Option<Validation>,
    pub notes: Vec<String>,
}

impl StateFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: ResearchStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_analysis(mut self, analysis: impl Into<String>) -> Self {
        self.analysis = Some(analysis.into());
        self
    }

    pub fn with_depth(mut self, depth: Depth) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Add search results; their non-empty URLs become sources.
    pub fn with_search_results(mut self, results: Vec<SearchResult>) -> Self {
        for result in &results {
            if !result.url.is_empty() && !self.sources.contains(&result.url) {
                self.sources.push(result.url.clone());
            }
        }
        self.search_results.extend(results);
        self
    }

    pub fn with_key_insights(mut self, insights: Vec<String>) -> Self {
        self.key_insights.extend(insights);
        self
    }

    pub fn with_search_pass(mut self, query: impl Into<String>) -> Self {
        self.search_pass = Some(SearchPass {
            query: query.into(),
        });
        self
    }

    pub fn with_needs_clarification(mut self, flag: bool) -> Self {
        self.needs_clarification = Some(flag);
        self
    }

    pub fn with_follow_up_questions(mut self, questions: Vec<String>) -> Self {
        self.follow_up_questions = Some(questions);
        self
    }

    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}
