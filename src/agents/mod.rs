//! # Agents
//!
//! One reasoning unit per workflow node. Every agent reads the accumulated
//! [`ResearchState`] and returns a [`StateFragment`]; the engine owns the
//! state and does the merging, so agents never mutate it.
//!
//! | Node             | Agent                  | Model | Tools                  |
//! |------------------|------------------------|-------|------------------------|
//! | `query_analysis` | [`QueryAnalysisAgent`] | no    | none                   |
//! | `search`         | [`SearchAgent`]        | via refiner | search, key points |
//! | `analyze`        | [`AnalysisAgent`]      | yes   | key points             |
//! | `synthesize`     | [`SynthesisAgent`]     | yes   | none                   |
//! | `validate`       | [`ValidationAgent`]    | no    | entities               |
//!
//! Search failures are absorbed here and show up as degraded state plus a
//! note. Model failures propagate as [`AgentError::ModelFailure`].

mod analysis;
mod query_analysis;
mod refiner;
mod search;
mod synthesis;
mod validation;

pub use analysis::AnalysisAgent;
pub use query_analysis::QueryAnalysisAgent;
pub use refiner::{InsightQueryRefiner, ModelQueryRefiner, QueryRefiner};
pub use search::SearchAgent;
pub use synthesis::SynthesisAgent;
pub use validation::ValidationAgent;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::state::{ResearchState, StateFragment};

/// A single workflow step.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging
    fn name(&self) -> &str;

    async fn step(&self, state: &ResearchState) -> Result<StateFragment, AgentError>;
}
