//! Node identifiers and routing decisions

use serde::{Deserialize, Serialize};
use std::fmt;

/// The nodes of the research graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    QueryAnalysis,
    Search,
    Analyze,
    Synthesize,
    Validate,
}

impl NodeId {
    /// Where every run starts
    pub const ENTRY: NodeId = NodeId::QueryAnalysis;

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeId::QueryAnalysis => "query_analysis",
            NodeId::Search => "search",
            NodeId::Analyze => "analyze",
            NodeId::Synthesize => "synthesize",
            NodeId::Validate => "validate",
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why routing ended the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Validation passed
    Completed,
    /// Validation failed again after the one allowed revisit of `analyze`
    ValidationLoopExceeded,
}

/// Output of the routing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Continue(NodeId),
    Terminate(TerminationReason),
}
