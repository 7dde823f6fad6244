//! Routing policy
//!
//! A pure function of the node that just ran, the merged state, and the
//! configuration:
//!
//! ```text
//! query_analysis ──▶ search ──┬──▶ analyze ──▶ synthesize ──▶ validate ──┬──▶ done
//!                     ▲       │       ▲                                  │
//!                     └───────┘       └────────── once ──────────────────┘
//!             (new sources, passes left)            (validation failed)
//! ```

use super::node::{NodeId, RouteDecision, TerminationReason};
use crate::config::WorkflowConfig;
use crate::state::ResearchState;

/// Pick the next step after `node` has run and its fragment was merged.
pub fn route(node: NodeId, state: &ResearchState, config: &WorkflowConfig) -> RouteDecision {
    match node {
        NodeId::QueryAnalysis => RouteDecision::Continue(NodeId::Search),
        NodeId::Search => {
            // passes so far include the first, unrefined one
            let refinements_done = state.search_passes.saturating_sub(1);
            let refinements_left = refinements_done < config.max_search_iterations(state.depth);
            if refinements_left && state.last_pass_new_sources > 0 {
                RouteDecision::Continue(NodeId::Search)
            } else {
                RouteDecision::Continue(NodeId::Analyze)
            }
        }
        NodeId::Analyze => RouteDecision::Continue(NodeId::Synthesize),
        NodeId::Synthesize => RouteDecision::Continue(NodeId::Validate),
        NodeId::Validate => match &state.validation {
            Some(validation) if validation.passed => {
                RouteDecision::Terminate(TerminationReason::Completed)
            }
            _ if !state.revisited => RouteDecision::Continue(NodeId::Analyze),
            _ => RouteDecision::Terminate(TerminationReason::ValidationLoopExceeded),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Depth, Validation};

    fn after_passes(depth: Depth, passes: usize, new_sources: usize) -> ResearchState {
        let mut state = ResearchState::new("q", depth);
        state.search_passes = passes;
        state.last_pass_new_sources = new_sources;
        state
    }

    #[test]
    fn test_linear_edges() {
        let config = WorkflowConfig::default();
        let state = ResearchState::new("q", Depth::Standard);

        assert_eq!(
            route(NodeId::QueryAnalysis, &state, &config),
            RouteDecision::Continue(NodeId::Search)
        );
        assert_eq!(
            route(NodeId::Analyze, &state, &config),
            RouteDecision::Continue(NodeId::Synthesize)
        );
        assert_eq!(
            route(NodeId::Synthesize, &state, &config),
            RouteDecision::Continue(NodeId::Validate)
        );
    }

    #[test]
    fn test_basic_searches_once() {
        let config = WorkflowConfig::default();
        let state = after_passes(Depth::Basic, 1, 5);
        assert_eq!(
            route(NodeId::Search, &state, &config),
            RouteDecision::Continue(NodeId::Analyze)
        );
    }

    #[test]
    fn test_standard_refines_once() {
        let config = WorkflowConfig::default();

        let state = after_passes(Depth::Standard, 1, 3);
        assert_eq!(
            route(NodeId::Search, &state, &config),
            RouteDecision::Continue(NodeId::Search)
        );

        let state = after_passes(Depth::Standard, 2, 3);
        assert_eq!(
            route(NodeId::Search, &state, &config),
            RouteDecision::Continue(NodeId::Analyze)
        );
    }

    #[test]
    fn test_deep_honors_configured_passes() {
        let config = WorkflowConfig::default().with_max_search_iterations_deep(2);

        assert_eq!(
            route(NodeId::Search, &after_passes(Depth::Deep, 2, 1), &config),
            RouteDecision::Continue(NodeId::Search)
        );
        assert_eq!(
            route(NodeId::Search, &after_passes(Depth::Deep, 3, 1), &config),
            RouteDecision::Continue(NodeId::Analyze)
        );
    }

    #[test]
    fn test_no_new_sources_stops_searching() {
        let config = WorkflowConfig::default();
        let state = after_passes(Depth::Deep, 1, 0);
        assert_eq!(
            route(NodeId::Search, &state, &config),
            RouteDecision::Continue(NodeId::Analyze)
        );
    }

    #[test]
    fn test_validation_routes() {
        let config = WorkflowConfig::default();
        let mut state = ResearchState::new("q", Depth::Basic);

        state.validation = Some(Validation {
            passed: true,
            issues: vec![],
        });
        assert_eq!(
            route(NodeId::Validate, &state, &config),
            RouteDecision::Terminate(TerminationReason::Completed)
        );

        state.validation = Some(Validation {
            passed: false,
            issues: vec!["empty".into()],
        });
        assert_eq!(
            route(NodeId::Validate, &state, &config),
            RouteDecision::Continue(NodeId::Analyze)
        );

        state.revisited = true;
        assert_eq!(
            route(NodeId::Validate, &state, &config),
            RouteDecision::Terminate(TerminationReason::ValidationLoopExceeded)
        );
    }
}
