//! # Workflow
//!
//! The research graph and the engine that drives it.
//!
//! - [`node`]: node identifiers and routing decisions
//! - [`router`]: the conditional-edge policy, a pure function
//! - [`engine`]: execution loop, limits, and the result envelope

pub mod engine;
pub mod node;
pub mod router;

pub use engine::{ResearchOutcome, WorkflowEngine};
pub use node::{NodeId, RouteDecision, TerminationReason};
pub use router::route;
