//! # AI Research Workflow
//!
//! A research workflow engine: a query goes through a small graph of steps
//! (query analysis, web search, analysis, synthesis, validation) that
//! accumulate state until the answer validates or a limit trips.
//!
//! ```text
//! WorkflowEngine ──▶ Agent (per node) ──▶ ResearchTools ──▶ SearchAdapter ──▶ Tavily / Serper / DuckDuckGo
//!                          │                    └──────────▶ text analysis
//!                          └──────────▶ LanguageModel (Ollama via Rig)
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use ai_research_workflow::{Config, WorkflowEngine};
//!
//! let config = Config::from_env()?;
//! let engine = WorkflowEngine::from_config(&config);
//! let outcome = engine.research_topic("How does Rust prevent data races?", "standard").await;
//! println!("{}", outcome.analysis);
//! ```

pub mod agents;
pub mod config;
pub mod error;
pub mod llm;
pub mod prompts;
pub mod state;
pub mod tools;
pub mod workflow;

pub use config::{Config, WorkflowConfig};
pub use error::{ErrorDescriptor, ErrorKind};
pub use llm::{LanguageModel, OllamaModel};
pub use state::{Depth, ResearchState, ResearchStatus, SearchResult, StateFragment};
pub use tools::{ResearchTools, SearchAdapter, SearchBackend, ToolCallOutcome};
pub use workflow::{NodeId, ResearchOutcome, WorkflowEngine};
