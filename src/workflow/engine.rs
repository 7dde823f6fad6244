//! Workflow engine
//!
//! Runs the research graph for one query: executes a node, merges its
//! fragment, asks the router for the next node, and repeats until routing
//! terminates or a limit trips. Limits:
//!
//! - `max_iterations` node executions, checked before each node
//! - a wall-clock deadline for the whole run; an in-flight node is aborted
//!   when it passes and the state from the last merged node is kept
//!
//! Whatever happens, the caller gets a [`ResearchOutcome`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::node::{NodeId, RouteDecision, TerminationReason};
use super::router::route;
use crate::agents::{
    Agent, AnalysisAgent, QueryAnalysisAgent, QueryRefiner, SearchAgent, SynthesisAgent,
    ValidationAgent,
};
use crate::config::{Config, WorkflowConfig};
use crate::error::{ErrorDescriptor, ErrorKind};
use crate::llm::{LanguageModel, OllamaModel};
use crate::state::{Depth, ProviderKind, ResearchState, ResearchStatus};
use crate::tools::{Entity, ResearchTools, SearchAdapter, Sentiment};

// =============================================================================
// RESULT ENVELOPE
// =============================================================================
/// Result of one research run, returned even when the run failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchOutcome {
    pub run_id: Uuid,
    pub status: ResearchStatus,
    pub analysis: String,
    pub sources: Vec<String>,
    pub key_insights: Vec<String>,
    pub error: Option<ErrorDescriptor>,

    /// Short extractive summary of `analysis`
    pub summary: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub entities: Vec<Entity>,
    pub follow_up_questions: Vec<String>,
    /// Low-confidence notes gathered along the way
    pub notes: Vec<String>,

    /// Completed node executions
    pub iterations: usize,
    /// Completed nodes in execution order
    pub trace: Vec<NodeId>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Final state, for inspection
    pub state: ResearchState,
}

impl ResearchOutcome {
    pub fn is_success(&self) -> bool {
        self.status == ResearchStatus::Done
    }

    /// How many times `node` ran to completion
    pub fn executions(&self, node: NodeId) -> usize {
        self.trace.iter().filter(|n| **n == node).count()
    }
}

// =============================================================================
// ENGINE
// =============================================================================
/// One agent per node.
#[derive(Clone)]
struct NodeAgents {
    query_analysis: Arc<dyn Agent>,
    search: Arc<dyn Agent>,
    analyze: Arc<dyn Agent>,
    synthesize: Arc<dyn Agent>,
    validate: Arc<dyn Agent>,
}

impl NodeAgents {
    fn get(&self, node: NodeId) -> &Arc<dyn Agent> {
        match node {
            NodeId::QueryAnalysis => &self.query_analysis,
            NodeId::Search => &self.search,
            NodeId::Analyze => &self.analyze,
            NodeId::Synthesize => &self.synthesize,
            NodeId::Validate => &self.validate,
        }
    }

    fn set(&mut self, node: NodeId, agent: Arc<dyn Agent>) {
        match node {
            NodeId::QueryAnalysis => self.query_analysis = agent,
            NodeId::Search => self.search = agent,
            NodeId::Analyze => self.analyze = agent,
            NodeId::Synthesize => self.synthesize = agent,
            NodeId::Validate => self.validate = agent,
        }
    }
}

/// Executes research runs. Shareable across concurrent runs; each run owns
/// its own state.
#[derive(Clone)]
pub struct WorkflowEngine {
    config: WorkflowConfig,
    tools: ResearchTools,
    agents: NodeAgents,
}

impl WorkflowEngine {
    /// Engine with the standard agent for every node.
    pub fn new(
        config: WorkflowConfig,
        model: Arc<dyn LanguageModel>,
        search: Arc<SearchAdapter>,
    ) -> Self {
        let tools = ResearchTools::new(search);
        let agents = NodeAgents {
            query_analysis: Arc::new(
                QueryAnalysisAgent::new().with_escalation(config.escalate_complex_queries),
            ),
            search: Arc::new(Self::search_agent(&config, &tools)),
            analyze: Arc::new(
                AnalysisAgent::new(model.clone(), tools.clone())
                    .with_max_key_points(config.max_key_points),
            ),
            synthesize: Arc::new(SynthesisAgent::new(model)),
            validate: Arc::new(ValidationAgent::new()),
        };

        Self {
            config,
            tools,
            agents,
        }
    }

    /// Engine backed by Ollama and the providers enabled in `config`.
    pub fn from_config(config: &Config) -> Self {
        let model = OllamaModel::new(&config.ollama_host, config.model.clone())
            .with_temperature(config.temperature);
        let search = SearchAdapter::from_settings(&config.provider_settings(), config.provider_timeout());
        Self::new(config.workflow_config(), Arc::new(model), Arc::new(search))
    }

    fn search_agent(config: &WorkflowConfig, tools: &ResearchTools) -> SearchAgent {
        SearchAgent::new(tools.clone())
            .with_max_results(config.max_search_results)
            .with_max_key_points(config.max_key_points)
    }

    /// Replace the agent behind `node`.
    pub fn with_agent(mut self, node: NodeId, agent: Arc<dyn Agent>) -> Self {
        self.agents.set(node, agent);
        self
    }

    /// Use `refiner` for search passes after the first.
    pub fn with_refiner(mut self, refiner: Arc<dyn QueryRefiner>) -> Self {
        let agent = Self::search_agent(&self.config, &self.tools).with_refiner(refiner);
        self.agents.set(NodeId::Search, Arc::new(agent));
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Search providers this engine falls back across, in priority order.
    pub fn providers(&self) -> Vec<ProviderKind> {
        self.tools.search_adapter().providers()
    }

    /// Entry point taking the depth as text (`basic`, `standard`, `deep`).
    ///
    /// An unknown depth yields a failed outcome with `InvalidRequest`.
    pub async fn research_topic(&self, query: &str, depth: &str) -> ResearchOutcome {
        match depth.parse::<Depth>() {
            Ok(depth) => self.run(query, depth).await,
            Err(e) => {
                warn!(depth = %depth, "Rejecting research request");
                let started_at = Utc::now();
                let state = ResearchState::new(query.trim(), Depth::default())
                    .fail(ErrorDescriptor::new(ErrorKind::InvalidRequest, e.to_string()));
                self.outcome(Uuid::new_v4(), state, Vec::new(), started_at)
            }
        }
    }

    /// Run the research graph for `query` at `depth`.
    pub async fn run(&self, query: &str, depth: Depth) -> ResearchOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!("research_run", run_id = %run_id, depth = %depth);
        self.run_inner(run_id, query, depth).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, query: &str, depth: Depth) -> ResearchOutcome {
        let started_at = Utc::now();
        let mut state = ResearchState::new(query.trim(), depth);
        let mut trace = Vec::new();

        if state.query.is_empty() {
            warn!("Rejecting blank query");
            let state = state.fail(ErrorDescriptor::new(
                ErrorKind::InvalidRequest,
                "query must not be blank",
            ));
            return self.outcome(run_id, state, trace, started_at);
        }

        info!(query = %state.query, "Starting research run");
        let deadline = Instant::now() + self.config.timeout;
        let mut node = NodeId::ENTRY;

        loop {
            if state.iteration >= self.config.max_iterations {
                warn!(iteration = state.iteration, node = %node, "Iteration limit reached");
                state = state.fail(ErrorDescriptor::new(
                    ErrorKind::IterationLimitExceeded,
                    format!(
                        "{} node executions reached before {}",
                        self.config.max_iterations, node
                    ),
                ));
                break;
            }

            let agent = self.agents.get(node);
            info!(node = %node, agent = agent.name(), iteration = state.iteration, "Executing node");

            let step = match tokio::time::timeout_at(deadline, agent.step(&state)).await {
                Ok(step) => step,
                Err(_) => {
                    warn!(node = %node, timeout = ?self.config.timeout, "Run timed out");
                    state = state.fail(ErrorDescriptor::new(
                        ErrorKind::TimeoutExceeded,
                        format!(
                            "run exceeded {:?} while executing {}",
                            self.config.timeout, node
                        ),
                    ));
                    break;
                }
            };

            state.iteration += 1;
            trace.push(node);

            match step {
                Ok(fragment) => {
                    state = state.merge(fragment);
                }
                Err(e) => {
                    error!(node = %node, error = %e, "Node failed");
                    state = state.fail(ErrorDescriptor::from(&e));
                    break;
                }
            }

            match route(node, &state, &self.config) {
                RouteDecision::Continue(next) => {
                    if node == NodeId::Validate && next == NodeId::Analyze {
                        info!("Validation failed, revisiting analysis once");
                        state.revisited = true;
                    }
                    node = next;
                }
                RouteDecision::Terminate(TerminationReason::Completed) => {
                    state = state.complete();
                    break;
                }
                RouteDecision::Terminate(TerminationReason::ValidationLoopExceeded) => {
                    let issues = state
                        .validation
                        .as_ref()
                        .map(|v| v.issues.join("; "))
                        .unwrap_or_default();
                    warn!(issues = %issues, "Validation failed after revisit");
                    state = state.fail(ErrorDescriptor::new(
                        ErrorKind::ValidationLoopExceeded,
                        format!("validation failed after revisiting analysis: {}", issues),
                    ));
                    break;
                }
            }
        }

        info!(
            status = %state.status,
            iterations = state.iteration,
            sources = state.sources.len(),
            "Research run finished"
        );
        self.outcome(run_id, state, trace, started_at)
    }

    fn outcome(
        &self,
        run_id: Uuid,
        state: ResearchState,
        trace: Vec<NodeId>,
        started_at: DateTime<Utc>,
    ) -> ResearchOutcome {
        let analysis = state.analysis_text().to_string();
        let (summary, sentiment, entities) = if analysis.trim().is_empty() {
            (None, None, Vec::new())
        } else {
            (
                self.tools.summarize(&analysis, self.config.summary_length).ok(),
                self.tools.analyze_sentiment(&analysis).ok(),
                self.tools.extract_entities(&analysis).ok().unwrap_or_default(),
            )
        };

        ResearchOutcome {
            run_id,
            status: state.status,
            analysis,
            sources: state.sources.clone(),
            key_insights: state.key_insights.clone(),
            error: state.error.clone(),
            summary,
            sentiment,
            entities,
            follow_up_questions: state.follow_up_questions.clone(),
            notes: state.notes.clone(),
            iterations: state.iteration,
            trace,
            started_at,
            finished_at: Utc::now(),
            state,
        }
    }
}
