//! End-to-end workflow scenarios against deterministic stand-ins for the
//! language model and the search providers.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ai_research_workflow::agents::{Agent, AnalysisAgent};
use ai_research_workflow::error::{AgentError, ErrorKind, ModelError, ProviderError};
use ai_research_workflow::state::ProviderKind;
use ai_research_workflow::tools::{text, RawHit};
use ai_research_workflow::{
    Depth, LanguageModel, NodeId, ResearchState, ResearchStatus, ResearchTools, SearchAdapter,
    SearchBackend, StateFragment, WorkflowConfig, WorkflowEngine,
};

// =============================================================================
// STAND-INS
// =============================================================================
struct EchoModel {
    reply: String,
    delay: Option<Duration>,
}

impl EchoModel {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            delay: None,
        })
    }

    fn sleeping(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: "late answer".to_string(),
            delay: Some(delay),
        })
    }
}

#[async_trait]
impl LanguageModel for EchoModel {
    async fn generate(&self, _prompt: &str, _context: &ResearchState) -> Result<String, ModelError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// Backend with a fixed answer.
struct FixedBackend {
    kind: ProviderKind,
    answer: Result<Vec<RawHit>, ProviderError>,
}

impl FixedBackend {
    fn ok(kind: ProviderKind, hits: Vec<RawHit>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            answer: Ok(hits),
        })
    }

    fn err(kind: ProviderKind, error: ProviderError) -> Arc<Self> {
        Arc::new(Self {
            kind,
            answer: Err(error),
        })
    }
}

#[async_trait]
impl SearchBackend for FixedBackend {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn raw_search(&self, _query: &str, _max_results: usize) -> Result<Vec<RawHit>, ProviderError> {
        self.answer.clone()
    }
}

/// Backend that returns a fresh URL on every call, so deep runs keep refining.
struct FreshBackend {
    calls: AtomicUsize,
}

#[async_trait]
impl SearchBackend for FreshBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Tavily
    }

    async fn raw_search(&self, query: &str, _max_results: usize) -> Result<Vec<RawHit>, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![RawHit::new(
            format!("Result {}", n),
            format!("https://example.com/{}", n),
            format!("Borrow checking catches aliasing bugs in {} pass {}.", query, n),
        )])
    }
}

/// Wraps an agent and counts its invocations.
struct Counting {
    inner: AnalysisAgent,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Agent for Counting {
    fn name(&self) -> &str {
        "counting_analyze"
    }

    async fn step(&self, state: &ResearchState) -> Result<StateFragment, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.step(state).await
    }
}

/// An analysis step whose tool is broken.
struct BrokenTool;

#[async_trait]
impl Agent for BrokenTool {
    fn name(&self) -> &str {
        "broken_tool"
    }

    async fn step(&self, _state: &ResearchState) -> Result<StateFragment, AgentError> {
        Err(AgentError::ToolFailure("citation index offline".into()))
    }
}

fn adapter(backends: Vec<Arc<dyn SearchBackend>>) -> Arc<SearchAdapter> {
    Arc::new(SearchAdapter::new(backends))
}

fn single(hits: Vec<RawHit>) -> Arc<SearchAdapter> {
    adapter(vec![FixedBackend::ok(ProviderKind::DuckDuckGo, hits)])
}

// =============================================================================
// SCENARIOS
// =============================================================================
#[tokio::test]
async fn test_end_to_end_basic_run() {
    let engine = WorkflowEngine::new(
        WorkflowConfig::default(),
        EchoModel::replying("analysis text"),
        single(vec![RawHit::new("T", "u1", "s")]),
    );

    let outcome = engine.research_topic("test", "basic").await;

    assert_eq!(outcome.status, ResearchStatus::Done, "{:?}", outcome.error);
    assert_eq!(outcome.status.to_string(), "done");
    assert_eq!(outcome.sources, vec!["u1".to_string()]);
    assert_eq!(outcome.analysis, "analysis text");
    assert_eq!(outcome.executions(NodeId::Search), 1);
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn test_every_depth_terminates_within_limit() {
    for depth in [Depth::Basic, Depth::Standard, Depth::Deep] {
        for max_iterations in [1, 3, 5, 10] {
            let engine = WorkflowEngine::new(
                WorkflowConfig::default().with_max_iterations(max_iterations),
                EchoModel::replying("Ownership rules prevent data races."),
                Arc::new(SearchAdapter::new(vec![Arc::new(FreshBackend {
                    calls: AtomicUsize::new(0),
                })])),
            );

            let outcome = engine.run("rust ownership", depth).await;

            assert!(outcome.status.is_terminal());
            assert!(
                outcome.iterations <= max_iterations,
                "{} ran {} nodes with limit {}",
                depth,
                outcome.iterations,
                max_iterations
            );
            assert_eq!(outcome.state.iteration, outcome.iterations);
        }
    }
}

#[tokio::test]
async fn test_deep_run_refines_until_limit() {
    let engine = WorkflowEngine::new(
        WorkflowConfig::default(),
        EchoModel::replying("Ownership rules prevent data races."),
        Arc::new(SearchAdapter::new(vec![Arc::new(FreshBackend {
            calls: AtomicUsize::new(0),
        })])),
    );

    let outcome = engine.run("rust ownership", Depth::Deep).await;

    assert!(outcome.is_success(), "{:?}", outcome.error);
    // one initial pass plus three refinements
    assert_eq!(outcome.executions(NodeId::Search), 4);
    assert_eq!(outcome.sources.len(), 4);
    assert_eq!(outcome.iterations, 8);
}

#[tokio::test]
async fn test_sources_come_from_search_results() {
    let engine = WorkflowEngine::new(
        WorkflowConfig::default(),
        EchoModel::replying("Rust prevents data races at compile time."),
        adapter(vec![
            FixedBackend::ok(
                ProviderKind::Tavily,
                vec![
                    RawHit::new("A", "https://a.example", "Send and Sync mark thread safety."),
                    RawHit::new("B", "", "A hit without a URL."),
                ],
            ),
            FixedBackend::ok(
                ProviderKind::DuckDuckGo,
                vec![RawHit::new("C", "https://c.example", "The borrow checker enforces aliasing rules.")],
            ),
        ]),
    );

    let outcome = engine.run("rust data races", Depth::Standard).await;

    let urls: HashSet<&str> = outcome
        .state
        .search_results
        .iter()
        .map(|r| r.url.as_str())
        .collect();
    assert!(!outcome.sources.is_empty());
    for source in &outcome.sources {
        assert!(urls.contains(source.as_str()), "{} has no search result", source);
    }
    assert!(!outcome.sources.iter().any(String::is_empty));
}

#[tokio::test]
async fn test_rate_limited_provider_falls_back() {
    let search = SearchAdapter::new(vec![
        FixedBackend::err(
            ProviderKind::Tavily,
            ProviderError::RateLimited {
                provider: ProviderKind::Tavily,
            },
        ),
        FixedBackend::ok(
            ProviderKind::Serper,
            vec![
                RawHit::new("R1", "https://r1.example", "first"),
                RawHit::new("R2", "https://r2.example", "second"),
            ],
        ),
    ]);

    let results = search.search("rust", 5).await.unwrap();

    let urls: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec!["https://r1.example", "https://r2.example"]);
    assert!(results.iter().all(|r| r.provider == ProviderKind::Serper));
}

#[tokio::test]
async fn test_duplicate_urls_keep_higher_priority_snippet() {
    let search = SearchAdapter::new(vec![
        FixedBackend::ok(
            ProviderKind::Tavily,
            vec![
                RawHit::new("Tavily", "https://same.example", "tavily snippet"),
                RawHit::new("Tavily again", "https://same.example", "repeated snippet"),
            ],
        ),
        FixedBackend::ok(
            ProviderKind::Serper,
            vec![
                RawHit::new("Serper", "https://same.example", "serper snippet"),
                RawHit::new("Other", "https://other.example", "other snippet"),
            ],
        ),
    ]);

    let results = search.search("rust", 5).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].url, "https://same.example");
    assert_eq!(results[0].snippet, "tavily snippet");
    assert_eq!(results[0].provider, ProviderKind::Tavily);
}

#[tokio::test]
async fn test_fallback_never_mixes_in_lower_priorities() {
    let search = SearchAdapter::new(vec![
        FixedBackend::err(
            ProviderKind::Tavily,
            ProviderError::RateLimited {
                provider: ProviderKind::Tavily,
            },
        ),
        FixedBackend::ok(
            ProviderKind::Serper,
            vec![
                RawHit::new("R1", "r1", "first"),
                RawHit::new("R2", "r2", "second"),
            ],
        ),
        FixedBackend::ok(
            ProviderKind::DuckDuckGo,
            vec![RawHit::new("R3", "r3", "third")],
        ),
    ]);

    let results = search.search("rust", 5).await.unwrap();

    let got: Vec<(&str, ProviderKind)> = results.iter().map(|r| (r.url.as_str(), r.provider)).collect();
    assert_eq!(
        got,
        vec![("r1", ProviderKind::Serper), ("r2", ProviderKind::Serper)]
    );
}

#[test]
fn test_key_points_bounded_and_deterministic() {
    let text = "Rust is a systems language. Ownership governs memory. \
                Borrowing allows references without moves. Lifetimes bound references. \
                The borrow checker enforces ownership and borrowing rules at compile time.";

    let first = text::extract_key_points(text, 3);
    let second = text::extract_key_points(text, 3);

    assert!(first.len() <= 3);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_empty_synthesis_revisits_analysis_once() {
    let model = EchoModel::replying("");
    let search = single(vec![RawHit::new("T", "u1", "Rust has an ownership model.")]);
    let calls = Arc::new(AtomicUsize::new(0));
    let counting = Counting {
        inner: AnalysisAgent::new(model.clone(), ResearchTools::new(search.clone())),
        calls: calls.clone(),
    };

    let engine = WorkflowEngine::new(WorkflowConfig::default(), model, search)
        .with_agent(NodeId::Analyze, Arc::new(counting));

    let outcome = engine.run("rust ownership", Depth::Basic).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(outcome.executions(NodeId::Analyze), 2);
    assert_eq!(outcome.executions(NodeId::Validate), 2);
    assert_eq!(outcome.status, ResearchStatus::Failed);
    assert_eq!(
        outcome.error.as_ref().map(|e| e.kind),
        Some(ErrorKind::ValidationLoopExceeded)
    );
}

#[tokio::test]
async fn test_agent_tool_failure_ends_run() {
    let engine = WorkflowEngine::new(
        WorkflowConfig::default(),
        EchoModel::replying("unused"),
        single(vec![RawHit::new("T", "u1", "Rust has an ownership model.")]),
    )
    .with_agent(NodeId::Analyze, Arc::new(BrokenTool));

    let outcome = engine.run("rust ownership", Depth::Basic).await;

    assert_eq!(outcome.status, ResearchStatus::Failed);
    let error = outcome.error.as_ref().expect("error recorded");
    assert_eq!(error.kind, ErrorKind::ToolFailure);
    assert!(error.message.contains("citation index offline"));
    // state merged before the failing step survives
    assert_eq!(outcome.sources, vec!["u1".to_string()]);
    assert_eq!(
        outcome.trace,
        vec![NodeId::QueryAnalysis, NodeId::Search, NodeId::Analyze]
    );
}

#[tokio::test]
async fn test_slow_model_times_out_with_prior_state() {
    let engine = WorkflowEngine::new(
        WorkflowConfig::default().with_timeout(Duration::from_millis(200)),
        EchoModel::sleeping(Duration::from_secs(10)),
        single(vec![RawHit::new("T", "u1", "Rust guarantees memory safety.")]),
    );

    let outcome = engine.run("rust memory safety", Depth::Basic).await;

    assert_eq!(outcome.status, ResearchStatus::Failed);
    assert_eq!(
        outcome.error.as_ref().map(|e| e.kind),
        Some(ErrorKind::TimeoutExceeded)
    );
    assert_eq!(outcome.sources, vec!["u1".to_string()]);
    assert_eq!(
        outcome.key_insights,
        vec!["Rust guarantees memory safety.".to_string()]
    );
    // the aborted analyze step is not counted
    assert_eq!(outcome.trace, vec![NodeId::QueryAnalysis, NodeId::Search]);
    assert!(outcome.analysis.is_empty());
}

#[tokio::test]
async fn test_all_providers_failing_degrades_to_note() {
    let engine = WorkflowEngine::new(
        WorkflowConfig::default(),
        EchoModel::replying("Nothing could be found."),
        adapter(vec![FixedBackend::err(
            ProviderKind::DuckDuckGo,
            ProviderError::unavailable(ProviderKind::DuckDuckGo, "connection refused"),
        )]),
    );

    let outcome = engine.run("rust", Depth::Basic).await;

    // search failure is absorbed; validation then fails on missing sources
    assert_eq!(outcome.status, ResearchStatus::Failed);
    assert_eq!(
        outcome.error.as_ref().map(|e| e.kind),
        Some(ErrorKind::ValidationLoopExceeded)
    );
    assert!(outcome.notes.iter().any(|n| n.starts_with("Low confidence")));
    assert!(outcome.sources.is_empty());
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let engine = WorkflowEngine::new(
        WorkflowConfig::default(),
        EchoModel::replying("Tokio schedules tasks cooperatively."),
        single(vec![RawHit::new("T", "u1", "Tokio is an async runtime.")]),
    );

    let queries = ["tokio runtime", "async rust", "futures executors"];
    let outcomes =
        futures::future::join_all(queries.iter().map(|q| engine.run(q, Depth::Basic))).await;

    let ids: HashSet<_> = outcomes.iter().map(|o| o.run_id).collect();
    assert_eq!(ids.len(), queries.len());
    for (query, outcome) in queries.iter().zip(&outcomes) {
        assert!(outcome.is_success(), "{:?}", outcome.error);
        assert_eq!(outcome.state.query, *query);
    }
}

#[tokio::test]
async fn test_outcome_serializes_to_json() {
    let engine = WorkflowEngine::new(
        WorkflowConfig::default(),
        EchoModel::replying("Rust is memory safe."),
        single(vec![RawHit::new("T", "u1", "Rust has an ownership model.")]),
    );

    let outcome = engine.research_topic("rust", "basic").await;
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["status"], "done");
    assert_eq!(json["sources"][0], "u1");
    assert_eq!(json["trace"][0], "query_analysis");
}
