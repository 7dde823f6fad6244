//! # Configuration Module
//!
//! Two layers of configuration:
//!
//! - [`Config`]: everything the binary reads from the environment (and an
//!   optional `.env` file) - model settings, provider credentials, limits.
//! - [`WorkflowConfig`]: the immutable value the workflow engine is built
//!   with. The engine never looks at process environment itself, so
//!   concurrent runs with different configurations stay independent.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::state::{Depth, ProviderKind};

/// Default priority order of search providers
pub const DEFAULT_PROVIDER_ORDER: [ProviderKind; 3] = [
    ProviderKind::Tavily,
    ProviderKind::Serper,
    ProviderKind::DuckDuckGo,
];

// =============================================================================
// WORKFLOW CONFIGURATION
// =============================================================================
/// Limits and tuning for the workflow engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Node executions allowed per run
    pub max_iterations: usize,

    /// Wall-clock budget for a whole run
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Refinement passes allowed after the first search pass at `deep`
    pub max_search_iterations_deep: usize,

    /// Result budget handed to the search adapter per pass
    pub max_search_results: usize,

    /// Key points extracted per text-analysis call
    pub max_key_points: usize,

    /// Target length (characters) of the summary attached to the result
    pub summary_length: usize,

    /// Escalate `basic` to `standard` for comparative/evaluative queries
    pub escalate_complex_queries: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            timeout: Duration::from_secs(300),
            max_search_iterations_deep: 3,
            max_search_results: 5,
            max_key_points: 5,
            summary_length: 1200,
            escalate_complex_queries: false,
        }
    }
}

impl WorkflowConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_search_iterations_deep(mut self, max: usize) -> Self {
        self.max_search_iterations_deep = max;
        self
    }

    pub fn with_max_search_results(mut self, max: usize) -> Self {
        self.max_search_results = max.max(1);
        self
    }

    pub fn with_max_key_points(mut self, max: usize) -> Self {
        self.max_key_points = max;
        self
    }

    pub fn with_escalation(mut self, enabled: bool) -> Self {
        self.escalate_complex_queries = enabled;
        self
    }

    /// Refinement passes allowed after the first search pass.
    ///
    /// `basic` never refines; `standard` refines once.
    pub fn max_search_iterations(&self, depth: Depth) -> usize {
        match depth {
            Depth::Basic => 0,
            Depth::Standard => 1,
            Depth::Deep => self.max_search_iterations_deep,
        }
    }
}

// =============================================================================
// PROVIDER SETTINGS
// =============================================================================
/// A search provider together with its credential, if any.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for ProviderSettings {
    // keep keys out of logs
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("kind", &self.kind)
            .field("has_credentials", &self.api_key.is_some())
            .finish()
    }
}

impl ProviderSettings {
    pub fn is_enabled(&self) -> bool {
        !self.kind.requires_credentials() || self.api_key.is_some()
    }
}

// =============================================================================
// APPLICATION CONFIGURATION
// =============================================================================
/// Main configuration for the research workflow binary.
#[derive(Debug, Clone)]
pub struct Config {
    /// The Ollama model to use (e.g., "llama3.2")
    pub model: String,

    /// Ollama server URL (default: http://localhost:11434)
    pub ollama_host: String,

    /// Temperature for LLM responses (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,

    /// Maximum number of search results per search pass
    pub max_search_results: usize,

    /// Log level for the application
    pub log_level: String,

    /// Verbose state-change logging
    pub debug: bool,

    pub tavily_api_key: Option<String>,
    pub serper_api_key: Option<String>,

    /// Provider priority order (before credential filtering)
    pub provider_order: Vec<ProviderKind>,

    /// Per-request HTTP timeout for search providers
    pub provider_timeout_secs: u64,

    pub max_iterations: usize,
    pub timeout_seconds: u64,
    pub max_search_iterations_deep: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_string(),
            ollama_host: "http://localhost:11434".to_string(),
            temperature: 0.1,
            max_search_results: 5,
            log_level: "info".to_string(),
            debug: false,
            tavily_api_key: None,
            serper_api_key: None,
            provider_order: DEFAULT_PROVIDER_ORDER.to_vec(),
            provider_timeout_secs: 30,
            max_iterations: 10,
            timeout_seconds: 300,
            max_search_iterations_deep: 3,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Config::default();

        if let Ok(val) = env::var("OLLAMA_MODEL") {
            config.model = val;
        }

        if let Ok(val) = env::var("OLLAMA_API_BASE_URL") {
            config.ollama_host = val;
        }

        if let Ok(val) = env::var("TEMPERATURE") {
            config.temperature = val
                .parse()
                .context("TEMPERATURE must be a valid floating-point number (e.g., 0.1)")?;
        }

        if let Ok(val) = env::var("MAX_SEARCH_RESULTS") {
            config.max_search_results = val
                .parse()
                .context("MAX_SEARCH_RESULTS must be a valid positive integer")?;
        }

        if let Ok(val) = env::var("RUST_LOG") {
            config.log_level = val;
        }

        if let Ok(val) = env::var("DEBUG") {
            config.debug = matches!(val.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        config.tavily_api_key = non_empty_var("TAVILY_API_KEY");
        config.serper_api_key = non_empty_var("SERPER_API_KEY");

        if let Ok(val) = env::var("SEARCH_PROVIDERS") {
            config.provider_order = parse_provider_order(&val)?;
        }

        if let Ok(val) = env::var("PROVIDER_TIMEOUT_SECONDS") {
            config.provider_timeout_secs = val
                .parse()
                .context("PROVIDER_TIMEOUT_SECONDS must be a whole number of seconds")?;
        }

        if let Ok(val) = env::var("MAX_ITERATIONS") {
            config.max_iterations = val
                .parse()
                .context("MAX_ITERATIONS must be a valid positive integer")?;
        }

        if let Ok(val) = env::var("TIMEOUT_SECONDS") {
            config.timeout_seconds = val
                .parse()
                .context("TIMEOUT_SECONDS must be a whole number of seconds")?;
        }

        if let Ok(val) = env::var("MAX_SEARCH_ITERATIONS_DEEP") {
            config.max_search_iterations_deep = val
                .parse()
                .context("MAX_SEARCH_ITERATIONS_DEEP must be a non-negative integer")?;
        }

        Ok(config)
    }

    /// Validate the configuration before anything runs.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "Temperature must be between 0.0 and 2.0, got: {}",
                self.temperature
            );
        }

        if self.max_search_results == 0 {
            anyhow::bail!("MAX_SEARCH_RESULTS must be at least 1");
        }

        if self.model.is_empty() {
            anyhow::bail!("OLLAMA_MODEL cannot be empty");
        }

        if self.max_iterations == 0 {
            anyhow::bail!("MAX_ITERATIONS must be at least 1");
        }

        if self.timeout_seconds == 0 {
            anyhow::bail!("TIMEOUT_SECONDS must be at least 1");
        }

        if self.enabled_providers().is_empty() {
            anyhow::bail!(
                "No search provider is enabled; set TAVILY_API_KEY / SERPER_API_KEY or include duckduckgo in SEARCH_PROVIDERS"
            );
        }

        Ok(())
    }

    /// Providers in priority order, with their credentials.
    pub fn provider_settings(&self) -> Vec<ProviderSettings> {
        self.provider_order
            .iter()
            .map(|kind| ProviderSettings {
                kind: *kind,
                api_key: match kind {
                    ProviderKind::Tavily => self.tavily_api_key.clone(),
                    ProviderKind::Serper => self.serper_api_key.clone(),
                    ProviderKind::DuckDuckGo => None,
                },
            })
            .collect()
    }

    /// Providers that can actually be used, in priority order.
    pub fn enabled_providers(&self) -> Vec<ProviderKind> {
        self.provider_settings()
            .into_iter()
            .filter(ProviderSettings::is_enabled)
            .map(|s| s.kind)
            .collect()
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    /// The immutable engine configuration derived from this config.
    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig::default()
            .with_max_iterations(self.max_iterations)
            .with_timeout(Duration::from_secs(self.timeout_seconds))
            .with_max_search_iterations_deep(self.max_search_iterations_deep)
            .with_max_search_results(self.max_search_results)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a comma-separated provider list, dropping duplicates.
fn parse_provider_order(raw: &str) -> Result<Vec<ProviderKind>> {
    let mut order = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let kind: ProviderKind = name
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("SEARCH_PROVIDERS must list tavily, serper and/or duckduckgo")?;
        if !order.contains(&kind) {
            order.push(kind);
        }
    }
    Ok(order)
}
