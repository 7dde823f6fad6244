//! Search Provider Adapter
//!
//! A uniform interface over several web-search backends:
//!
//! - [`TavilyBackend`] (API key)
//! - [`SerperBackend`] (API key)
//! - [`DuckDuckGoBackend`] (free HTML endpoint)
//!
//! ## Fallback Policy
//!
//! Providers are tried in the configured priority order, one at a time.
//! A provider that fails is never retried; the adapter moves straight on to
//! the next one with the same query and result budget. The first provider
//! that answers wins, so every result carries that provider and lower
//! priorities are never mixed in. Only when no provider answered at all
//! does the search fail, with `AllProvidersExhausted`.
//!
//! Hits sharing a byte-identical URL collapse into one result keeping the
//! first title and snippet and the best (lowest) rank.

mod duckduckgo;
mod serper;
mod tavily;

pub use duckduckgo::DuckDuckGoBackend;
pub use serper::SerperBackend;
pub use tavily::TavilyBackend;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ProviderSettings;
use crate::error::{ProviderError, SearchError};
use crate::state::{ProviderKind, SearchResult};

/// A hit as returned by one backend, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl RawHit {
    pub fn new(title: impl Into<String>, url: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
        }
    }
}

/// One external search backend.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Run a query, returning hits in the provider's own relevance order.
    async fn raw_search(&self, query: &str, max_results: usize) -> Result<Vec<RawHit>, ProviderError>;
}

/// Ordered-fallback adapter over the configured backends.
#[derive(Clone)]
pub struct SearchAdapter {
    backends: Vec<Arc<dyn SearchBackend>>,
}

impl SearchAdapter {
    /// Backends in priority order (first = highest priority)
    pub fn new(backends: Vec<Arc<dyn SearchBackend>>) -> Self {
        Self { backends }
    }

    /// Build the enabled backends from provider settings.
    ///
    /// Providers whose credentials are missing are skipped.
    pub fn from_settings(settings: &[ProviderSettings], timeout: Duration) -> Self {
        let backends = settings
            .iter()
            .filter_map(|s| -> Option<Arc<dyn SearchBackend>> {
                match (s.kind, s.api_key.as_deref()) {
                    (ProviderKind::Tavily, Some(key)) => {
                        Some(Arc::new(TavilyBackend::new(key).with_timeout(timeout)))
                    }
                    (ProviderKind::Serper, Some(key)) => {
                        Some(Arc::new(SerperBackend::new(key).with_timeout(timeout)))
                    }
                    (ProviderKind::DuckDuckGo, _) => {
                        Some(Arc::new(DuckDuckGoBackend::new().with_timeout(timeout)))
                    }
                    (kind, None) => {
                        debug!(provider = %kind, "Skipping provider without credentials");
                        None
                    }
                }
            })
            .collect();
        Self::new(backends)
    }

    /// Enabled providers in priority order
    pub fn providers(&self) -> Vec<ProviderKind> {
        self.backends.iter().map(|b| b.kind()).collect()
    }

    /// Search with ordered fallback and URL deduplication.
    ///
    /// The first provider that answers decides the result, even when its
    /// answer is empty; lower-priority providers are only consulted after a
    /// failure.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
        let max_results = max_results.max(1);
        info!(query = %query, max_results, "Performing web search");

        let mut failures: Vec<ProviderError> = Vec::new();

        for backend in &self.backends {
            let provider = backend.kind();
            match backend.raw_search(query, max_results).await {
                Ok(hits) => {
                    debug!(provider = %provider, count = hits.len(), "Provider answered");
                    let results = normalize_hits(provider, hits, max_results);

                    if results.is_empty() {
                        warn!(query = %query, provider = %provider, "No search results found");
                    } else {
                        info!(query = %query, provider = %provider, count = results.len(), "Search completed");
                    }
                    return Ok(results);
                }
                Err(e) => {
                    warn!(provider = %provider, error = %e, "Search provider failed, falling back");
                    failures.push(e);
                }
            }
        }

        Err(SearchError::AllProvidersExhausted { attempts: failures })
    }
}

/// Map a non-success HTTP status onto the provider taxonomy.
fn status_error(provider: ProviderKind, status: reqwest::StatusCode, body: &str) -> ProviderError {
    match status.as_u16() {
        429 => ProviderError::RateLimited { provider },
        401 | 403 => ProviderError::unavailable(provider, format!("unauthorized ({}), check API key", status)),
        500..=599 => ProviderError::unavailable(provider, format!("server error ({}): {}", status, body)),
        _ => ProviderError::unavailable(provider, format!("HTTP {}: {}", status, body)),
    }
}

/// Client with the per-request timeout every backend uses
fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_default()
}

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Turn one provider's hits into results, keeping the provider's order.
///
/// Hits without a URL are dropped. A repeated URL keeps its first (best
/// ranked) title and snippet.
fn normalize_hits(provider: ProviderKind, hits: Vec<RawHit>, max_results: usize) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = Vec::new();
    for (rank, hit) in hits.into_iter().enumerate() {
        if results.len() >= max_results {
            break;
        }
        let url = hit.url.trim();
        if url.is_empty() || results.iter().any(|r| r.url == url) {
            continue;
        }
        results.push(SearchResult::new(hit.title.trim(), url, hit.snippet.trim(), provider, rank));
    }
    results
}
