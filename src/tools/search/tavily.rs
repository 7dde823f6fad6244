//! Tavily Search API backend

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{http_client, status_error, RawHit, SearchBackend, DEFAULT_TIMEOUT};
use crate::error::ProviderError;
use crate::state::ProviderKind;

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

pub struct TavilyBackend {
    api_key: String,
    client: Client,
    base_url: String,
}

impl TavilyBackend {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: http_client(DEFAULT_TIMEOUT),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self
    }

    /// Point at another host (mock servers, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

#[async_trait]
impl SearchBackend for TavilyBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Tavily
    }

    async fn raw_search(&self, query: &str, max_results: usize) -> Result<Vec<RawHit>, ProviderError> {
        let provider = self.kind();
        let request = TavilyRequest {
            query,
            max_results,
            search_depth: "basic",
            include_answer: false,
        };

        debug!(query = %query, "Querying Tavily");
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(provider, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(provider, status, &body));
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(provider, e.to_string()))?;

        Ok(body
            .results
            .into_iter()
            .map(|r| RawHit::new(r.title, r.url, r.content))
            .collect())
    }
}

#[cfg(test)]
mod http_tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> TavilyBackend {
        TavilyBackend::new("test-api-key")
            .with_timeout(Duration::from_secs(5))
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_http_successful_search() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("Authorization", "Bearer test-api-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "answer": null,
                "results": [
                    {
                        "title": "Rust Programming Language",
                        "url": "https://rust-lang.org",
                        "content": "Rust is a systems programming language focused on safety.",
                        "score": 0.95
                    },
                    {
                        "title": "Learn Rust",
                        "url": "https://doc.rust-lang.org/book/",
                        "content": "The Rust Programming Language book.",
                        "score": 0.88
                    }
                ]
            })))
            .mount(&mock_server)
            .await;

        let hits = backend(&mock_server).raw_search("Rust programming", 5).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Rust Programming Language");
        assert_eq!(hits[1].url, "https://doc.rust-lang.org/book/");
    }

    #[tokio::test]
    async fn test_http_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Rate limit exceeded"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = backend(&mock_server).raw_search("test", 5).await;

        assert!(matches!(result, Err(ProviderError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn test_http_unauthorized_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .mount(&mock_server)
            .await;

        let result = backend(&mock_server).raw_search("test", 5).await;

        assert!(matches!(result, Err(ProviderError::ProviderUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_http_server_error_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = backend(&mock_server).raw_search("test", 5).await;

        assert!(matches!(result, Err(ProviderError::ProviderUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_http_malformed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let result = backend(&mock_server).raw_search("test", 5).await;

        assert!(matches!(result, Err(ProviderError::InvalidResponse { .. })));
    }
}
