//! Serper (Google results) backend

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{http_client, status_error, RawHit, SearchBackend, DEFAULT_TIMEOUT};
use crate::error::ProviderError;
use crate::state::ProviderKind;

const DEFAULT_BASE_URL: &str = "https://google.serper.dev";

pub struct SerperBackend {
    api_key: String,
    client: Client,
    base_url: String,
}

impl SerperBackend {
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

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: usize,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    // absent when Google has nothing
    #[serde(default)]
    organic: Vec<SerperOrganic>,
}

#[derive(Debug, Deserialize)]
struct SerperOrganic {
    #[serde(default)]
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
}

#[async_trait]
impl SearchBackend for SerperBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Serper
    }

    async fn raw_search(&self, query: &str, max_results: usize) -> Result<Vec<RawHit>, ProviderError> {
        let provider = self.kind();

        debug!(query = %query, "Querying Serper");
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("X-API-KEY", &self.api_key)
            .json(&SerperRequest {
                q: query,
                num: max_results,
            })
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(provider, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(provider, status, &body));
        }

        let body: SerperResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(provider, e.to_string()))?;

        Ok(body
            .organic
            .into_iter()
            .map(|r| RawHit::new(r.title, r.link, r.snippet))
            .collect())
    }
}
