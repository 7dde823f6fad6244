//! DuckDuckGo backend
//!
//! DuckDuckGo has no free web search API, so this scrapes the HTML endpoint.
//! Result anchors (`result__a`) give the title and a redirect link whose
//! `uddg` parameter holds the real URL; `result__snippet` gives the snippet.
//! If the markup changes and no anchors match, any `uddg=` redirect in the
//! page is used instead, titled by its domain.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

use super::{http_client, status_error, RawHit, SearchBackend, DEFAULT_TIMEOUT};
use crate::error::ProviderError;
use crate::state::ProviderKind;

const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";

pub struct DuckDuckGoBackend {
    client: Client,
    base_url: String,
}

impl DuckDuckGoBackend {
    pub fn new() -> Self {
        Self {
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

impl Default for DuckDuckGoBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DuckDuckGo
    }

    async fn raw_search(&self, query: &str, max_results: usize) -> Result<Vec<RawHit>, ProviderError> {
        let provider = self.kind();
        let url = format!("{}/html/?q={}", self.base_url, urlencoding::encode(query));

        debug!(url = %url, "Fetching search results");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(provider, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(provider, status, &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::invalid_response(provider, e.to_string()))?;

        Ok(parse_html(&body, max_results))
    }
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag regex"))
}

/// Extract hits from a DuckDuckGo HTML results page.
fn parse_html(html: &str, max_results: usize) -> Vec<RawHit> {
    let mut hits = Vec::new();
    let mut seen = HashSet::new();

    for segment in html.split("class=\"result__a\"").skip(1) {
        if hits.len() >= max_results {
            break;
        }

        let Some(href) = attr_value(segment, "href") else {
            continue;
        };
        let Some(url) = resolve_link(&href) else {
            continue;
        };
        if !seen.insert(url.clone()) {
            continue;
        }

        let title = segment
            .find('>')
            .and_then(|start| {
                let rest = &segment[start + 1..];
                rest.find("</a>").map(|end| clean_fragment(&rest[..end]))
            })
            .unwrap_or_default();

        let snippet = segment
            .find("result__snippet")
            .and_then(|pos| {
                let rest = &segment[pos..];
                let start = rest.find('>')? + 1;
                let end = rest[start..]
                    .find("</a>")
                    .or_else(|| rest[start..].find("</div>"))?;
                Some(clean_fragment(&rest[start..start + end]))
            })
            .unwrap_or_default();

        let title = if title.is_empty() {
            extract_domain(&url).unwrap_or_else(|| "Result".to_string())
        } else {
            title
        };
        hits.push(RawHit::new(title, url, snippet));
    }

    if hits.is_empty() {
        for segment in html.split("uddg=").skip(1) {
            if hits.len() >= max_results {
                break;
            }
            let Some(end) = segment.find(['&', '"', '\'']) else {
                continue;
            };
            let Ok(url) = urlencoding::decode(&segment[..end]) else {
                continue;
            };
            let url = url.into_owned();
            if url.starts_with("http") && !url.contains("duckduckgo.com") && seen.insert(url.clone()) {
                let title = extract_domain(&url).unwrap_or_else(|| "Result".to_string());
                hits.push(RawHit::new(title, url, ""));
            }
        }
    }

    hits
}

fn attr_value(segment: &str, name: &str) -> Option<String> {
    let marker = format!("{}=\"", name);
    let start = segment.find(&marker)? + marker.len();
    let end = segment[start..].find('"')?;
    Some(decode_entities(&segment[start..start + end]))
}

/// Turn a result href into the target URL, unwrapping DuckDuckGo redirects.
fn resolve_link(href: &str) -> Option<String> {
    let url = match href.find("uddg=") {
        Some(pos) => {
            let encoded = &href[pos + 5..];
            let encoded = encoded.split('&').next().unwrap_or(encoded);
            urlencoding::decode(encoded).ok()?.into_owned()
        }
        None if href.starts_with("//") => format!("https:{}", href),
        None => href.to_string(),
    };

    // ads and internal links stay on duckduckgo.com
    if !url.starts_with("http") || extract_domain(&url)?.ends_with("duckduckgo.com") {
        return None;
    }
    Some(url)
}

fn clean_fragment(fragment: &str) -> String {
    let text = tag_re().replace_all(fragment, "");
    decode_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn extract_domain(url: &str) -> Option<String> {
    url.split("//")
        .nth(1)?
        .split('/')
        .next()
        .map(|s| s.to_string())
}
