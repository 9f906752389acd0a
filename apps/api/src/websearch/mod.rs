//! Web search client — general web findings about a candidate via the
//! Tavily search API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const TAVILY_API_URL: &str = "https://api.tavily.com/search";
const MAX_RESULTS: u32 = 5;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
}

/// The web-search seam consumed by the Web Research step.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Clone)]
pub struct TavilyClient {
    http: reqwest::Client,
    api_key: String,
}

impl TavilyClient {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        TavilyClient { http, api_key }
    }
}

#[async_trait]
impl WebSearcher for TavilyClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let response = self
            .http
            .post(TAVILY_API_URL)
            .json(&SearchRequest {
                api_key: &self.api_key,
                query,
                max_results: MAX_RESULTS,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SearchResponse = response.json().await?;
        debug!(query, count = parsed.results.len(), "web search completed");
        Ok(parsed.results)
    }
}

/// The query set issued per candidate. Site-scoped queries keep the noisy
/// social results separable from blog/talk findings.
pub fn candidate_queries(candidate_name: &str) -> Vec<String> {
    vec![
        format!("{candidate_name} blog posts"),
        format!("{candidate_name} conference speaker"),
        format!("{candidate_name} portfolio"),
        format!("site:twitter.com \"{candidate_name}\""),
        format!("site:stackoverflow.com \"{candidate_name}\""),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_parses_results() {
        let json = r#"{
            "query": "Jane Doe blog posts",
            "results": [
                {"title": "Jane on Rust", "url": "https://example.com/p1", "content": "..."},
                {"url": "https://example.com/p2"}
            ]
        }"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[0].title, "Jane on Rust");
        assert!(parsed.results[1].title.is_empty());
    }

    #[test]
    fn test_search_response_tolerates_missing_results() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.results.is_empty());
    }

    #[test]
    fn test_candidate_queries_cover_blogs_talks_and_profiles() {
        let queries = candidate_queries("Jane Doe");
        assert_eq!(queries.len(), 5);
        assert!(queries.iter().any(|q| q.contains("blog")));
        assert!(queries.iter().any(|q| q.contains("conference")));
        assert!(queries.iter().any(|q| q.starts_with("site:")));
        assert!(queries.iter().all(|q| q.contains("Jane Doe")));
    }
}
