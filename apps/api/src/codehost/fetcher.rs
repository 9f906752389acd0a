//! Profile fetcher — paginated retrieval of a public profile's repositories
//! over the unauthenticated API, tolerant of throttling.
//!
//! Failure semantics: throttling gets exponential backoff under a bounded
//! retry budget; budget exhaustion returns whatever was already collected
//! with `ok = false` (partial beats total failure). Profile-not-found is an
//! expected outcome — resume-extracted usernames are unverified.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const DEFAULT_API_BASE: &str = "https://api.github.com";
const PER_PAGE: u32 = 100;
const USER_AGENT: &str = concat!("screener-api/", env!("CARGO_PKG_VERSION"));
/// Repositories forwarded to the model as evidence, most recently updated
/// first, forks excluded.
const EVIDENCE_LIMIT: usize = 10;

/// One public repository as returned by the repos listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub fork: bool,
}

/// Result of a repository fetch. `ok = false` with a non-empty list means a
/// partial result (throttle budget exhausted mid-pagination); `ok = false`
/// with an empty list usually means the profile does not exist.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub repositories: Vec<Repository>,
    pub ok: bool,
}

/// The repository-retrieval seam consumed by the Code-Host Research step.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    async fn fetch_repositories(&self, username: &str) -> FetchOutcome;
}

pub struct RepoFetcher {
    http: reqwest::Client,
    api_base: String,
    max_pages: u32,
    max_retries: u32,
}

impl RepoFetcher {
    pub fn new(http: reqwest::Client, max_pages: u32, max_retries: u32) -> Self {
        RepoFetcher {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
            max_pages,
            max_retries,
        }
    }

    /// Fetches one page, retrying throttled or transient failures with
    /// exponential backoff.
    async fn fetch_page(&self, username: &str, page: u32) -> PageResult {
        let url = format!(
            "{}/users/{}/repos?per_page={}&page={}&sort=updated",
            self.api_base, username, PER_PAGE, page
        );

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = std::time::Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(
                    username,
                    page,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "repository fetch throttled, backing off"
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .http
                .get(&url)
                .header("user-agent", USER_AGENT)
                .header("accept", "application/vnd.github+json")
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    warn!(username, page, error = %e, "repository fetch request failed");
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 404 {
                info!(username, "code-host profile not found");
                return PageResult::NotFound;
            }
            // 403 is how the unauthenticated API reports rate limiting.
            if status.as_u16() == 403 || status.as_u16() == 429 || status.is_server_error() {
                continue;
            }
            if !status.is_success() {
                warn!(username, page, status = status.as_u16(), "repository fetch rejected");
                return PageResult::Failed;
            }

            match response.json::<Vec<Repository>>().await {
                Ok(repos) => {
                    debug!(username, page, count = repos.len(), "repository page fetched");
                    return PageResult::Page(repos);
                }
                Err(e) => {
                    warn!(username, page, error = %e, "repository page failed to decode");
                    return PageResult::Failed;
                }
            }
        }

        PageResult::Failed
    }
}

enum PageResult {
    Page(Vec<Repository>),
    NotFound,
    Failed,
}

#[async_trait]
impl RepositorySource for RepoFetcher {
    async fn fetch_repositories(&self, username: &str) -> FetchOutcome {
        let mut collected: Vec<Repository> = Vec::new();

        for page in 1..=self.max_pages {
            match self.fetch_page(username, page).await {
                PageResult::Page(repos) => {
                    let exhausted = (repos.len() as u32) < PER_PAGE;
                    collected.extend(repos);
                    if exhausted {
                        return FetchOutcome {
                            repositories: collected,
                            ok: true,
                        };
                    }
                }
                PageResult::NotFound | PageResult::Failed => {
                    return FetchOutcome {
                        repositories: collected,
                        ok: false,
                    };
                }
            }
        }

        // Page ceiling reached with full pages throughout: a complete-enough
        // result, not a failure.
        FetchOutcome {
            repositories: collected,
            ok: true,
        }
    }
}

/// Selects the repositories worth showing the model: forks dropped, most
/// recently updated first, capped.
pub fn select_evidence(repositories: &[Repository]) -> Vec<&Repository> {
    let mut own: Vec<&Repository> = repositories.iter().filter(|r| !r.fork).collect();
    own.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    own.truncate(EVIDENCE_LIMIT);
    own
}
