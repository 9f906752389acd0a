use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub tavily_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Evaluations admitted concurrently; the rest queue on a semaphore.
    pub max_concurrent_evaluations: usize,
    /// Wall-clock budget for one evaluation run, in seconds.
    pub run_deadline_secs: u64,
    /// Extraction retry budget per model response.
    pub extract_max_retries: u32,
    /// Retry budget per repository-listing page request.
    pub fetch_max_retries: u32,
    /// Pagination ceiling for repository listings.
    pub fetch_max_pages: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            tavily_api_key: require_env("TAVILY_API_KEY")?,
            port: parsed_env("PORT", 8080_u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_concurrent_evaluations: parsed_env("MAX_CONCURRENT_EVALUATIONS", 4_usize)?,
            run_deadline_secs: parsed_env("RUN_DEADLINE_SECS", 300_u64)?,
            extract_max_retries: parsed_env("EXTRACT_MAX_RETRIES", 2_u32)?,
            fetch_max_retries: parsed_env("FETCH_MAX_RETRIES", 3_u32)?,
            fetch_max_pages: parsed_env("FETCH_MAX_PAGES", 3_u32)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("Environment variable '{key}' has an invalid value")),
        Err(_) => Ok(default),
    }
}
