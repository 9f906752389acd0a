mod codehost;
mod config;
mod docload;
mod errors;
mod llm_client;
mod routes;
mod state;
mod websearch;
mod workflow;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Semaphore;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::codehost::RepoFetcher;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::websearch::TavilyClient;
use crate::workflow::engine::{Engine, EngineSettings};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let target = env!("CARGO_PKG_NAME").replace('-', "_");
            EnvFilter::new(format!("{target}={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screener API v{}", env!("CARGO_PKG_VERSION"));

    // One HTTP client shared by the external fetchers.
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let fetcher = RepoFetcher::new(http.clone(), config.fetch_max_pages, config.fetch_max_retries);
    let searcher = TavilyClient::new(http, config.tavily_api_key.clone());

    let engine = Engine::new(
        Arc::new(llm),
        Arc::new(fetcher),
        Arc::new(searcher),
        EngineSettings {
            extract_retries: config.extract_max_retries,
            run_deadline: Duration::from_secs(config.run_deadline_secs),
        },
    );

    let state = AppState {
        engine: Arc::new(engine),
        eval_limiter: Arc::new(Semaphore::new(config.max_concurrent_evaluations)),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
