use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::config::Config;
use crate::workflow::engine::Engine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    /// Admission control for evaluation runs. Requests past the limit wait
    /// here instead of piling load onto the model and fetcher backends.
    pub eval_limiter: Arc<Semaphore>,
    pub config: Config,
}
