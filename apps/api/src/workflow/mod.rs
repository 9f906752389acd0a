//! The evaluation workflow: state model, extraction layer, step executors
//! and the orchestration engine.

pub mod engine;
pub mod extract;
pub mod nodes;
pub mod prompts;
pub mod state;

use thiserror::Error;

use crate::docload::DocumentLoadError;

/// Failure taxonomy for a run. Whether a given error aborts the run or
/// degrades to a default-plus-warning is decided per step by the engine.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("document load failed: {0}")]
    DocumentLoad(#[from] DocumentLoadError),

    #[error("model invocation failed during {step}: {message}")]
    ModelInvocation { step: &'static str, message: String },

    #[error("response validation failed during {step} after {attempts} attempts: {message}")]
    ResponseValidation {
        step: &'static str,
        attempts: u32,
        message: String,
    },

    #[error("external fetch failed: {0}")]
    ExternalFetch(String),

    #[error("router consulted before resume parsing completed")]
    RouterInvariant,
}
