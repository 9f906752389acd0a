use axum::extract::{Multipart, State};
use axum::Json;
use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use crate::docload::{self, DocumentFormat};
use crate::errors::AppError;
use crate::state::AppState;
use crate::workflow::engine::EvaluationInput;
use crate::workflow::state::{
    CandidateProfile, CodeHostResearch, Comparison, FinalDecision, ParsedJob, ParsedResume,
    Warning, WebResearch, WorkflowState,
};

/// Response body for a completed evaluation. Fields the run could not produce
/// fall back to schema-valid defaults; an absent code-host branch stays null.
#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    pub candidate_name: String,
    pub parsed_resume: ParsedResume,
    pub parsed_job: ParsedJob,
    pub code_host_research: Option<CodeHostResearch>,
    pub web_research: WebResearch,
    pub candidate_profile: CandidateProfile,
    pub comparison: Comparison,
    pub final_decision: FinalDecision,
    pub warnings: Vec<Warning>,
}

impl From<WorkflowState> for EvaluationResponse {
    fn from(run: WorkflowState) -> Self {
        EvaluationResponse {
            candidate_name: run.candidate_name,
            parsed_resume: run.parsed_resume.unwrap_or_default(),
            parsed_job: run.parsed_job.unwrap_or_default(),
            code_host_research: run.code_host_research,
            web_research: run.web_research.unwrap_or_default(),
            candidate_profile: run.candidate_profile.unwrap_or_default(),
            comparison: run.comparison.unwrap_or_default(),
            final_decision: run.final_decision.unwrap_or_default(),
            warnings: run.warnings,
        }
    }
}

struct UploadedFile {
    filename: Option<String>,
    bytes: Bytes,
}

/// POST /api/v1/evaluations
///
/// Multipart form: `candidate_name` (text, required), `resume_file` (file,
/// required), and the job description as either `job_description` (text) or
/// `job_description_file` (file). An unreadable resume rejects the request;
/// an unreadable job file degrades to a warning.
pub async fn evaluate_handler(
    State(app): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<EvaluationResponse>, AppError> {
    let mut candidate_name: Option<String> = None;
    let mut resume_file: Option<UploadedFile> = None;
    let mut job_description: Option<String> = None;
    let mut job_file: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart request: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "candidate_name" => candidate_name = Some(read_text(field).await?),
            "resume_file" => resume_file = Some(read_file(field).await?),
            "job_description" => job_description = Some(read_text(field).await?),
            "job_description_file" => job_file = Some(read_file(field).await?),
            _ => {} // unknown fields are ignored
        }
    }

    let candidate_name = candidate_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::Validation("candidate_name is required".to_string()))?;
    let resume_file = resume_file
        .ok_or_else(|| AppError::Validation("resume_file is required".to_string()))?;

    let declared = resume_file
        .filename
        .as_deref()
        .and_then(DocumentFormat::from_filename);
    let resume_text = docload::load(&resume_file.bytes, declared).map_err(|e| {
        AppError::UnprocessableEntity(format!("Resume could not be read: {e}"))
    })?;

    let mut warnings = Vec::new();
    let job_description_text = match job_file {
        Some(file) => {
            let declared = file.filename.as_deref().and_then(DocumentFormat::from_filename);
            match docload::load(&file.bytes, declared) {
                Ok(text) => text,
                Err(e) => {
                    // The job description is optional input, so a bad file
                    // falls back to whatever plain text was supplied.
                    warnings.push(Warning::new(
                        "document_load",
                        format!("job description file unreadable: {e}"),
                    ));
                    job_description.unwrap_or_default()
                }
            }
        }
        None => job_description.unwrap_or_default(),
    };

    // Admission control; the permit is held for the whole run.
    let _permit = app
        .eval_limiter
        .acquire()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("evaluation limiter closed: {e}")))?;

    info!(candidate = %candidate_name, "evaluation admitted");
    let input = EvaluationInput {
        candidate_name,
        resume_text,
        job_description_text,
        warnings,
    };

    match app.engine.run(input).await {
        Ok(run) => Ok(Json(EvaluationResponse::from(run))),
        Err(failure) => Err(AppError::Workflow(failure.error)),
    }
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart field: {e}")))
}

async fn read_file(field: axum::extract::multipart::Field<'_>) -> Result<UploadedFile, AppError> {
    let filename = field.file_name().map(str::to_string);
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart field: {e}")))?;
    Ok(UploadedFile { filename, bytes })
}
