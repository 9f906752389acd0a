//! Step executors — thin adapters between shared state and the model.
//!
//! Every executor consumes a read-only view of the run, produces exactly one
//! typed record through the extraction layer, and never writes state itself;
//! merging is the engine's job.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::codehost::fetcher::{select_evidence, RepositorySource};
use crate::codehost::resolver::CodeHostIdentity;
use crate::llm_client::TextCompleter;
use crate::websearch::{candidate_queries, WebSearcher};
use crate::workflow::extract::extract_json;
use crate::workflow::prompts;
use crate::workflow::state::{
    CandidateProfile, CodeHostProfileSummary, CodeHostResearch, Comparison, FinalDecision,
    ParsedJob, ParsedResume, Warning, WebResearch, WorkflowState,
};
use crate::workflow::WorkflowError;

pub const STEP_RESUME_PARSE: &str = "resume_parse";
pub const STEP_JOB_PARSE: &str = "job_parse";
pub const STEP_CODE_HOST_RESEARCH: &str = "code_host_research";
pub const STEP_WEB_RESEARCH: &str = "web_research";
pub const STEP_PROFILE_BUILD: &str = "profile_build";
pub const STEP_COMPARISON: &str = "comparison";
pub const STEP_FINAL_DECISION: &str = "final_decision";

/// Services and budgets shared by every step execution in one run.
pub struct StepContext<'a> {
    pub llm: &'a dyn TextCompleter,
    pub repos: &'a dyn RepositorySource,
    pub search: &'a dyn WebSearcher,
    pub extract_retries: u32,
}

impl StepContext<'_> {
    /// One model call plus extraction — the shared shape of every
    /// model-backed step.
    async fn complete_and_extract<T: DeserializeOwned>(
        &self,
        step: &'static str,
        prompt: &str,
        system: &str,
    ) -> Result<T, WorkflowError> {
        let raw = self
            .llm
            .complete(prompt, system)
            .await
            .map_err(|e| WorkflowError::ModelInvocation {
                step,
                message: e.to_string(),
            })?;

        match extract_json::<T>(&raw, self.extract_retries) {
            Ok((value, attempts)) => {
                debug!(step, attempts, "response extracted and validated");
                Ok(value)
            }
            Err(e) => Err(WorkflowError::ResponseValidation {
                step,
                attempts: e.attempts(),
                message: e.to_string(),
            }),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

pub async fn parse_resume(
    ctx: &StepContext<'_>,
    candidate_name: &str,
    resume_text: &str,
) -> Result<ParsedResume, WorkflowError> {
    info!(
        candidate = candidate_name,
        chars = resume_text.len(),
        "parsing resume"
    );
    let prompt = prompts::RESUME_PARSE_TEMPLATE
        .replace("{candidate_name}", candidate_name)
        .replace("{resume_text}", resume_text);
    let parsed: ParsedResume = ctx
        .complete_and_extract(STEP_RESUME_PARSE, &prompt, prompts::RESUME_PARSE_SYSTEM)
        .await?;
    info!(
        skills = parsed.skills.len(),
        roles = parsed.work_experience.len(),
        "resume parsed"
    );
    Ok(parsed)
}

pub async fn parse_job(
    ctx: &StepContext<'_>,
    job_description: &str,
) -> Result<ParsedJob, WorkflowError> {
    info!(chars = job_description.len(), "parsing job description");
    let prompt = prompts::JOB_PARSE_TEMPLATE.replace("{job_description}", job_description);
    let parsed: ParsedJob = ctx
        .complete_and_extract(STEP_JOB_PARSE, &prompt, prompts::JOB_PARSE_SYSTEM)
        .await?;
    info!(core_skills = parsed.core_skills.len(), "job description parsed");
    Ok(parsed)
}

/// Fetches and analyzes the candidate's public repositories. A partial fetch
/// degrades to a warning; an entirely empty failed fetch is an
/// `ExternalFetch` error the engine maps to explicit absence.
pub async fn code_host_research(
    ctx: &StepContext<'_>,
    candidate_name: &str,
    identity: &CodeHostIdentity,
    warnings: &mut Vec<Warning>,
) -> Result<CodeHostResearch, WorkflowError> {
    info!(username = %identity.username, "fetching code-host repositories");
    let outcome = ctx.repos.fetch_repositories(&identity.username).await;

    if !outcome.ok {
        if outcome.repositories.is_empty() {
            return Err(WorkflowError::ExternalFetch(format!(
                "no repositories retrievable for '{}'",
                identity.username
            )));
        }
        warnings.push(Warning::new(
            STEP_CODE_HOST_RESEARCH,
            format!(
                "repository fetch degraded to a partial result ({} repositories)",
                outcome.repositories.len()
            ),
        ));
    }

    let profile = CodeHostProfileSummary {
        username: identity.username.clone(),
        url: identity.url.clone(),
    };

    if outcome.repositories.is_empty() {
        // The profile exists but has nothing public: a found-nothing record,
        // which is not the same as the branch being absent.
        return Ok(CodeHostResearch {
            profile,
            activity_summary: "No public repositories found.".to_string(),
            ..Default::default()
        });
    }

    let evidence = select_evidence(&outcome.repositories);
    info!(
        total = outcome.repositories.len(),
        analyzed = evidence.len(),
        "analyzing repositories"
    );
    let prompt = prompts::CODE_HOST_ANALYSIS_TEMPLATE
        .replace("{candidate_name}", candidate_name)
        .replace("{username}", &identity.username)
        .replace("{profile_url}", &identity.url)
        .replace("{repository_data}", &to_json(&evidence));
    let mut research: CodeHostResearch = ctx
        .complete_and_extract(
            STEP_CODE_HOST_RESEARCH,
            &prompt,
            prompts::CODE_HOST_ANALYSIS_SYSTEM,
        )
        .await?;

    // The resolver's identity is ground truth; never let the model rewrite it.
    research.profile = profile;
    Ok(research)
}

/// Issues the candidate query set, degrading per query, then has the model
/// organize whatever came back. No results at all short-circuits to an empty
/// record rather than asking the model to invent findings.
pub async fn web_research(
    ctx: &StepContext<'_>,
    candidate_name: &str,
    identity: Option<&CodeHostIdentity>,
    warnings: &mut Vec<Warning>,
) -> Result<WebResearch, WorkflowError> {
    let mut all_results = Vec::new();
    for query in candidate_queries(candidate_name) {
        match ctx.search.search(&query).await {
            Ok(results) => {
                debug!(query = %query, count = results.len(), "search query completed");
                all_results.extend(results);
            }
            Err(e) => {
                warn!(query = %query, error = %e, "search query failed");
                warnings.push(Warning::new(
                    STEP_WEB_RESEARCH,
                    format!("search query '{query}' failed: {e}"),
                ));
            }
        }
    }

    let mut research = if all_results.is_empty() {
        WebResearch::default()
    } else {
        let code_host_context = identity
            .map(|i| format!("{} ({})", i.username, i.url))
            .unwrap_or_else(|| "none found".to_string());
        let prompt = prompts::WEB_RESEARCH_TEMPLATE
            .replace("{candidate_name}", candidate_name)
            .replace("{code_host_context}", &code_host_context)
            .replace("{search_results}", &to_json(&all_results));
        ctx.complete_and_extract(STEP_WEB_RESEARCH, &prompt, prompts::WEB_RESEARCH_SYSTEM)
            .await?
    };

    if let Some(identity) = identity {
        research
            .social_links
            .entry("github".to_string())
            .or_insert_with(|| identity.url.clone());
    }
    Ok(research)
}

/// Profile Build — a pure merge of everything gathered so far. Cannot fail.
pub fn build_candidate_profile(state: &WorkflowState) -> CandidateProfile {
    CandidateProfile {
        name: state.candidate_name.clone(),
        resume: state.parsed_resume.clone().unwrap_or_default(),
        code_host: state.code_host_research.clone(),
        web: state.web_research.clone().unwrap_or_default(),
    }
}

pub async fn compare(
    ctx: &StepContext<'_>,
    profile: &CandidateProfile,
    job: &ParsedJob,
) -> Result<Comparison, WorkflowError> {
    info!(candidate = %profile.name, "comparing candidate to job requirements");
    let prompt = prompts::COMPARISON_TEMPLATE
        .replace("{candidate_profile}", &to_json(profile))
        .replace("{job_requirements}", &to_json(job));
    ctx.complete_and_extract(STEP_COMPARISON, &prompt, prompts::COMPARISON_SYSTEM)
        .await
}

pub async fn final_decision(
    ctx: &StepContext<'_>,
    profile: &CandidateProfile,
    job: &ParsedJob,
    comparison: &Comparison,
) -> Result<FinalDecision, WorkflowError> {
    let prompt = prompts::FINAL_DECISION_TEMPLATE
        .replace("{candidate_profile}", &to_json(profile))
        .replace("{job_requirements}", &to_json(job))
        .replace("{comparison}", &to_json(comparison));
    let decision: FinalDecision = ctx
        .complete_and_extract(
            STEP_FINAL_DECISION,
            &prompt,
            prompts::FINAL_DECISION_SYSTEM,
        )
        .await?;
    info!(fit_score = ?decision.fit_score, "final decision generated");
    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::state::OnlineProfiles;

    #[test]
    fn test_profile_build_merges_all_gathered_fields() {
        let mut state = WorkflowState::new(
            "Jane Doe".to_string(),
            "resume text".to_string(),
            "job text".to_string(),
            Vec::new(),
        );
        state.parsed_resume = Some(ParsedResume {
            skills: vec!["Rust".to_string()],
            online_profiles: OnlineProfiles {
                code_host_url: Some("https://github.com/janedoe".to_string()),
                ..Default::default()
            },
            ..Default::default()
        });
        state.code_host_research = Some(CodeHostResearch::default());
        state.web_research = Some(WebResearch::default());

        let profile = build_candidate_profile(&state);
        assert_eq!(profile.name, "Jane Doe");
        assert_eq!(profile.resume.skills, vec!["Rust".to_string()]);
        assert!(profile.code_host.is_some());
    }

    #[test]
    fn test_profile_build_preserves_code_host_absence() {
        let mut state = WorkflowState::new(
            "Jane Doe".to_string(),
            String::new(),
            String::new(),
            Vec::new(),
        );
        state.parsed_resume = Some(ParsedResume::default());
        state.web_research = Some(WebResearch::default());

        let profile = build_candidate_profile(&state);
        assert!(profile.code_host.is_none());
    }
}
