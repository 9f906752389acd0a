//! Per-run workflow state and the typed records each step produces.
//!
//! SINGLE-WRITER RULE: every field below is written by exactly one step, via
//! the engine, after that step completes. Steps themselves only ever see a
//! read-only view. Absence of `code_host_research` (`None`) means the branch
//! was skipped or failed — it is not the same as "ran and found nothing".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Structured resume record. Written once by Resume Parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedResume {
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub work_experience: Vec<WorkExperience>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub publications: Vec<String>,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub online_profiles: OnlineProfiles,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub year: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkExperience {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnlineProfiles {
    #[serde(default)]
    pub code_host_url: Option<String>,
    #[serde(default)]
    pub professional_network_url: Option<String>,
    #[serde(default)]
    pub personal_site_url: Option<String>,
    #[serde(default)]
    pub other_urls: Vec<String>,
}

/// Structured job requirements. Written once by Job Parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedJob {
    #[serde(default)]
    pub core_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    #[serde(default)]
    pub experience_level: String,
    #[serde(default)]
    pub education_requirements: Vec<String>,
    #[serde(default)]
    pub industry_domain: String,
}

/// Code-host enrichment output. Present only when the router selected the
/// branch and the step succeeded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeHostResearch {
    #[serde(default)]
    pub profile: CodeHostProfileSummary,
    #[serde(default)]
    pub key_repositories: Vec<KeyRepository>,
    #[serde(default)]
    pub primary_languages: Vec<String>,
    #[serde(default)]
    pub skill_inferences: Vec<String>,
    #[serde(default)]
    pub activity_summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeHostProfileSummary {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyRepository {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub relevance: String,
}

/// Web research output. Always attempted; may be sparse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebResearch {
    #[serde(default)]
    pub profile_mentions: Vec<Mention>,
    #[serde(default)]
    pub blog_posts: Vec<Mention>,
    #[serde(default)]
    pub conference_talks: Vec<Mention>,
    #[serde(default)]
    pub news_mentions: Vec<Mention>,
    #[serde(default)]
    pub social_links: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub summary: String,
}

/// Unified candidate view. Written once by Profile Build (a pure merge).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub name: String,
    pub resume: ParsedResume,
    pub code_host: Option<CodeHostResearch>,
    pub web: WebResearch,
}

/// Per-requirement match level. Constrained to exactly these literals;
/// anything else fails validation rather than coercing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchLevel {
    High,
    Medium,
    Low,
    None,
}

/// Overall-dimension summary. Defaults to `Weak` when a comparison could not
/// be computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallMatch {
    Strong,
    Moderate,
    #[default]
    Weak,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMatch {
    pub skill: String,
    pub match_level: MatchLevel,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceMatch {
    pub area: String,
    pub match_level: MatchLevel,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationMatch {
    pub requirement: String,
    pub match_level: MatchLevel,
    #[serde(default)]
    pub details: String,
}

/// Per-requirement comparison plus the three overall summaries. Written once
/// by the Comparison step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    #[serde(default)]
    pub skill_matches: Vec<SkillMatch>,
    #[serde(default)]
    pub experience_matches: Vec<ExperienceMatch>,
    #[serde(default)]
    pub education_matches: Vec<EducationMatch>,
    #[serde(default)]
    pub overall_skill_match: OverallMatch,
    #[serde(default)]
    pub overall_experience_match: OverallMatch,
    #[serde(default)]
    pub overall_education_match: OverallMatch,
}

/// Terminal fit verdict. Exactly these three literal values, never free text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitScore {
    #[serde(rename = "Strong Fit")]
    StrongFit,
    #[serde(rename = "Moderate Fit")]
    ModerateFit,
    #[default]
    #[serde(rename = "Not a Fit")]
    NotAFit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalDecision {
    pub fit_score: FitScore,
    pub reasoning: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl Default for FinalDecision {
    fn default() -> Self {
        FinalDecision {
            fit_score: FitScore::NotAFit,
            reasoning: "The final decision could not be computed for this run; \
                        defaulting to Not a Fit."
                .to_string(),
            recommendations: Vec::new(),
        }
    }
}

/// A non-fatal issue recorded during the run (e.g. a source degraded to its
/// default instead of aborting).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub step: String,
    pub message: String,
}

impl Warning {
    pub fn new(step: &str, message: impl Into<String>) -> Self {
        Warning {
            step: step.to_string(),
            message: message.into(),
        }
    }
}

/// The single mutable aggregate threaded through one evaluation run.
/// Created per request, exclusively owned by its run, discarded afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowState {
    pub candidate_name: String,
    pub resume_text: String,
    pub job_description_text: String,
    pub parsed_resume: Option<ParsedResume>,
    pub parsed_job: Option<ParsedJob>,
    pub code_host_research: Option<CodeHostResearch>,
    pub web_research: Option<WebResearch>,
    pub candidate_profile: Option<CandidateProfile>,
    pub comparison: Option<Comparison>,
    pub final_decision: Option<FinalDecision>,
    pub warnings: Vec<Warning>,
}

impl WorkflowState {
    pub fn new(
        candidate_name: String,
        resume_text: String,
        job_description_text: String,
        warnings: Vec<Warning>,
    ) -> Self {
        WorkflowState {
            candidate_name,
            resume_text,
            job_description_text,
            parsed_resume: None,
            parsed_job: None,
            code_host_research: None,
            web_research: None,
            candidate_profile: None,
            comparison: None,
            final_decision: None,
            warnings,
        }
    }

    pub fn warn(&mut self, step: &str, message: impl Into<String>) {
        self.warnings.push(Warning::new(step, message));
    }
}
