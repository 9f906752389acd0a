//! Orchestration engine.
//!
//! The step graph is fixed: resume parse, job parse, router, the two research
//! branches in parallel, profile build, comparison, final decision. The router
//! is evaluated exactly once, after resume parsing, and its decision holds for
//! the rest of the run. Parsing failures abort; everything downstream degrades
//! to a schema-valid default plus a recorded warning.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{timeout, Instant};
use tracing::{error, info, warn};

use crate::codehost::fetcher::RepositorySource;
use crate::codehost::resolver::{self, CodeHostIdentity};
use crate::llm_client::TextCompleter;
use crate::websearch::WebSearcher;
use crate::workflow::extract::DEFAULT_MAX_RETRIES;
use crate::workflow::nodes::{self, StepContext};
use crate::workflow::state::{
    Comparison, FinalDecision, ParsedJob, ParsedResume, Warning, WebResearch, WorkflowState,
};
use crate::workflow::WorkflowError;

const DEFAULT_RUN_DEADLINE: Duration = Duration::from_secs(300);
const DEADLINE_MSG: &str = "abandoned after the run deadline expired";

/// Budgets applied to every run.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub extract_retries: u32,
    pub run_deadline: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            extract_retries: DEFAULT_MAX_RETRIES,
            run_deadline: DEFAULT_RUN_DEADLINE,
        }
    }
}

/// Inputs captured at the request boundary, including any warnings already
/// recorded there (a job description file that would not load, for example).
#[derive(Debug, Clone)]
pub struct EvaluationInput {
    pub candidate_name: String,
    pub resume_text: String,
    pub job_description_text: String,
    pub warnings: Vec<Warning>,
}

/// A fatal abort: the terminal error plus whatever state had accumulated.
#[derive(Debug)]
pub struct RunFailure {
    pub state: WorkflowState,
    pub error: WorkflowError,
}

/// Decides, from parsed-resume evidence only, whether the code-host branch
/// runs. Asking before the resume is parsed is a programming error.
pub struct Router;

impl Router {
    pub fn should_run_code_host_research(state: &WorkflowState) -> Result<bool, WorkflowError> {
        Ok(Self::code_host_identity(state)?.is_some())
    }

    pub fn code_host_identity(
        state: &WorkflowState,
    ) -> Result<Option<CodeHostIdentity>, WorkflowError> {
        let resume = state
            .parsed_resume
            .as_ref()
            .ok_or(WorkflowError::RouterInvariant)?;
        Ok(resolver::resolve_from_resume(resume, &state.resume_text))
    }
}

enum StepRun<T> {
    Done(Result<T, WorkflowError>),
    Expired,
}

async fn run_step<T>(
    deadline: Instant,
    fut: impl Future<Output = Result<T, WorkflowError>>,
) -> StepRun<T> {
    let remaining = deadline.duration_since(Instant::now());
    match timeout(remaining, fut).await {
        Ok(result) => StepRun::Done(result),
        Err(_) => StepRun::Expired,
    }
}

pub struct Engine {
    llm: Arc<dyn TextCompleter>,
    repos: Arc<dyn RepositorySource>,
    search: Arc<dyn WebSearcher>,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(
        llm: Arc<dyn TextCompleter>,
        repos: Arc<dyn RepositorySource>,
        search: Arc<dyn WebSearcher>,
        settings: EngineSettings,
    ) -> Self {
        Engine {
            llm,
            repos,
            search,
            settings,
        }
    }

    fn step_context(&self) -> StepContext<'_> {
        StepContext {
            llm: self.llm.as_ref(),
            repos: self.repos.as_ref(),
            search: self.search.as_ref(),
            extract_retries: self.settings.extract_retries,
        }
    }

    /// Runs one evaluation end to end. `Err` carries the partial state so the
    /// caller can still report what was gathered before the abort.
    pub async fn run(&self, input: EvaluationInput) -> Result<WorkflowState, RunFailure> {
        let deadline = Instant::now() + self.settings.run_deadline;
        let mut state = WorkflowState::new(
            input.candidate_name,
            input.resume_text,
            input.job_description_text,
            input.warnings,
        );
        let ctx = self.step_context();

        info!(candidate = %state.candidate_name, "starting evaluation run");

        // Resume Parse. A model or validation failure here is fatal; only
        // deadline expiry degrades to a default.
        match run_step(
            deadline,
            nodes::parse_resume(&ctx, &state.candidate_name, &state.resume_text),
        )
        .await
        {
            StepRun::Done(Ok(parsed)) => state.parsed_resume = Some(parsed),
            StepRun::Done(Err(error)) => {
                error!(%error, "resume parsing failed, aborting run");
                return Err(RunFailure { state, error });
            }
            StepRun::Expired => {
                state.warn(nodes::STEP_RESUME_PARSE, DEADLINE_MSG);
                state.parsed_resume = Some(ParsedResume::default());
            }
        }

        // Job Parse. An empty job description skips the model entirely.
        if state.job_description_text.trim().is_empty() {
            state.warn(
                nodes::STEP_JOB_PARSE,
                "no job description provided, requirements left empty",
            );
            state.parsed_job = Some(ParsedJob::default());
        } else {
            match run_step(
                deadline,
                nodes::parse_job(&ctx, &state.job_description_text),
            )
            .await
            {
                StepRun::Done(Ok(parsed)) => state.parsed_job = Some(parsed),
                StepRun::Done(Err(error)) => {
                    error!(%error, "job parsing failed, aborting run");
                    return Err(RunFailure { state, error });
                }
                StepRun::Expired => {
                    state.warn(nodes::STEP_JOB_PARSE, DEADLINE_MSG);
                    state.parsed_job = Some(ParsedJob::default());
                }
            }
        }

        // Router. Evaluated once; the decision is fixed for the run.
        let run_code_host = match Router::should_run_code_host_research(&state) {
            Ok(decision) => decision,
            Err(error) => return Err(RunFailure { state, error }),
        };
        let identity = if run_code_host {
            match Router::code_host_identity(&state) {
                Ok(identity) => identity,
                Err(error) => return Err(RunFailure { state, error }),
            }
        } else {
            None
        };
        info!(run_code_host, "router decision fixed");

        // Research branches run concurrently; each keeps its own warning list
        // so the merged order stays deterministic (code host first).
        let mut code_host_warnings: Vec<Warning> = Vec::new();
        let mut web_warnings: Vec<Warning> = Vec::new();
        let (code_host_run, web_run) = tokio::join!(
            async {
                match identity.as_ref() {
                    Some(identity) => Some(
                        run_step(
                            deadline,
                            nodes::code_host_research(
                                &ctx,
                                &state.candidate_name,
                                identity,
                                &mut code_host_warnings,
                            ),
                        )
                        .await,
                    ),
                    None => None,
                }
            },
            run_step(
                deadline,
                nodes::web_research(
                    &ctx,
                    &state.candidate_name,
                    identity.as_ref(),
                    &mut web_warnings,
                ),
            ),
        );

        state.warnings.append(&mut code_host_warnings);
        if let Some(run) = code_host_run {
            match run {
                StepRun::Done(Ok(research)) => state.code_host_research = Some(research),
                StepRun::Done(Err(error)) => {
                    // Explicit absence: the field stays unset and serializes
                    // as null downstream.
                    warn!(%error, "code-host research failed, continuing without it");
                    state.warn(
                        nodes::STEP_CODE_HOST_RESEARCH,
                        format!("research unavailable: {error}"),
                    );
                }
                StepRun::Expired => {
                    state.warn(nodes::STEP_CODE_HOST_RESEARCH, DEADLINE_MSG);
                }
            }
        }

        state.warnings.append(&mut web_warnings);
        match web_run {
            StepRun::Done(Ok(research)) => state.web_research = Some(research),
            StepRun::Done(Err(error)) => {
                warn!(%error, "web research failed, continuing with an empty record");
                state.warn(
                    nodes::STEP_WEB_RESEARCH,
                    format!("research defaulted: {error}"),
                );
                state.web_research = Some(WebResearch::default());
            }
            StepRun::Expired => {
                state.warn(nodes::STEP_WEB_RESEARCH, DEADLINE_MSG);
                state.web_research = Some(WebResearch::default());
            }
        }

        // Profile Build is a pure merge and cannot fail.
        info!(step = nodes::STEP_PROFILE_BUILD, "building candidate profile");
        let profile = nodes::build_candidate_profile(&state);
        state.candidate_profile = Some(profile.clone());
        let job = state.parsed_job.clone().unwrap_or_default();

        match run_step(deadline, nodes::compare(&ctx, &profile, &job)).await {
            StepRun::Done(Ok(comparison)) => state.comparison = Some(comparison),
            StepRun::Done(Err(error)) => {
                warn!(%error, "comparison failed, defaulting");
                state.warn(
                    nodes::STEP_COMPARISON,
                    format!("comparison defaulted: {error}"),
                );
                state.comparison = Some(Comparison::default());
            }
            StepRun::Expired => {
                state.warn(nodes::STEP_COMPARISON, DEADLINE_MSG);
                state.comparison = Some(Comparison::default());
            }
        }
        let comparison = state.comparison.clone().unwrap_or_default();

        match run_step(
            deadline,
            nodes::final_decision(&ctx, &profile, &job, &comparison),
        )
        .await
        {
            StepRun::Done(Ok(decision)) => state.final_decision = Some(decision),
            StepRun::Done(Err(error)) => {
                warn!(%error, "final decision failed, defaulting");
                state.warn(
                    nodes::STEP_FINAL_DECISION,
                    format!("decision defaulted: {error}"),
                );
                state.final_decision = Some(FinalDecision::default());
            }
            StepRun::Expired => {
                state.warn(nodes::STEP_FINAL_DECISION, DEADLINE_MSG);
                state.final_decision = Some(FinalDecision::default());
            }
        }

        info!(
            candidate = %state.candidate_name,
            fit_score = ?state.final_decision.as_ref().map(|d| d.fit_score),
            warnings = state.warnings.len(),
            "evaluation run complete"
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::codehost::fetcher::{FetchOutcome, Repository};
    use crate::llm_client::LlmError;
    use crate::websearch::{SearchError, SearchResult};
    use crate::workflow::prompts;
    use crate::workflow::state::FitScore;

    /// Routes canned responses on the system prompt, since the two research
    /// branches interleave their model calls nondeterministically.
    struct KeyedCompleter {
        resume: String,
        job: String,
        code_host: String,
        web: String,
        comparison: String,
        decision: String,
        calls: Mutex<Vec<&'static str>>,
    }

    impl Default for KeyedCompleter {
        fn default() -> Self {
            KeyedCompleter {
                resume: RESUME_NO_PROFILE.to_string(),
                job: JOB.to_string(),
                code_host: CODE_HOST.to_string(),
                web: WEB.to_string(),
                comparison: COMPARISON.to_string(),
                decision: DECISION.to_string(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl KeyedCompleter {
        fn called(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextCompleter for KeyedCompleter {
        async fn complete(&self, _prompt: &str, system: &str) -> Result<String, LlmError> {
            let (step, body) = if system == prompts::RESUME_PARSE_SYSTEM {
                ("resume", &self.resume)
            } else if system == prompts::JOB_PARSE_SYSTEM {
                ("job", &self.job)
            } else if system == prompts::CODE_HOST_ANALYSIS_SYSTEM {
                ("code_host", &self.code_host)
            } else if system == prompts::WEB_RESEARCH_SYSTEM {
                ("web", &self.web)
            } else if system == prompts::COMPARISON_SYSTEM {
                ("comparison", &self.comparison)
            } else {
                ("decision", &self.decision)
            };
            self.calls.lock().unwrap().push(step);
            Ok(body.clone())
        }
    }

    struct CountingRepoSource {
        outcome: FetchOutcome,
        calls: AtomicU32,
    }

    impl CountingRepoSource {
        fn with(outcome: FetchOutcome) -> Self {
            CountingRepoSource {
                outcome,
                calls: AtomicU32::new(0),
            }
        }

        fn never_called() -> Self {
            Self::with(FetchOutcome::default())
        }
    }

    #[async_trait]
    impl RepositorySource for CountingRepoSource {
        async fn fetch_repositories(&self, _username: &str) -> FetchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    struct StubSearcher {
        fail: bool,
    }

    #[async_trait]
    impl WebSearcher for StubSearcher {
        async fn search(&self, _query: &str) -> Result<Vec<SearchResult>, SearchError> {
            if self.fail {
                return Err(SearchError::Api {
                    status: 429,
                    message: "throttled".to_string(),
                });
            }
            Ok(vec![SearchResult {
                title: "Talk: scaling pipelines".to_string(),
                url: "https://conf.example/talk".to_string(),
                content: "Conference talk by the candidate".to_string(),
            }])
        }
    }

    const RESUME_NO_PROFILE: &str = r#"{
        "education": [], "work_experience": [],
        "skills": ["Rust"], "certifications": [], "publications": [],
        "projects": [], "online_profiles": {}
    }"#;

    const RESUME_WITH_PROFILE: &str = r#"{
        "education": [], "work_experience": [],
        "skills": ["Rust"], "certifications": [], "publications": [],
        "projects": [],
        "online_profiles": {"code_host_url": "https://github.com/janedoe"}
    }"#;

    const JOB: &str = r#"{
        "core_skills": ["Rust"], "preferred_skills": [],
        "experience_level": "Senior", "education_requirements": [],
        "industry_domain": "Infrastructure"
    }"#;

    const CODE_HOST: &str = r#"{
        "profile": {"username": "ignored", "url": "ignored"},
        "key_repositories": [{"name": "orchestrator", "description": "x", "relevance": "high"}],
        "primary_languages": ["Rust"],
        "skill_inferences": ["distributed systems"],
        "activity_summary": "Active maintainer."
    }"#;

    const WEB: &str = r#"{
        "profile_mentions": [], "blog_posts": [],
        "conference_talks": [{"title": "Talk", "url": "https://conf.example/talk", "summary": "s"}],
        "news_mentions": [], "social_links": {}
    }"#;

    const COMPARISON: &str = r#"{
        "skill_matches": [{"skill": "Rust", "match_level": "High", "details": "core language"}],
        "experience_matches": [{"area": "distributed systems", "match_level": "High"}],
        "education_matches": [{"requirement": "BSc or equivalent", "match_level": "Medium"}],
        "overall_skill_match": "Strong",
        "overall_experience_match": "Strong",
        "overall_education_match": "Moderate"
    }"#;

    const DECISION: &str = r#"{
        "fit_score": "Strong Fit",
        "reasoning": "Deep overlap with the core stack.",
        "recommendations": ["proceed to technical interview"]
    }"#;

    fn repo(name: &str) -> Repository {
        serde_json::from_value(serde_json::json!({ "name": name })).unwrap()
    }

    fn input(name: &str) -> EvaluationInput {
        EvaluationInput {
            candidate_name: name.to_string(),
            resume_text: "plain resume text".to_string(),
            job_description_text: "Senior Rust engineer".to_string(),
            warnings: Vec::new(),
        }
    }

    fn engine(
        llm: KeyedCompleter,
        repos: CountingRepoSource,
        search: StubSearcher,
    ) -> (Engine, Arc<KeyedCompleter>, Arc<CountingRepoSource>) {
        let llm = Arc::new(llm);
        let repos = Arc::new(repos);
        let engine = Engine::new(
            llm.clone(),
            repos.clone(),
            Arc::new(search),
            EngineSettings::default(),
        );
        (engine, llm, repos)
    }

    #[tokio::test]
    async fn test_run_with_code_host_reference_populates_research() {
        let llm = KeyedCompleter {
            resume: RESUME_WITH_PROFILE.to_string(),
            ..Default::default()
        };
        let repos = CountingRepoSource::with(FetchOutcome {
            repositories: vec![repo("orchestrator")],
            ok: true,
        });
        let (engine, _, repos) = engine(llm, repos, StubSearcher { fail: false });

        let state = engine.run(input("Jane Doe")).await.unwrap();

        assert_eq!(repos.calls.load(Ordering::SeqCst), 1);
        let research = state.code_host_research.unwrap();
        assert_eq!(research.profile.username, "janedoe");
        assert_eq!(research.profile.url, "https://github.com/janedoe");
        assert_eq!(
            state.final_decision.unwrap().fit_score,
            FitScore::StrongFit
        );
    }

    #[tokio::test]
    async fn test_run_without_code_host_reference_never_fetches() {
        let (engine, llm, repos) = engine(
            KeyedCompleter::default(),
            CountingRepoSource::never_called(),
            StubSearcher { fail: false },
        );

        let state = engine.run(input("Jane Doe")).await.unwrap();

        assert_eq!(repos.calls.load(Ordering::SeqCst), 0);
        assert!(state.code_host_research.is_none());
        assert!(state.web_research.is_some());
        assert!(state.final_decision.is_some());
        assert!(!llm.called().contains(&"code_host"));
    }

    #[tokio::test]
    async fn test_throttled_fetcher_degrades_to_absence_with_warning() {
        let llm = KeyedCompleter {
            resume: RESUME_WITH_PROFILE.to_string(),
            ..Default::default()
        };
        // Empty and not ok: the retry budget was exhausted with nothing fetched.
        let repos = CountingRepoSource::with(FetchOutcome {
            repositories: Vec::new(),
            ok: false,
        });
        let (engine, _, _) = engine(llm, repos, StubSearcher { fail: false });

        let state = engine.run(input("Jane Doe")).await.unwrap();

        assert!(state.code_host_research.is_none());
        assert!(state
            .warnings
            .iter()
            .any(|w| w.step == nodes::STEP_CODE_HOST_RESEARCH));
        assert!(state.final_decision.is_some());
    }

    #[tokio::test]
    async fn test_partial_fetch_proceeds_with_warning() {
        let llm = KeyedCompleter {
            resume: RESUME_WITH_PROFILE.to_string(),
            ..Default::default()
        };
        let repos = CountingRepoSource::with(FetchOutcome {
            repositories: vec![repo("orchestrator"), repo("parser")],
            ok: false,
        });
        let (engine, _, _) = engine(llm, repos, StubSearcher { fail: false });

        let state = engine.run(input("Jane Doe")).await.unwrap();

        assert!(state.code_host_research.is_some());
        assert!(state
            .warnings
            .iter()
            .any(|w| w.step == nodes::STEP_CODE_HOST_RESEARCH
                && w.message.contains("partial")));
    }

    #[tokio::test]
    async fn test_unparseable_resume_response_aborts_run() {
        let llm = KeyedCompleter {
            resume: "I could not parse this resume, sorry!".to_string(),
            ..Default::default()
        };
        let (engine, _, _) = engine(
            llm,
            CountingRepoSource::never_called(),
            StubSearcher { fail: false },
        );

        let failure = engine.run(input("Jane Doe")).await.unwrap_err();

        assert!(matches!(
            failure.error,
            WorkflowError::ResponseValidation { step, .. } if step == nodes::STEP_RESUME_PARSE
        ));
        assert!(failure.state.parsed_resume.is_none());
        assert!(failure.state.final_decision.is_none());
    }

    #[tokio::test]
    async fn test_invalid_comparison_defaults_and_run_completes() {
        let llm = KeyedCompleter {
            // "Outstanding" is not in the overall-match literal set.
            comparison: r#"{"overall_skill_match": "Outstanding"}"#.to_string(),
            ..Default::default()
        };
        let (engine, _, _) = engine(
            llm,
            CountingRepoSource::never_called(),
            StubSearcher { fail: false },
        );

        let state = engine.run(input("Jane Doe")).await.unwrap();

        let comparison = state.comparison.unwrap();
        assert_eq!(comparison, Comparison::default());
        assert!(state
            .warnings
            .iter()
            .any(|w| w.step == nodes::STEP_COMPARISON));
        assert_eq!(
            state.final_decision.unwrap().fit_score,
            FitScore::StrongFit
        );
    }

    #[tokio::test]
    async fn test_empty_job_description_skips_job_model_call() {
        let (engine, llm, _) = engine(
            KeyedCompleter::default(),
            CountingRepoSource::never_called(),
            StubSearcher { fail: false },
        );
        let mut input = input("Jane Doe");
        input.job_description_text = "   ".to_string();

        let state = engine.run(input).await.unwrap();

        assert!(!llm.called().contains(&"job"));
        assert_eq!(state.parsed_job.unwrap(), ParsedJob::default());
        assert!(state.warnings.iter().any(|w| w.step == nodes::STEP_JOB_PARSE));
    }

    #[tokio::test]
    async fn test_failed_searches_yield_empty_web_record_with_warnings() {
        let (engine, llm, _) = engine(
            KeyedCompleter::default(),
            CountingRepoSource::never_called(),
            StubSearcher { fail: true },
        );

        let state = engine.run(input("Jane Doe")).await.unwrap();

        // Every query failed, so the organizing model call is skipped.
        assert!(!llm.called().contains(&"web"));
        assert_eq!(state.web_research.unwrap(), WebResearch::default());
        assert!(state
            .warnings
            .iter()
            .filter(|w| w.step == nodes::STEP_WEB_RESEARCH)
            .count() >= 1);
    }

    #[tokio::test]
    async fn test_router_before_resume_parse_is_an_invariant_error() {
        let state = WorkflowState::new(
            "Jane Doe".to_string(),
            "resume".to_string(),
            "job".to_string(),
            Vec::new(),
        );
        assert!(matches!(
            Router::should_run_code_host_research(&state),
            Err(WorkflowError::RouterInvariant)
        ));
    }

    #[tokio::test]
    async fn test_boundary_warnings_survive_into_final_state() {
        let (engine, _, _) = engine(
            KeyedCompleter::default(),
            CountingRepoSource::never_called(),
            StubSearcher { fail: false },
        );
        let mut input = input("Jane Doe");
        input
            .warnings
            .push(Warning::new("document_load", "job description file unreadable"));

        let state = engine.run(input).await.unwrap();

        assert_eq!(state.warnings[0].step, "document_load");
    }
}
