// All prompt constants for the evaluation workflow, one SYSTEM/TEMPLATE pair
// per model-backed step. Templates use {placeholder} substitution; every
// template shows the exact JSON schema the extraction layer will validate
// against.

pub const RESUME_PARSE_SYSTEM: &str = concat!(
    "You are an expert technical recruiter parsing resumes into structured data. \
     Extract only what the resume states; never infer facts that are not present.",
    " You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies."
);

/// Resume parsing template. Replace `{candidate_name}` and `{resume_text}`.
pub const RESUME_PARSE_TEMPLATE: &str = r#"Parse the resume of {candidate_name} below into structured information.

Return a JSON object with this EXACT schema (omit nothing, invent nothing):
{
  "education": [
    {"institution": "MIT", "degree": "BSc Computer Science", "year": "2018"}
  ],
  "work_experience": [
    {"company": "Acme", "title": "Backend Engineer", "duration": "2019-2023", "summary": "one sentence"}
  ],
  "skills": ["Rust", "PostgreSQL"],
  "certifications": [],
  "publications": [],
  "projects": ["short project descriptions"],
  "online_profiles": {
    "code_host_url": "https://github.com/username or null",
    "professional_network_url": "https://linkedin.com/in/... or null",
    "personal_site_url": "https://... or null",
    "other_urls": []
  }
}

Rules:
- Use empty arrays for sections the resume does not contain.
- "online_profiles" URLs must be copied verbatim from the resume; use null when absent.
- Keep every string short and factual.

RESUME:
{resume_text}"#;

pub const JOB_PARSE_SYSTEM: &str = concat!(
    "You are an expert job description analyst. \
     Extract the stated requirements of a role into structured data.",
    " You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies."
);

/// Job parsing template. Replace `{job_description}`.
pub const JOB_PARSE_TEMPLATE: &str = r#"Parse the following job description.

Return a JSON object with this EXACT schema:
{
  "core_skills": ["skills the posting marks required"],
  "preferred_skills": ["nice-to-have skills"],
  "experience_level": "junior | mid | senior | staff | principal | unknown",
  "education_requirements": ["stated degree or equivalent requirements"],
  "industry_domain": "one short phrase, e.g. fintech infrastructure"
}

CORE SKILLS: phrases like "required", "must have", "you will need", minimum years.
PREFERRED SKILLS: phrases like "preferred", "bonus", "nice to have", "a plus".

JOB DESCRIPTION:
{job_description}"#;

pub const CODE_HOST_ANALYSIS_SYSTEM: &str = concat!(
    "You are a technical due-diligence analyst reviewing a candidate's public \
     source-code-hosting activity as skill evidence.",
    " You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies."
);

/// Code-host analysis template. Replace `{candidate_name}`, `{username}`,
/// `{profile_url}` and `{repository_data}` (JSON array of repositories).
pub const CODE_HOST_ANALYSIS_TEMPLATE: &str = r#"Analyze the public repositories of {candidate_name} (profile {profile_url}, username {username}).

Return a JSON object with this EXACT schema:
{
  "profile": {"username": "{username}", "url": "{profile_url}"},
  "key_repositories": [
    {"name": "repo", "description": "what it is", "language": "Rust or null", "relevance": "why it matters as skill evidence"}
  ],
  "primary_languages": ["most-used languages, strongest first"],
  "skill_inferences": ["skills the repositories evidence"],
  "activity_summary": "two or three sentences on breadth, recency and depth"
}

Rules:
- key_repositories: at most 5, chosen for originality and signal, not stars alone.
- skill_inferences must be supported by a listed repository.

REPOSITORY DATA:
{repository_data}"#;

pub const WEB_RESEARCH_SYSTEM: &str = concat!(
    "You are a researcher assembling a candidate's public professional footprint \
     from raw web search results. Discard results about other people with the \
     same name when the context makes that clear.",
    " You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies."
);

/// Web research template. Replace `{candidate_name}`, `{code_host_context}`
/// and `{search_results}` (JSON array).
pub const WEB_RESEARCH_TEMPLATE: &str = r#"Organize these web search results about {candidate_name}.

Known code-host identity: {code_host_context}

Return a JSON object with this EXACT schema:
{
  "profile_mentions": [
    {"title": "page title", "url": "https://...", "summary": "one sentence"}
  ],
  "blog_posts": [],
  "conference_talks": [],
  "news_mentions": [],
  "social_links": {"github": "https://github.com/...", "twitter": "https://..."}
}

Rules:
- Every entry must come from a provided search result; never invent URLs.
- social_links keys are lowercase site names.
- Sparse output is fine; empty arrays are better than speculation.

SEARCH RESULTS:
{search_results}"#;

pub const COMPARISON_SYSTEM: &str = concat!(
    "You are an exacting hiring-panel analyst comparing one candidate against \
     one job's requirements, dimension by dimension.",
    " You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies."
);

/// Comparison template. Replace `{candidate_profile}` and
/// `{job_requirements}` (both JSON).
pub const COMPARISON_TEMPLATE: &str = r#"Compare the candidate profile against the job requirements.

Return a JSON object with this EXACT schema:
{
  "skill_matches": [
    {"skill": "Rust", "match_level": "High", "details": "evidence in one sentence"}
  ],
  "experience_matches": [
    {"area": "distributed systems", "match_level": "Medium", "details": "..."}
  ],
  "education_matches": [
    {"requirement": "BSc or equivalent", "match_level": "High", "details": "..."}
  ],
  "overall_skill_match": "Strong",
  "overall_experience_match": "Moderate",
  "overall_education_match": "Strong"
}

HARD CONSTRAINTS:
- match_level is EXACTLY one of: "High", "Medium", "Low", "None".
- overall_*_match is EXACTLY one of: "Strong", "Moderate", "Weak".
- Emit one skill_matches entry for every core skill of the job.

CANDIDATE PROFILE:
{candidate_profile}

JOB REQUIREMENTS:
{job_requirements}"#;

pub const FINAL_DECISION_SYSTEM: &str = concat!(
    "You are the final reviewer producing a hiring recommendation from a \
     completed comparison. Be decisive and ground every claim in the input.",
    " You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies."
);

/// Final decision template. Replace `{candidate_profile}`,
/// `{job_requirements}` and `{comparison}` (all JSON).
pub const FINAL_DECISION_TEMPLATE: &str = r#"Produce the final fit decision for this candidate.

Return a JSON object with this EXACT schema:
{
  "fit_score": "Strong Fit",
  "reasoning": "a short paragraph grounded in the comparison",
  "recommendations": ["next steps for the hiring team"]
}

HARD CONSTRAINT: fit_score is EXACTLY one of "Strong Fit", "Moderate Fit", "Not a Fit".

CANDIDATE PROFILE:
{candidate_profile}

JOB REQUIREMENTS:
{job_requirements}

COMPARISON:
{comparison}"#;
