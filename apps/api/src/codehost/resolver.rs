//! Identity resolver — finds a code-hosting username in free text or a URL.
//!
//! Resume-extracted identities are unverified; resolution returning `None` is
//! an expected outcome (and is exactly what the router consults), never an
//! error.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::workflow::state::ParsedResume;

/// A resolved code-host identity, normalized to a canonical profile URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeHostIdentity {
    pub username: String,
    pub url: String,
}

impl CodeHostIdentity {
    fn from_username(username: &str) -> Self {
        CodeHostIdentity {
            username: username.to_string(),
            url: format!("https://github.com/{username}"),
        }
    }
}

/// Path segments that match the URL patterns but are never usernames.
const RESERVED_SEGMENTS: &[&str] = &[
    "www", "http", "https", "com", "search", "orgs", "topics", "features", "about", "login",
];

fn patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            // github.com/username, with or without scheme
            Regex::new(r"(?i)github\.com/([A-Za-z0-9][A-Za-z0-9-]*)").unwrap(),
            // username.github.io pages domain
            Regex::new(r"(?i)\b([A-Za-z0-9][A-Za-z0-9-]*)\.github\.io").unwrap(),
            // "github: username" style labels
            Regex::new(r"(?i)\bgithub\s*:\s*([A-Za-z0-9][A-Za-z0-9-]*)").unwrap(),
        ]
    })
}

/// Scans text for a recognizable code-host reference and returns the
/// normalized identity of the first plausible match.
pub fn resolve(text: &str) -> Option<CodeHostIdentity> {
    for pattern in patterns() {
        for captures in pattern.captures_iter(text) {
            let username = &captures[1];
            if RESERVED_SEGMENTS.contains(&username.to_lowercase().as_str()) {
                continue;
            }
            return Some(CodeHostIdentity::from_username(username));
        }
    }
    None
}

/// Resolves an identity from a parsed resume: the structured
/// `online_profiles.code_host_url` field first, then the raw resume text.
/// A bare username in the structured field is accepted as-is.
pub fn resolve_from_resume(resume: &ParsedResume, raw_text: &str) -> Option<CodeHostIdentity> {
    if let Some(field) = resume.online_profiles.code_host_url.as_deref() {
        let field = field.trim();
        if !field.is_empty() {
            if let Some(identity) = resolve(field) {
                return Some(identity);
            }
            if is_bare_username(field) {
                return Some(CodeHostIdentity::from_username(field));
            }
        }
    }
    resolve(raw_text)
}

fn is_bare_username(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !RESERVED_SEGMENTS.contains(&s.to_lowercase().as_str())
}
