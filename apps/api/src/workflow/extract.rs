//! Response extraction/validation — the single chokepoint turning untrusted
//! model text into schema-conformant typed records.
//!
//! Model output may wrap the JSON payload in prose or markdown fences. Each
//! attempt: strip fences, locate the first balanced top-level `{...}` or
//! `[...]` by bracket matching, then serde-parse. Later attempts apply
//! progressively looser recovery: trailing-comma removal, then quote
//! normalization. Budgets are bounded; exhaustion is an error the caller maps
//! to a schema-valid default.

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Default retry budget on top of the first strict attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no structured payload found in model output")]
    NoPayload,

    #[error("payload failed validation after {attempts} attempts: {last_error}")]
    Invalid { attempts: u32, last_error: String },
}

impl ExtractError {
    /// Number of parse attempts consumed before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            ExtractError::NoPayload => 1,
            ExtractError::Invalid { attempts, .. } => *attempts,
        }
    }
}

/// Extracts a `T` from raw model text. Returns the value and the number of
/// attempts used (1 = strict parse succeeded immediately).
pub fn extract_json<T: DeserializeOwned>(
    raw: &str,
    max_retries: u32,
) -> Result<(T, u32), ExtractError> {
    let stripped = strip_fences(raw);
    let block = balanced_block(stripped).ok_or(ExtractError::NoPayload)?;

    let mut last_error = String::new();
    for attempt in 0..=max_retries {
        let candidate: Cow<'_, str> = match attempt {
            0 => Cow::Borrowed(block),
            1 => Cow::Owned(strip_trailing_commas(block)),
            _ => Cow::Owned(normalize_quotes(&strip_trailing_commas(block))),
        };
        match serde_json::from_str::<T>(&candidate) {
            Ok(value) => return Ok((value, attempt + 1)),
            Err(e) => last_error = e.to_string(),
        }
    }

    Err(ExtractError::Invalid {
        attempts: max_retries + 1,
        last_error,
    })
}

/// Strips ```json ... ``` or ``` ... ``` fences when the payload is fenced.
fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    for prefix in ["```json", "```"] {
        if let Some(inner) = text.strip_prefix(prefix) {
            let inner = inner.trim_start();
            return inner
                .strip_suffix("```")
                .map(str::trim)
                .unwrap_or(inner);
        }
    }
    text
}

/// Returns the first balanced top-level JSON object or array in `text`.
/// Bracket-matching (not substring search) so nested braces and braces inside
/// string literals do not truncate the block.
fn balanced_block(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&b| b == b'{' || b == b'[')?;

    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => stack.push(b'}'),
            b'[' => stack.push(b']'),
            b'}' | b']' => {
                if stack.pop() != Some(b) {
                    return None; // mismatched nesting, no valid block
                }
                if stack.is_empty() {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Removes commas that directly precede a closing brace or bracket,
/// outside string literals.
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c == '"' {
            in_string = true;
            out.push(c);
            continue;
        }
        if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Replaces typographic quotes with their ASCII equivalents.
fn normalize_quotes(text: &str) -> String {
    text.replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}
