//! Pattern validation for user-authored rules.
//!
//! A pattern is accepted only if it compiles within the size limit and has
//! no nested repetition of the `(a+)+` family. The regex engine itself runs
//! in linear time, but rules are shared with hosts whose engines backtrack,
//! so such shapes are rejected at authoring time.

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use thiserror::Error;

/// Compiled size limit for user patterns (1 MiB).
pub const PATTERN_SIZE_LIMIT: usize = 1024 * 1024;

/// Why a pattern was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternIssue {
    #[error("pattern is empty")]
    Empty,

    #[error("syntax error: {message}")]
    Syntax { message: String },

    #[error("compiled pattern exceeds the {limit} byte size limit")]
    TooLarge { limit: usize },

    #[error("nested quantifier '{fragment}' can cause catastrophic backtracking")]
    CatastrophicBacktracking { fragment: String },
}

impl PatternIssue {
    /// Short machine-readable kind, safe for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PatternIssue::Empty => "empty",
            PatternIssue::Syntax { .. } => "syntax",
            PatternIssue::TooLarge { .. } => "too_large",
            PatternIssue::CatastrophicBacktracking { .. } => "catastrophic_backtracking",
        }
    }
}

/// Check a pattern without keeping the compiled regex.
pub fn validate_pattern(pattern: &str) -> Result<(), PatternIssue> {
    compile_pattern(pattern, true).map(|_| ())
}

/// Compile a user pattern, applying every validation rule.
pub fn compile_pattern(pattern: &str, case_sensitive: bool) -> Result<Regex, PatternIssue> {
    if pattern.is_empty() {
        return Err(PatternIssue::Empty);
    }

    let regex = RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
        .map_err(|err| match err {
            regex::Error::CompiledTooBig(limit) => PatternIssue::TooLarge { limit },
            regex::Error::Syntax(message) => PatternIssue::Syntax { message },
            other => PatternIssue::Syntax {
                message: other.to_string(),
            },
        })?;

    if let Some(fragment) = find_nested_quantifier(pattern) {
        return Err(PatternIssue::CatastrophicBacktracking { fragment });
    }

    Ok(regex)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repeat {
    AtMostOne,
    Bounded,
    Unbounded,
}

impl Repeat {
    fn repeats(self) -> bool {
        self != Repeat::AtMostOne
    }
}

struct Group {
    open: usize,
    quantified: bool,
}

/// Find the first group that contains a repeating quantifier and is itself
/// repeated without an upper bound. Returns the offending fragment.
pub fn find_nested_quantifier(pattern: &str) -> Option<String> {
    let bytes = pattern.as_bytes();
    let mut stack: Vec<Group> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i = (i + 2).min(bytes.len()),
            b'[' => i = skip_class(bytes, i),
            b'(' => {
                stack.push(Group {
                    open: i,
                    quantified: false,
                });
                i += 1;
                continue;
            }
            b')' => {
                let group = stack.pop();
                i += 1;
                let inner = group.as_ref().map(|g| g.quantified).unwrap_or(false);
                let quantifier = quantifier_at(bytes, i);
                if let (Some(group), Some((len, Repeat::Unbounded))) = (&group, quantifier) {
                    if inner {
                        return Some(pattern[group.open..i + len].to_string());
                    }
                }
                let outer = quantifier.map(|(_, r)| r.repeats()).unwrap_or(false);
                if inner || outer {
                    if let Some(parent) = stack.last_mut() {
                        parent.quantified = true;
                    }
                }
                i += quantifier.map(|(len, _)| len).unwrap_or(0);
                continue;
            }
            _ => i += 1,
        }

        if let Some((len, repeat)) = quantifier_at(bytes, i) {
            if repeat.repeats() {
                if let Some(group) = stack.last_mut() {
                    group.quantified = true;
                }
            }
            i += len;
        }
    }

    None
}

/// Index just past the character class opening at `start`.
fn skip_class(bytes: &[u8], start: usize) -> usize {
    let mut j = start + 1;
    if bytes.get(j) == Some(&b'^') {
        j += 1;
    }
    // A leading ']' is literal.
    if bytes.get(j) == Some(&b']') {
        j += 1;
    }
    let mut depth = 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'[' => {
                depth += 1;
                j += 1;
            }
            b']' => {
                depth -= 1;
                j += 1;
                if depth == 0 {
                    return j;
                }
            }
            _ => j += 1,
        }
    }
    bytes.len()
}

/// Quantifier starting at `i`: its byte length (including a lazy or
/// possessive marker) and how often it repeats.
fn quantifier_at(bytes: &[u8], i: usize) -> Option<(usize, Repeat)> {
    let (mut len, repeat) = match bytes.get(i)? {
        b'*' | b'+' => (1, Repeat::Unbounded),
        b'?' => (1, Repeat::AtMostOne),
        b'{' => counted_repetition(bytes, i)?,
        _ => return None,
    };
    if matches!(bytes.get(i + len), Some(b'?') | Some(b'+')) {
        len += 1;
    }
    Some((len, repeat))
}

/// Parse `{n}`, `{n,}` or `{n,m}` at `i`.
fn counted_repetition(bytes: &[u8], i: usize) -> Option<(usize, Repeat)> {
    let close = i + bytes[i..].iter().position(|&b| b == b'}')?;
    let body = std::str::from_utf8(&bytes[i + 1..close]).ok()?;
    let len = close - i + 1;

    let repeat = match body.split_once(',') {
        None => {
            let n: u32 = body.trim().parse().ok()?;
            if n > 1 {
                Repeat::Bounded
            } else {
                Repeat::AtMostOne
            }
        }
        Some((min, max)) => {
            let min = min.trim();
            if !min.is_empty() {
                min.parse::<u32>().ok()?;
            }
            let max = max.trim();
            if max.is_empty() {
                Repeat::Unbounded
            } else if max.parse::<u32>().ok()? > 1 {
                Repeat::Bounded
            } else {
                Repeat::AtMostOne
            }
        }
    };
    Some((len, repeat))
}
