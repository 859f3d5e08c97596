//! Advisory overlap detection between custom rules.
//!
//! This is a heuristic. It compares what can be read off the pattern text
//! (literal prefixes, the leading atom) and the rules' own examples; it does
//! not intersect the languages the patterns accept.

use regex::Regex;
use serde::Serialize;

use crate::rule::CustomRule;
use crate::validate::compile_pattern;

/// Why two rules are reported together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    IdenticalPattern,
    ExampleOverlap,
    SharedPrefix,
    SameLeadingClass,
}

/// Two rules that can plausibly match the same text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConflict {
    /// Name of the first rule.
    pub rule1: String,
    /// Name of the second rule.
    pub rule2: String,
    pub rule1_id: String,
    pub rule2_id: String,
    pub kind: ConflictKind,
    pub reason: String,
}

/// Report every pair of enabled rules that may overlap. At most one
/// conflict is reported per pair, the strongest evidence first.
pub fn detect_conflicts(rules: &[CustomRule]) -> Vec<RuleConflict> {
    let enabled: Vec<(&CustomRule, Option<Regex>)> = rules
        .iter()
        .filter(|r| r.enabled)
        .map(|r| (r, compile_pattern(&r.pattern, r.case_sensitive).ok()))
        .collect();

    let mut conflicts = Vec::new();
    for (i, (a, regex_a)) in enabled.iter().enumerate() {
        for (b, regex_b) in &enabled[i + 1..] {
            if let Some((kind, reason)) = compare(a, regex_a.as_ref(), b, regex_b.as_ref()) {
                conflicts.push(RuleConflict {
                    rule1: a.name.clone(),
                    rule2: b.name.clone(),
                    rule1_id: a.id.clone(),
                    rule2_id: b.id.clone(),
                    kind,
                    reason,
                });
            }
        }
    }
    conflicts
}

fn compare(
    a: &CustomRule,
    regex_a: Option<&Regex>,
    b: &CustomRule,
    regex_b: Option<&Regex>,
) -> Option<(ConflictKind, String)> {
    if a.pattern == b.pattern {
        return Some((
            ConflictKind::IdenticalPattern,
            "both rules use the same pattern".to_string(),
        ));
    }

    if let Some(example) = cross_match(&a.examples, regex_b) {
        return Some((
            ConflictKind::ExampleOverlap,
            format!("example '{}' of '{}' is also matched by '{}'", example, a.name, b.name),
        ));
    }
    if let Some(example) = cross_match(&b.examples, regex_a) {
        return Some((
            ConflictKind::ExampleOverlap,
            format!("example '{}' of '{}' is also matched by '{}'", example, b.name, a.name),
        ));
    }

    let fold = !a.case_sensitive || !b.case_sensitive;
    for branch_a in top_level_branches(&a.pattern) {
        let head_a = leading_pattern(branch_a);
        for branch_b in top_level_branches(&b.pattern) {
            let head_b = leading_pattern(branch_b);
            if let Some(found) = compare_heads(&head_a, &head_b, fold) {
                return Some(found);
            }
        }
    }

    None
}

fn compare_heads(
    head_a: &Leading,
    head_b: &Leading,
    fold: bool,
) -> Option<(ConflictKind, String)> {
    match (head_a, head_b) {
        (Leading::Literal(pa), Leading::Literal(pb)) => {
            let (pa, pb) = if fold {
                (pa.to_lowercase(), pb.to_lowercase())
            } else {
                (pa.clone(), pb.clone())
            };
            if pa.starts_with(&pb) || pb.starts_with(&pa) {
                let shared = if pa.len() < pb.len() { &pa } else { &pb };
                return Some((
                    ConflictKind::SharedPrefix,
                    format!("both patterns start with the literal '{}'", shared),
                ));
            }
        }
        (Leading::Atom(x), Leading::Atom(y)) if x == y => {
            return Some((
                ConflictKind::SameLeadingClass,
                format!("both patterns start with {} and no literal prefix", x),
            ));
        }
        _ => {}
    }
    None
}

/// Split `pattern` on `|` outside groups, classes and escapes.
fn top_level_branches(pattern: &str) -> Vec<&str> {
    let bytes = pattern.as_bytes();
    let mut branches = Vec::new();
    let mut depth = 0usize;
    let mut in_class = false;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'[' if !in_class => in_class = true,
            b']' if in_class => in_class = false,
            b'(' if !in_class => depth += 1,
            b')' if !in_class => depth = depth.saturating_sub(1),
            b'|' if !in_class && depth == 0 => {
                branches.push(&pattern[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    branches.push(&pattern[start..]);
    branches
}

fn cross_match<'a>(examples: &'a [String], regex: Option<&Regex>) -> Option<&'a str> {
    let regex = regex?;
    examples
        .iter()
        .map(String::as_str)
        .find(|e| !e.is_empty() && regex.is_match(e))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Leading {
    /// Literal text every match starts with.
    Literal(String),
    /// Source text of the first atom (a class, escape or group).
    Atom(String),
    Unknown,
}

/// Describe how matches of `pattern` begin, ignoring leading anchors.
fn leading_pattern(pattern: &str) -> Leading {
    let mut rest = pattern;
    loop {
        if let Some(r) = rest.strip_prefix('^') {
            rest = r;
        } else if let Some(r) = rest.strip_prefix(r"\b") {
            rest = r;
        } else {
            break;
        }
    }

    let literal = literal_prefix(rest);
    if !literal.is_empty() {
        return Leading::Literal(literal);
    }
    match first_atom(rest) {
        Some(atom) => Leading::Atom(atom.to_string()),
        None => Leading::Unknown,
    }
}

/// Literal characters at the start of `pattern`. A character followed by a
/// quantifier that allows zero or many repetitions is not included.
fn literal_prefix(pattern: &str) -> String {
    let mut out = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        let lit = match c {
            '\\' => match chars.peek().copied() {
                Some(e) if e.is_ascii_punctuation() => {
                    chars.next();
                    e
                }
                _ => break,
            },
            '.' | '[' | '(' | ')' | '|' | '*' | '+' | '?' | '{' | '}' | '^' | '$' => break,
            other => other,
        };
        if matches!(chars.peek(), Some('*') | Some('?') | Some('{') | Some('+')) {
            // "a+" still guarantees one 'a'.
            if chars.peek() == Some(&'+') {
                out.push(lit);
            }
            break;
        }
        out.push(lit);
    }
    out
}

/// Source text of the first atom: `\d`-style escape, a bracket class, a
/// group or `.`.
fn first_atom(pattern: &str) -> Option<&str> {
    let bytes = pattern.as_bytes();
    match bytes.first()? {
        b'\\' => pattern.get(..2),
        b'.' => Some("."),
        b'[' => {
            let mut j = 1;
            if bytes.get(j) == Some(&b'^') {
                j += 1;
            }
            if bytes.get(j) == Some(&b']') {
                j += 1;
            }
            while j < bytes.len() {
                match bytes[j] {
                    b'\\' => j += 2,
                    b']' => return pattern.get(..=j),
                    _ => j += 1,
                }
            }
            None
        }
        b'(' => {
            let mut depth = 0;
            let mut j = 0;
            while j < bytes.len() {
                match bytes[j] {
                    b'\\' => j += 1,
                    b'(' => depth += 1,
                    b')' => {
                        depth -= 1;
                        if depth == 0 {
                            return pattern.get(..=j);
                        }
                    }
                    _ => {}
                }
                j += 1;
            }
            None
        }
        _ => None,
    }
}
