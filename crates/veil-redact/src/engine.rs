//! Custom-rule redaction engine.
//!
//! Rules run in descending priority. Each rule only searches the parts of
//! the original text that no earlier rule has claimed, so a lower-priority
//! rule can never rewrite what a higher-priority one produced. All
//! replacements are spliced in one pass at the end.

use std::collections::{HashMap, HashSet};

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::rule::CustomRule;
use crate::validate::{compile_pattern, PatternIssue};

/// One rewritten span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactionMatch {
    pub rule_id: String,
    pub rule_name: String,
    /// Matched text in the input.
    #[serde(rename = "match")]
    pub matched: String,
    pub replacement: String,
    pub start: usize,
    pub end: usize,
}

/// Output of [`RedactionEngine::apply_rules`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactionResult {
    #[serde(rename = "modifiedText")]
    pub text: String,
    /// Matches sorted by position in the input.
    pub matches: Vec<RedactionMatch>,
    /// Ids of rules that matched at least once, in execution order.
    pub rules_applied: Vec<String>,
    /// Enabled rules whose pattern could not be compiled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_rules: Vec<String>,
}

impl RedactionResult {
    pub fn count(&self) -> usize {
        self.matches.len()
    }
}

/// A rule that failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRejection {
    pub rule_id: String,
    pub rule_name: String,
    pub issue: PatternIssue,
}

/// Summary of a [`RedactionEngine::compile_rules`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileReport {
    pub compiled: usize,
    pub rejected: Vec<RuleRejection>,
}

/// Dry-run output of [`test_rule`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleTestResult {
    pub matches: Vec<String>,
    pub replacements: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    pattern: String,
    case_sensitive: bool,
    regex: Regex,
}

/// Applies custom rules, caching compiled patterns by rule id.
#[derive(Debug, Default)]
pub struct RedactionEngine {
    cache: HashMap<String, CompiledRule>,
}

impl RedactionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rules with a compiled pattern in the cache.
    pub fn cached_rules(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Pre-compile every enabled rule. Invalid patterns are skipped and
    /// reported; cache entries for rules no longer present are dropped.
    pub fn compile_rules(&mut self, rules: &[CustomRule]) -> CompileReport {
        let live: HashSet<&str> = rules
            .iter()
            .filter(|r| r.enabled)
            .map(|r| r.id.as_str())
            .collect();
        self.cache.retain(|id, _| live.contains(id.as_str()));

        let mut report = CompileReport::default();
        for rule in rules.iter().filter(|r| r.enabled) {
            match self.compiled(rule) {
                Ok(_) => report.compiled += 1,
                Err(issue) => report.rejected.push(RuleRejection {
                    rule_id: rule.id.clone(),
                    rule_name: rule.name.clone(),
                    issue,
                }),
            }
        }

        debug!(
            compiled = report.compiled,
            rejected = report.rejected.len(),
            "compiled redaction rules"
        );
        report
    }

    fn compiled(&mut self, rule: &CustomRule) -> Result<Regex, PatternIssue> {
        if let Some(entry) = self.cache.get(&rule.id) {
            if entry.pattern == rule.pattern && entry.case_sensitive == rule.case_sensitive {
                return Ok(entry.regex.clone());
            }
        }

        match compile_pattern(&rule.pattern, rule.case_sensitive) {
            Ok(regex) => {
                self.cache.insert(
                    rule.id.clone(),
                    CompiledRule {
                        pattern: rule.pattern.clone(),
                        case_sensitive: rule.case_sensitive,
                        regex: regex.clone(),
                    },
                );
                Ok(regex)
            }
            Err(issue) => {
                self.cache.remove(&rule.id);
                warn!(rule_id = %rule.id, issue = issue.kind(), "skipping invalid rule pattern");
                Err(issue)
            }
        }
    }

    /// Apply enabled rules to `text` in descending priority order.
    ///
    /// Equal priorities keep their input order. Matches never overlap in
    /// input coordinates. Rules with invalid patterns are skipped.
    pub fn apply_rules(&mut self, text: &str, rules: &[CustomRule]) -> RedactionResult {
        let mut ordered: Vec<&CustomRule> = rules.iter().filter(|r| r.enabled).collect();
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut result = RedactionResult::default();
        // Claimed spans, sorted and disjoint.
        let mut claimed: Vec<(usize, usize)> = Vec::new();

        for rule in ordered {
            let regex = match self.compiled(rule) {
                Ok(regex) => regex,
                Err(_) => {
                    result.skipped_rules.push(rule.id.clone());
                    continue;
                }
            };

            let hits = find_in_gaps(&regex, text, &claimed, &rule.replacement, rule.global);
            if hits.is_empty() {
                continue;
            }

            for (start, end, replacement) in hits {
                claimed.push((start, end));
                result.matches.push(RedactionMatch {
                    rule_id: rule.id.clone(),
                    rule_name: rule.name.clone(),
                    matched: text[start..end].to_string(),
                    replacement,
                    start,
                    end,
                });
            }
            claimed.sort_unstable();
            result.rules_applied.push(rule.id.clone());
        }

        result.matches.sort_by_key(|m| m.start);
        result.text = splice(text, &result.matches);
        result
    }

    /// Bump `matchCount` and `lastUsed` on the rules that fired in `result`.
    pub fn record_matches(rules: &mut [CustomRule], result: &RedactionResult) {
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for m in &result.matches {
            *counts.entry(m.rule_id.as_str()).or_insert(0) += 1;
        }
        if counts.is_empty() {
            return;
        }
        let now = chrono::Utc::now().timestamp_millis();
        for rule in rules.iter_mut() {
            if let Some(&n) = counts.get(rule.id.as_str()) {
                rule.match_count += n;
                rule.last_used = Some(now);
            }
        }
    }
}

/// Search every unclaimed gap of `text` for `regex`.
fn find_in_gaps(
    regex: &Regex,
    text: &str,
    claimed: &[(usize, usize)],
    template: &str,
    global: bool,
) -> Vec<(usize, usize, String)> {
    let mut gaps = Vec::with_capacity(claimed.len() + 1);
    let mut cursor = 0;
    for &(start, end) in claimed {
        if start > cursor {
            gaps.push((cursor, start));
        }
        cursor = cursor.max(end);
    }
    if cursor < text.len() {
        gaps.push((cursor, text.len()));
    }

    let mut hits = Vec::new();
    for (gap_start, gap_end) in gaps {
        // Truncating the haystack keeps matches inside the gap while the
        // text before `pos` still informs look-behind assertions like \b.
        let haystack = &text[..gap_end];
        let mut pos = gap_start;
        while pos < gap_end {
            let Some(caps) = regex.captures_at(haystack, pos) else {
                break;
            };
            let Some(whole) = caps.get(0) else {
                break;
            };
            if whole.is_empty() {
                pos = whole.end()
                    + haystack[whole.end()..]
                        .chars()
                        .next()
                        .map(char::len_utf8)
                        .unwrap_or(1);
                continue;
            }
            hits.push((whole.start(), whole.end(), expand_replacement(regex, template, &caps)));
            if !global {
                return hits;
            }
            pos = whole.end();
        }
    }
    hits
}

fn splice(text: &str, matches: &[RedactionMatch]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for m in matches {
        out.push_str(&text[cursor..m.start]);
        out.push_str(&m.replacement);
        cursor = m.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Expand a replacement template against a match.
///
/// `$1`..`$99` and `${name}` insert capture groups (empty when the group
/// did not participate), `$&` the whole match and `$$` a literal dollar.
/// References to groups that do not exist are kept literally.
pub fn expand_replacement(regex: &Regex, template: &str, caps: &Captures<'_>) -> String {
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len());
    let mut literal_start = 0;
    let mut i = 0;

    let group = |n: usize| caps.get(n).map(|m| m.as_str()).unwrap_or("");

    while i < bytes.len() {
        if bytes[i] != b'$' || i + 1 >= bytes.len() {
            i += 1;
            continue;
        }

        let (consumed, insert): (usize, Option<&str>) = match bytes[i + 1] {
            b'$' => (2, Some("$")),
            b'&' => (2, Some(group(0))),
            b'{' => match template[i + 2..].find('}') {
                Some(close) => {
                    let name = &template[i + 2..i + 2 + close];
                    let value = match name.parse::<usize>() {
                        Ok(n) if n < caps.len() => Some(group(n)),
                        Ok(_) => None,
                        Err(_) if regex.capture_names().any(|n| n == Some(name)) => {
                            Some(caps.name(name).map(|m| m.as_str()).unwrap_or(""))
                        }
                        Err(_) => None,
                    };
                    (close + 3, value)
                }
                None => (1, None),
            },
            d @ b'0'..=b'9' => {
                let one = (d - b'0') as usize;
                let two = bytes
                    .get(i + 2)
                    .filter(|b| b.is_ascii_digit())
                    .map(|b| one * 10 + (b - b'0') as usize);
                match two {
                    Some(n) if n >= 1 && n < caps.len() => (3, Some(group(n))),
                    _ if one >= 1 && one < caps.len() => (2, Some(group(one))),
                    _ => (1, None),
                }
            }
            _ => (1, None),
        };

        match insert {
            Some(value) => {
                out.push_str(&template[literal_start..i]);
                out.push_str(value);
                i += consumed;
                literal_start = i;
            }
            None => i += consumed.max(1),
        }
    }
    out.push_str(&template[literal_start..]);
    out
}

/// Dry-run a rule against sample text without touching any cache or record.
pub fn test_rule(rule: &CustomRule, sample: &str) -> RuleTestResult {
    let regex = match compile_pattern(&rule.pattern, rule.case_sensitive) {
        Ok(regex) => regex,
        Err(issue) => {
            return RuleTestResult {
                error: Some(issue.to_string()),
                ..Default::default()
            }
        }
    };

    let mut result = RuleTestResult::default();
    for (start, end, replacement) in find_in_gaps(&regex, sample, &[], &rule.replacement, rule.global)
    {
        result.matches.push(sample[start..end].to_string());
        result.replacements.push(replacement);
    }
    result
}
