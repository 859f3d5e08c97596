//! API key detection using format patterns and entropy analysis.
//!
//! Finds provider API keys in free text, deduplicates overlapping hits and
//! rewrites them in one of three redaction modes.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::validate::compile_pattern;

/// Known API key formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyFormat {
    /// OpenAI (sk-..., sk-proj-...)
    OpenAi,
    /// Anthropic (sk-ant-...)
    Anthropic,
    /// Google Cloud (AIza...)
    Google,
    /// AWS access key id (AKIA/ASIA...)
    Aws,
    /// GitHub tokens (ghp_, gho_, github_pat_...)
    GitHub,
    /// Stripe secret/publishable/restricted keys
    Stripe,
    /// Slack tokens (xoxb-...)
    Slack,
    /// High-entropy hex or base64 run
    Generic,
    /// Matched by a caller-supplied pattern
    Custom,
}

impl KeyFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyFormat::OpenAi => "openai",
            KeyFormat::Anthropic => "anthropic",
            KeyFormat::Google => "google",
            KeyFormat::Aws => "aws",
            KeyFormat::GitHub => "github",
            KeyFormat::Stripe => "stripe",
            KeyFormat::Slack => "slack",
            KeyFormat::Generic => "generic",
            KeyFormat::Custom => "custom",
        }
    }

    /// Rank used when two detections start at the same offset.
    pub fn specificity(&self) -> u8 {
        match self {
            KeyFormat::Anthropic => 100,
            KeyFormat::Google
            | KeyFormat::Aws
            | KeyFormat::GitHub
            | KeyFormat::Stripe
            | KeyFormat::Slack => 90,
            KeyFormat::OpenAi => 80,
            KeyFormat::Custom => 50,
            KeyFormat::Generic => 10,
        }
    }

    /// Tag used by [`RedactionMode::Placeholder`].
    pub fn placeholder(&self) -> String {
        format!("[{}_KEY]", self.as_str().to_uppercase())
    }
}

impl fmt::Display for KeyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How detected keys are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedactionMode {
    /// Replace with `[REDACTED_API_KEY]`.
    #[default]
    Full,
    /// Keep the first and last four characters.
    Partial,
    /// Replace with a tag naming the format.
    Placeholder,
}

impl FromStr for RedactionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(RedactionMode::Full),
            "partial" => Ok(RedactionMode::Partial),
            "placeholder" => Ok(RedactionMode::Placeholder),
            other => Err(format!(
                "unknown redaction mode '{}' (expected full, partial or placeholder)",
                other
            )),
        }
    }
}

/// Full-mode replacement text.
pub const REDACTED_API_KEY: &str = "[REDACTED_API_KEY]";

/// Mask character used by partial redaction.
pub const MASK_CHAR: char = '•';

/// Minimum Shannon entropy (bits per byte) for a generic match to count.
pub const GENERIC_ENTROPY_THRESHOLD: f64 = 3.0;

/// Stored keys shorter than this are ignored; they would match ordinary words.
pub const MIN_STORED_KEY_LEN: usize = 8;

// Every prefix is anchored at a word boundary so a key never starts
// mid-word ("risk-...", "TASKAKIA...").
const ANTHROPIC: &str = r"\bsk-ant-[A-Za-z0-9_-]{32,}";
// Project keys carry `_`/`-` in the body; legacy keys are alphanumeric only.
const OPENAI: &str = r"\bsk-(?:proj-[A-Za-z0-9_-]{32,}|[A-Za-z0-9]{32,})";
const GOOGLE: &str = r"\bAIza[A-Za-z0-9_-]{35}";
const AWS: &str = r"\b(?:AKIA|ASIA)[A-Z0-9]{16}\b";
const GITHUB: &str = r"\b(?:gh[pousr]_[A-Za-z0-9]{36,}|github_pat_[A-Za-z0-9_]{22,})";
const STRIPE: &str = r"\b(?:sk|pk|rk)_(?:live|test)_[A-Za-z0-9]{24,}";
const SLACK: &str = r"\bxox[baprs]-[A-Za-z0-9-]{10,}";
const GENERIC: &str = r"\b[A-Fa-f0-9]{32,}\b|\b[A-Za-z0-9+/]{40,}={0,2}";

/// Key format pattern definition.
struct KeyPattern {
    format: KeyFormat,
    /// Scans free text.
    pattern: Lazy<Regex>,
    /// Matches a whole bare key.
    anchored: Lazy<Regex>,
}

// Ordered most specific first; detect_format relies on this order.
static KEY_PATTERNS: [KeyPattern; 7] = [
    KeyPattern {
        format: KeyFormat::Anthropic,
        pattern: Lazy::new(|| Regex::new(ANTHROPIC).unwrap()),
        anchored: Lazy::new(|| Regex::new(&format!("^(?:{})$", ANTHROPIC)).unwrap()),
    },
    KeyPattern {
        format: KeyFormat::Google,
        pattern: Lazy::new(|| Regex::new(GOOGLE).unwrap()),
        anchored: Lazy::new(|| Regex::new(&format!("^(?:{})$", GOOGLE)).unwrap()),
    },
    KeyPattern {
        format: KeyFormat::Aws,
        pattern: Lazy::new(|| Regex::new(AWS).unwrap()),
        anchored: Lazy::new(|| Regex::new(&format!("^(?:{})$", AWS)).unwrap()),
    },
    KeyPattern {
        format: KeyFormat::GitHub,
        pattern: Lazy::new(|| Regex::new(GITHUB).unwrap()),
        anchored: Lazy::new(|| Regex::new(&format!("^(?:{})$", GITHUB)).unwrap()),
    },
    KeyPattern {
        format: KeyFormat::Stripe,
        pattern: Lazy::new(|| Regex::new(STRIPE).unwrap()),
        anchored: Lazy::new(|| Regex::new(&format!("^(?:{})$", STRIPE)).unwrap()),
    },
    KeyPattern {
        format: KeyFormat::Slack,
        pattern: Lazy::new(|| Regex::new(SLACK).unwrap()),
        anchored: Lazy::new(|| Regex::new(&format!("^(?:{})$", SLACK)).unwrap()),
    },
    KeyPattern {
        format: KeyFormat::OpenAi,
        pattern: Lazy::new(|| Regex::new(OPENAI).unwrap()),
        anchored: Lazy::new(|| Regex::new(&format!("^(?:{})$", OPENAI)).unwrap()),
    },
];

static GENERIC_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(GENERIC).unwrap());

/// Calculate Shannon entropy of a string.
///
/// Random key material sits well above English text; hex keys land near 4.
pub fn shannon_entropy(value: &str) -> f64 {
    if value.is_empty() {
        return 0.0;
    }

    let mut freq = [0u32; 256];
    let len = value.len() as f64;

    for byte in value.bytes() {
        freq[byte as usize] += 1;
    }

    let mut entropy = 0.0;
    for &count in &freq {
        if count > 0 {
            let p = count as f64 / len;
            entropy -= p * p.log2();
        }
    }

    entropy
}

/// Classify a bare key without scanning surrounding text.
pub fn detect_format(key: &str) -> KeyFormat {
    let key = key.trim();
    KEY_PATTERNS
        .iter()
        .find(|p| p.anchored.is_match(key))
        .map(|p| p.format)
        .unwrap_or(KeyFormat::Generic)
}

/// A key found in text.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedKey {
    /// The matched key. Never log this; use [`DetectedKey::masked`].
    pub value: String,
    pub format: KeyFormat,
    pub start: usize,
    pub end: usize,
    /// Surrounding text, for review UIs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl DetectedKey {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Partially masked value, safe for logs.
    pub fn masked(&self) -> String {
        mask_partial(&self.value)
    }
}

impl fmt::Debug for DetectedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectedKey")
            .field("value", &self.masked())
            .field("format", &self.format)
            .field("start", &self.start)
            .field("end", &self.end)
            .finish()
    }
}

/// Options for a detection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectOptions {
    /// Run the built-in provider formats.
    pub include_builtin: bool,
    /// Run the entropy-gated generic pattern.
    pub include_generic: bool,
    /// Extra regex patterns; matches are reported as [`KeyFormat::Custom`].
    pub custom_patterns: Vec<String>,
    /// Known key values matched literally wherever they occur.
    pub stored_keys: Vec<String>,
    /// Characters of context captured on each side; 0 disables context.
    pub context_chars: usize,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            include_builtin: true,
            include_generic: false,
            custom_patterns: Vec::new(),
            stored_keys: Vec::new(),
            context_chars: 30,
        }
    }
}

/// A custom pattern that could not be used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedPattern {
    pub pattern: String,
    pub reason: String,
}

/// API key detector with pre-compiled custom patterns.
#[derive(Clone)]
pub struct ApiKeyDetector {
    include_builtin: bool,
    include_generic: bool,
    context_chars: usize,
    custom_patterns: Vec<Regex>,
    stored_keys: Vec<String>,
    rejected: Vec<RejectedPattern>,
}

impl ApiKeyDetector {
    /// Build a detector. Invalid custom patterns are skipped and kept in
    /// [`ApiKeyDetector::rejected_patterns`].
    pub fn new(options: DetectOptions) -> Self {
        let mut custom_patterns = Vec::new();
        let mut rejected = Vec::new();
        for source in &options.custom_patterns {
            match compile_pattern(source, true) {
                Ok(regex) => custom_patterns.push(regex),
                Err(issue) => {
                    warn!(issue = %issue.kind(), "skipping invalid custom key pattern");
                    rejected.push(RejectedPattern {
                        pattern: source.clone(),
                        reason: issue.to_string(),
                    });
                }
            }
        }

        let mut stored_keys = Vec::new();
        for key in &options.stored_keys {
            let key = key.trim();
            if key.chars().count() < MIN_STORED_KEY_LEN {
                warn!(len = key.len(), "ignoring stored key shorter than minimum");
                continue;
            }
            if !stored_keys.iter().any(|k: &String| k == key) {
                stored_keys.push(key.to_string());
            }
        }

        Self {
            include_builtin: options.include_builtin,
            include_generic: options.include_generic,
            context_chars: options.context_chars,
            custom_patterns,
            stored_keys,
            rejected,
        }
    }

    pub fn rejected_patterns(&self) -> &[RejectedPattern] {
        &self.rejected
    }

    /// Find keys in `text`, deduplicated and sorted by position.
    pub fn detect(&self, text: &str) -> Vec<DetectedKey> {
        let mut found: Vec<(usize, usize, KeyFormat)> = Vec::new();

        if self.include_builtin {
            for pattern in &KEY_PATTERNS {
                for m in pattern.pattern.find_iter(text) {
                    found.push((m.start(), m.end(), pattern.format));
                }
            }
        }

        if self.include_generic {
            for m in GENERIC_PATTERN.find_iter(text) {
                if shannon_entropy(m.as_str()) >= GENERIC_ENTROPY_THRESHOLD {
                    found.push((m.start(), m.end(), KeyFormat::Generic));
                }
            }
        }

        for regex in &self.custom_patterns {
            for m in regex.find_iter(text) {
                if !m.is_empty() {
                    found.push((m.start(), m.end(), KeyFormat::Custom));
                }
            }
        }

        for key in &self.stored_keys {
            let format = detect_format(key);
            for (start, _) in text.match_indices(key.as_str()) {
                found.push((start, start + key.len(), format));
            }
        }

        dedup(&mut found);

        found
            .into_iter()
            .map(|(start, end, format)| DetectedKey {
                value: text[start..end].to_string(),
                format,
                start,
                end,
                context: context_window(text, start, end, self.context_chars),
            })
            .collect()
    }
}

impl fmt::Debug for ApiKeyDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyDetector")
            .field("include_builtin", &self.include_builtin)
            .field("include_generic", &self.include_generic)
            .field("custom_patterns", &self.custom_patterns.len())
            .field("stored_keys", &self.stored_keys.len())
            .finish()
    }
}

impl Default for ApiKeyDetector {
    fn default() -> Self {
        Self::new(DetectOptions::default())
    }
}

/// One-shot detection with the given options.
pub fn detect(text: &str, options: &DetectOptions) -> Vec<DetectedKey> {
    ApiKeyDetector::new(options.clone()).detect(text)
}

/// Sort by start, prefer the most specific then longest span at a start,
/// then drop anything overlapping a kept detection.
fn dedup(found: &mut Vec<(usize, usize, KeyFormat)>) {
    found.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| b.2.specificity().cmp(&a.2.specificity()))
            .then_with(|| (b.1 - b.0).cmp(&(a.1 - a.0)))
    });

    let mut kept = Vec::with_capacity(found.len());
    let mut last_end = 0;
    for hit in found.drain(..) {
        if kept.is_empty() || hit.0 >= last_end {
            last_end = hit.1;
            kept.push(hit);
        }
    }
    *found = kept;
}

fn context_window(text: &str, start: usize, end: usize, chars: usize) -> Option<String> {
    if chars == 0 {
        return None;
    }
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(chars - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let to = text[end..]
        .char_indices()
        .nth(chars)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    Some(text[from..to].to_string())
}

/// Keep the first and last four characters; shorter values are fully masked.
pub fn mask_partial(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return MASK_CHAR.to_string().repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!(
        "{}{}{}",
        head,
        MASK_CHAR.to_string().repeat(chars.len() - 8),
        tail
    )
}

/// Replacement text for one key.
pub fn redacted_value(key: &DetectedKey, mode: RedactionMode) -> String {
    match mode {
        RedactionMode::Full => REDACTED_API_KEY.to_string(),
        RedactionMode::Partial => mask_partial(&key.value),
        RedactionMode::Placeholder => key.format.placeholder(),
    }
}

/// Rewrite every detected key in `text`.
///
/// Keys that overlap an earlier key, or whose offsets no longer fit the
/// text, are skipped.
pub fn redact(text: &str, keys: &[DetectedKey], mode: RedactionMode) -> String {
    let mut ordered: Vec<&DetectedKey> = keys.iter().collect();
    ordered.sort_by_key(|k| k.start);

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for key in ordered {
        let in_bounds = key.start >= cursor
            && key.end <= text.len()
            && key.start < key.end
            && text.is_char_boundary(key.start)
            && text.is_char_boundary(key.end);
        if !in_bounds {
            continue;
        }
        out.push_str(&text[cursor..key.start]);
        out.push_str(&redacted_value(key, mode));
        cursor = key.end;
    }
    out.push_str(&text[cursor..]);
    out
}
