//! Custom redaction rule records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Rule category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    Financial,
    Medical,
    Personal,
    Corporate,
    #[default]
    Custom,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::Financial => "financial",
            RuleCategory::Medical => "medical",
            RuleCategory::Personal => "personal",
            RuleCategory::Corporate => "corporate",
            RuleCategory::Custom => "custom",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "financial" => Some(RuleCategory::Financial),
            "medical" => Some(RuleCategory::Medical),
            "personal" => Some(RuleCategory::Personal),
            "corporate" => Some(RuleCategory::Corporate),
            "custom" => Some(RuleCategory::Custom),
            _ => None,
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-authored pattern rule, in the storage collaborator's layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRule {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub pattern: String,
    /// Replacement template; supports `$1`, `${name}`, `$&` and `$$`.
    pub replacement: String,
    /// Higher runs first.
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub case_sensitive: bool,
    /// Replace every match; when false only the first match is replaced.
    #[serde(default = "default_true")]
    pub global: bool,
    #[serde(default)]
    pub category: RuleCategory,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Sample strings the rule is expected to match.
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<i64>,
    #[serde(default)]
    pub match_count: u64,
}

fn default_true() -> bool {
    true
}

impl CustomRule {
    /// Minimal enabled rule with the given pattern and replacement.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            pattern: pattern.into(),
            replacement: replacement.into(),
            priority: 0,
            enabled: true,
            case_sensitive: false,
            global: true,
            category: RuleCategory::Custom,
            tags: Vec::new(),
            examples: Vec::new(),
            created_at: now,
            updated_at: now,
            last_used: None,
            match_count: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }
}

/// Parse a rules file: either a bare array or `{ "rules": [...] }`.
pub fn parse_rules_str(input: &str) -> serde_json::Result<Vec<CustomRule>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RulesFile {
        Bare(Vec<CustomRule>),
        Wrapped { rules: Vec<CustomRule> },
    }

    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(match serde_json::from_str(input)? {
        RulesFile::Bare(rules) => rules,
        RulesFile::Wrapped { rules } => rules,
    })
}
