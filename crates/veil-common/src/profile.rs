//! Alias profiles: a real identity paired with its alias, plus variation
//! sets, usage statistics and per-profile settings.

use crate::identity::{AiService, IdentityData, PiiType};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A user-supplied variation string with an on/off switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CustomVariation {
    pub value: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Variation strings for one side (real or alias) of a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VariationSet {
    /// Output of the variation generator, per field.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub generated: BTreeMap<PiiType, Vec<String>>,

    /// User-approved additions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<PiiType, Vec<CustomVariation>>,

    /// Generated strings the user switched off.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub disabled: BTreeMap<PiiType, Vec<String>>,
}

impl VariationSet {
    /// Active variations for a field: generated minus disabled, then enabled
    /// custom entries. Order is preserved and duplicates are removed.
    pub fn active(&self, pii_type: PiiType) -> Vec<&str> {
        let disabled = self.disabled.get(&pii_type);
        let is_disabled = |v: &str| disabled.is_some_and(|d| d.iter().any(|x| x == v));

        let mut out: Vec<&str> = Vec::new();
        let generated = self.generated.get(&pii_type).into_iter().flatten();
        let custom = self
            .custom
            .get(&pii_type)
            .into_iter()
            .flatten()
            .filter(|c| c.enabled)
            .map(|c| &c.value);

        for value in generated.filter(|v| !is_disabled(v.as_str())).chain(custom) {
            let value = value.trim();
            if !value.is_empty() && !out.contains(&value) {
                out.push(value);
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.generated.values().all(Vec::is_empty) && self.custom.values().all(Vec::is_empty)
    }
}

/// Variation sets for both sides of a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProfileVariations {
    #[serde(default)]
    pub real: VariationSet,
    #[serde(default)]
    pub alias: VariationSet,
}

/// Usage counters for a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    #[serde(default)]
    pub total_substitutions: u64,

    /// Milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<i64>,

    #[serde(default)]
    pub by_service: BTreeMap<AiService, u64>,

    #[serde(default, rename = "byPIIType", alias = "byPiiType")]
    pub by_pii_type: BTreeMap<PiiType, u64>,
}

impl UsageStats {
    /// Count one substitution.
    pub fn record(&mut self, service: AiService, pii_type: PiiType, at_millis: i64) {
        self.total_substitutions = self.total_substitutions.saturating_add(1);
        *self.by_service.entry(service).or_insert(0) += 1;
        *self.by_pii_type.entry(pii_type).or_insert(0) += 1;
        self.last_used = Some(self.last_used.map_or(at_millis, |t| t.max(at_millis)));
    }

    /// Add another set of counters into this one.
    pub fn merge(&mut self, other: &UsageStats) {
        self.total_substitutions = self
            .total_substitutions
            .saturating_add(other.total_substitutions);
        for (service, n) in &other.by_service {
            *self.by_service.entry(*service).or_insert(0) += n;
        }
        for (pii_type, n) in &other.by_pii_type {
            *self.by_pii_type.entry(*pii_type).or_insert(0) += n;
        }
        self.last_used = match (self.last_used, other.last_used) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMetadata {
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub usage_stats: UsageStats,
    /// Detection confidence for auto-detected profiles, 0..=1.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl Default for ProfileMetadata {
    fn default() -> Self {
        Self {
            created_at: 0,
            updated_at: 0,
            usage_stats: UsageStats::default(),
            confidence: default_confidence(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSettings {
    /// Replace automatically rather than warn first.
    #[serde(default = "default_true")]
    pub auto_replace: bool,

    #[serde(default = "default_true", rename = "highlightInUI", alias = "highlightInUi")]
    pub highlight_in_ui: bool,

    /// Services this profile protects. Empty means all.
    #[serde(default)]
    pub active_services: Vec<AiService>,

    /// Per-profile override of the engine's variation default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_variations: Option<bool>,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            auto_replace: true,
            highlight_in_ui: true,
            active_services: Vec::new(),
            enable_variations: None,
        }
    }
}

/// The unit of substitution configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AliasProfile {
    pub id: String,

    #[serde(default)]
    pub profile_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    pub real: IdentityData,

    pub alias: IdentityData,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variations: Option<ProfileVariations>,

    #[serde(default)]
    pub metadata: ProfileMetadata,

    #[serde(default)]
    pub settings: ProfileSettings,
}

impl AliasProfile {
    /// New enabled profile with default metadata stamped now.
    pub fn new(
        id: impl Into<String>,
        profile_name: impl Into<String>,
        real: IdentityData,
        alias: IdentityData,
    ) -> Self {
        let now = crate::now_millis();
        Self {
            id: id.into(),
            profile_name: profile_name.into(),
            description: None,
            enabled: true,
            real,
            alias,
            variations: None,
            metadata: ProfileMetadata {
                created_at: now,
                updated_at: now,
                ..ProfileMetadata::default()
            },
            settings: ProfileSettings::default(),
        }
    }

    /// Whether this profile applies to a request for `service`.
    pub fn is_active_for(&self, service: AiService) -> bool {
        self.enabled
            && (self.settings.active_services.is_empty()
                || self.settings.active_services.contains(&service))
    }

    /// Whether variations should feed the lookup maps, given the engine default.
    pub fn variations_enabled(&self, engine_default: bool) -> bool {
        self.settings.enable_variations.unwrap_or(engine_default)
    }
}

fn default_true() -> bool {
    true
}

fn default_confidence() -> f64 {
    1.0
}
