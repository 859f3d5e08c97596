//! API key vault records.
//!
//! The vault holds keys the user registered explicitly. Stored values are
//! matched literally wherever they occur, on top of the format table.

use serde::{Deserialize, Serialize};

use crate::keys::{detect_format, ApiKeyDetector, DetectOptions, DetectedKey, KeyFormat};

/// How the host reacts to a detected key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VaultMode {
    /// Redact silently.
    #[default]
    #[serde(alias = "autoRedact")]
    AutoRedact,
    /// Ask before sending.
    #[serde(alias = "warnFirst")]
    WarnFirst,
    /// Record the detection and send unchanged.
    #[serde(alias = "logOnly")]
    LogOnly,
}

impl VaultMode {
    /// Whether keys are rewritten before the text leaves the machine.
    pub fn redacts(&self) -> bool {
        matches!(self, VaultMode::AutoRedact)
    }
}

/// A key registered in the vault.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub key_value: String,
    #[serde(default = "default_format")]
    pub format: KeyFormat,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<i64>,
    #[serde(default)]
    pub protection_count: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_format() -> KeyFormat {
    KeyFormat::Generic
}

fn default_true() -> bool {
    true
}

impl ApiKeyRecord {
    /// New enabled record; the format is classified from the value.
    pub fn new(id: impl Into<String>, key_value: impl Into<String>) -> Self {
        let key_value = key_value.into();
        Self {
            id: id.into(),
            name: None,
            format: detect_format(&key_value),
            key_value,
            created_at: chrono::Utc::now().timestamp_millis(),
            last_used: None,
            protection_count: 0,
            enabled: true,
        }
    }
}

impl std::fmt::Debug for ApiKeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("format", &self.format)
            .field("protection_count", &self.protection_count)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Vault settings as stored by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiKeyVaultConfig {
    pub enabled: bool,
    pub mode: VaultMode,
    /// Scan for the built-in provider formats.
    pub auto_detect_patterns: bool,
    pub keys: Vec<ApiKeyRecord>,
    pub custom_patterns: Vec<String>,
}

impl Default for ApiKeyVaultConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: VaultMode::AutoRedact,
            auto_detect_patterns: true,
            keys: Vec::new(),
            custom_patterns: Vec::new(),
        }
    }
}

impl ApiKeyDetector {
    /// Detector for a vault: built-in formats when auto-detect is on,
    /// the vault's custom patterns and every enabled stored key.
    pub fn from_vault(config: &ApiKeyVaultConfig) -> Self {
        ApiKeyDetector::new(DetectOptions {
            include_builtin: config.auto_detect_patterns,
            include_generic: false,
            custom_patterns: config.custom_patterns.clone(),
            stored_keys: config
                .keys
                .iter()
                .filter(|k| k.enabled)
                .map(|k| k.key_value.clone())
                .collect(),
            ..Default::default()
        })
    }
}

/// Bump `protectionCount` and `lastUsed` on vault records that were found.
pub fn record_protection(records: &mut [ApiKeyRecord], detected: &[DetectedKey]) {
    let now = chrono::Utc::now().timestamp_millis();
    for record in records.iter_mut().filter(|r| r.enabled) {
        let hits = detected
            .iter()
            .filter(|d| d.value == record.key_value)
            .count() as u64;
        if hits > 0 {
            record.protection_count += hits;
            record.last_used = Some(now);
        }
    }
}
