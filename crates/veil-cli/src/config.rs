//! Configuration loading for the `veil` CLI.
//!
//! This module handles:
//! - Locating `config.toml` (CLI > env > XDG > defaults)
//! - Parsing the TOML into [`VeilConfig`]
//! - Resolving relative data-file paths against the config file
//! - Reporting where the configuration came from

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use veil_alias::EngineConfig;
use veil_redact::{DetectOptions, RedactionMode, VaultMode};

/// Config file name inside a config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory name under the XDG config home.
const CONFIG_DIR_NAME: &str = "veil";

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid TOML in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// API-key pass settings (`[api_keys]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiKeySettings {
    pub enabled: bool,
    /// What to do when keys are found.
    pub mode: VaultMode,
    /// How found keys are rewritten in auto-redact mode.
    pub redaction: RedactionMode,
    /// Scan for the built-in provider formats.
    pub auto_detect: bool,
    /// Also run the entropy-gated generic pattern.
    pub include_generic: bool,
    pub custom_patterns: Vec<String>,
    /// Known key values matched literally.
    pub keys: Vec<String>,
}

impl Default for ApiKeySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: VaultMode::AutoRedact,
            redaction: RedactionMode::Placeholder,
            auto_detect: true,
            include_generic: false,
            custom_patterns: Vec::new(),
            keys: Vec::new(),
        }
    }
}

impl ApiKeySettings {
    pub fn detect_options(&self) -> DetectOptions {
        DetectOptions {
            include_builtin: self.auto_detect,
            include_generic: self.include_generic,
            custom_patterns: self.custom_patterns.clone(),
            stored_keys: self.keys.clone(),
            ..DetectOptions::default()
        }
    }
}

/// Custom-rule pass settings (`[rules]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleSettings {
    pub enabled: bool,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// The `config.toml` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VeilConfig {
    /// Profile file (JSON). Relative paths resolve against the config file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profiles_file: Option<PathBuf>,
    /// Custom rule file (JSON).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_file: Option<PathBuf>,
    /// Rewrite aliases back to real values in responses.
    pub decode_responses: bool,
    pub engine: EngineConfig,
    pub api_keys: ApiKeySettings,
    pub rules: RuleSettings,
}

impl Default for VeilConfig {
    fn default() -> Self {
        Self {
            profiles_file: None,
            rules_file: None,
            decode_responses: true,
            engine: EngineConfig::default(),
            api_keys: ApiKeySettings::default(),
            rules: RuleSettings::default(),
        }
    }
}

impl VeilConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    /// Semantic checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_text_bytes == 0 {
            return Err(ConfigError::Invalid(
                "engine.max_text_bytes must be greater than zero".to_string(),
            ));
        }
        if self.api_keys.keys.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "api_keys.keys must not contain empty values".to_string(),
            ));
        }
        Ok(())
    }

    /// Make relative file paths absolute with respect to `base`.
    fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.profiles_file, &mut self.rules_file]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Where the configuration came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum ConfigSource {
    /// `--config` flag.
    Cli(PathBuf),
    /// `VEIL_CONFIG` file path.
    Env(PathBuf),
    /// `VEIL_CONFIG_DIR` directory.
    EnvDir(PathBuf),
    /// XDG config home.
    Xdg(PathBuf),
    /// No file found; built-in defaults.
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Cli(p)
            | ConfigSource::Env(p)
            | ConfigSource::EnvDir(p)
            | ConfigSource::Xdg(p) => Some(p),
            ConfigSource::Defaults => None,
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Cli(p) => write!(f, "--config {}", p.display()),
            ConfigSource::Env(p) => write!(f, "VEIL_CONFIG {}", p.display()),
            ConfigSource::EnvDir(p) => write!(f, "VEIL_CONFIG_DIR {}", p.display()),
            ConfigSource::Xdg(p) => write!(f, "{}", p.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

/// Resolved configuration with provenance information.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub source: ConfigSource,
    pub config: VeilConfig,
}

/// Configuration resolution options.
#[derive(Debug, Default, Clone)]
pub struct ConfigOptions {
    /// Explicit config file (highest priority).
    pub config_path: Option<PathBuf>,
    /// Overrides `profiles_file`.
    pub profiles_path: Option<PathBuf>,
    /// Overrides `rules_file`.
    pub rules_path: Option<PathBuf>,
}

/// Load configuration with the standard resolution order.
///
/// Resolution order (highest to lowest priority):
/// 1. `--config` file
/// 2. `VEIL_CONFIG` file
/// 3. `VEIL_CONFIG_DIR/config.toml`
/// 4. XDG config home (`~/.config/veil/config.toml`)
/// 5. Built-in defaults
///
/// Explicitly named files must exist; the directory lookups fall through
/// when the file is absent.
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    load_config_with(options, |name| std::env::var(name).ok())
}

/// [`load_config`] with an injectable environment lookup.
pub fn load_config_with(
    options: &ConfigOptions,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig, ConfigError> {
    let source = resolve_source(options, &lookup)?;

    let mut config = match source.path() {
        Some(path) => {
            let mut config = read_config_file(path)?;
            if let Some(dir) = path.parent() {
                config.resolve_paths(dir);
            }
            config
        }
        None => VeilConfig::default(),
    };

    if let Some(path) = &options.profiles_path {
        config.profiles_file = Some(path.clone());
    }
    if let Some(path) = &options.rules_path {
        config.rules_file = Some(path.clone());
    }
    config.validate()?;

    tracing::debug!(source = %source, "configuration resolved");
    Ok(ResolvedConfig { source, config })
}

fn resolve_source(
    options: &ConfigOptions,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<ConfigSource, ConfigError> {
    // 1. Explicit option
    if let Some(path) = &options.config_path {
        return require_file(path).map(|_| ConfigSource::Cli(path.clone()));
    }

    // 2. Environment variable naming a file
    if let Some(path) = lookup("VEIL_CONFIG").filter(|v| !v.is_empty()) {
        let path = PathBuf::from(path);
        return require_file(&path).map(|_| ConfigSource::Env(path));
    }

    // 3. Environment variable naming a directory
    if let Some(dir) = lookup("VEIL_CONFIG_DIR").filter(|v| !v.is_empty()) {
        let path = PathBuf::from(dir).join(CONFIG_FILE_NAME);
        if path.is_file() {
            return Ok(ConfigSource::EnvDir(path));
        }
    }

    // 4. XDG config home
    let xdg = lookup("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir);
    if let Some(base) = xdg {
        let path = base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
        if path.is_file() {
            return Ok(ConfigSource::Xdg(path));
        }
    }

    Ok(ConfigSource::Defaults)
}

fn require_file(path: &Path) -> Result<(), ConfigError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        })
    }
}

fn read_config_file(path: &Path) -> Result<VeilConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
        path: path.to_path_buf(),
        source,
    })?;
    VeilConfig::from_toml_str(&content).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = VeilConfig::default();
        assert!(config.decode_responses);
        assert!(config.api_keys.enabled);
        assert_eq!(config.api_keys.mode, VaultMode::AutoRedact);
        assert_eq!(config.api_keys.redaction, RedactionMode::Placeholder);
        assert!(config.rules.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_document() {
        let config = VeilConfig::from_toml_str(
            r#"
            profiles_file = "profiles.json"
            rules_file = "rules.json"
            decode_responses = false

            [engine]
            max_text_bytes = 4096
            enable_variations = false

            [api_keys]
            mode = "warn-first"
            redaction = "partial"
            include_generic = true
            custom_patterns = ["acme_[0-9a-f]{16}"]
            keys = ["corp-internal-token-7788"]

            [rules]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.profiles_file, Some(PathBuf::from("profiles.json")));
        assert!(!config.decode_responses);
        assert_eq!(config.engine.max_text_bytes, 4096);
        assert!(!config.engine.enable_variations);
        assert!(config.engine.flag_possessives);
        assert_eq!(config.api_keys.mode, VaultMode::WarnFirst);
        assert_eq!(config.api_keys.redaction, RedactionMode::Partial);
        assert!(!config.rules.enabled);

        let options = config.api_keys.detect_options();
        assert!(options.include_builtin);
        assert!(options.include_generic);
        assert_eq!(options.stored_keys, vec!["corp-internal-token-7788"]);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(VeilConfig::from_toml_str("profile_file = \"x\"").is_err());
        assert!(VeilConfig::from_toml_str("[api_keys]\nmode = \"shout\"").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_limit() {
        let mut config = VeilConfig::default();
        config.engine.max_text_bytes = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_resolution_defaults_when_nothing_found() {
        let dir = tempdir().unwrap();
        let xdg = dir.path().to_string_lossy().to_string();
        let resolved =
            load_config_with(&ConfigOptions::default(), env(&[("XDG_CONFIG_HOME", &xdg)])).unwrap();
        assert_eq!(resolved.source, ConfigSource::Defaults);
        assert_eq!(resolved.config, VeilConfig::default());
    }

    #[test]
    fn test_resolution_order() {
        let dir = tempdir().unwrap();
        let xdg_dir = dir.path().join("xdg").join(CONFIG_DIR_NAME);
        let env_dir = dir.path().join("envdir");
        std::fs::create_dir_all(&xdg_dir).unwrap();
        std::fs::create_dir_all(&env_dir).unwrap();
        std::fs::write(xdg_dir.join(CONFIG_FILE_NAME), "decode_responses = false\n").unwrap();
        std::fs::write(env_dir.join(CONFIG_FILE_NAME), "[rules]\nenabled = false\n").unwrap();
        let explicit = dir.path().join("explicit.toml");
        std::fs::write(&explicit, "profiles_file = \"p.json\"\n").unwrap();

        let xdg = dir.path().join("xdg").to_string_lossy().to_string();
        let env_dir_s = env_dir.to_string_lossy().to_string();

        let resolved =
            load_config_with(&ConfigOptions::default(), env(&[("XDG_CONFIG_HOME", &xdg)])).unwrap();
        assert!(matches!(resolved.source, ConfigSource::Xdg(_)));
        assert!(!resolved.config.decode_responses);

        let resolved = load_config_with(
            &ConfigOptions::default(),
            env(&[("XDG_CONFIG_HOME", &xdg), ("VEIL_CONFIG_DIR", &env_dir_s)]),
        )
        .unwrap();
        assert!(matches!(resolved.source, ConfigSource::EnvDir(_)));
        assert!(!resolved.config.rules.enabled);

        let options = ConfigOptions {
            config_path: Some(explicit.clone()),
            ..Default::default()
        };
        let resolved = load_config_with(&options, env(&[("VEIL_CONFIG_DIR", &env_dir_s)])).unwrap();
        assert_eq!(resolved.source, ConfigSource::Cli(explicit));
        // Relative data paths resolve against the config file.
        assert_eq!(resolved.config.profiles_file, Some(dir.path().join("p.json")));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let options = ConfigOptions {
            config_path: Some(PathBuf::from("/nonexistent/veil.toml")),
            ..Default::default()
        };
        assert!(matches!(
            load_config_with(&options, env(&[])),
            Err(ConfigError::NotFound { .. })
        ));
        assert!(matches!(
            load_config_with(&ConfigOptions::default(), env(&[("VEIL_CONFIG", "/nonexistent/x.toml")])),
            Err(ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[engine\n").unwrap();
        let options = ConfigOptions {
            config_path: Some(path.clone()),
            ..Default::default()
        };
        let err = load_config_with(&options, env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_cli_paths_override_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.toml");
        std::fs::write(&path, "rules_file = \"a.json\"\n").unwrap();
        let options = ConfigOptions {
            config_path: Some(path),
            rules_path: Some(PathBuf::from("/tmp/b.json")),
            profiles_path: None,
        };
        let resolved = load_config_with(&options, env(&[])).unwrap();
        assert_eq!(resolved.config.rules_file, Some(PathBuf::from("/tmp/b.json")));
    }
}
