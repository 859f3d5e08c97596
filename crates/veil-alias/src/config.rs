//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Default input size limit (1 MiB).
pub const DEFAULT_MAX_TEXT_BYTES: usize = 1024 * 1024;

/// Tunables for [`crate::AliasEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Inputs larger than this fail open (returned unchanged).
    pub max_text_bytes: usize,

    /// Whether profile variations feed the lookup maps when a profile does
    /// not say either way.
    pub enable_variations: bool,

    /// Set `possessive` on substitution records when `'s` follows a match.
    /// The suffix itself is always kept in the text.
    pub flag_possessives: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_text_bytes: DEFAULT_MAX_TEXT_BYTES,
            enable_variations: true,
            flag_possessives: true,
        }
    }
}

impl EngineConfig {
    pub fn with_max_text_bytes(mut self, limit: usize) -> Self {
        self.max_text_bytes = limit;
        self
    }

    pub fn with_variations(mut self, enabled: bool) -> Self {
        self.enable_variations = enabled;
        self
    }

    pub fn with_possessive_flag(mut self, enabled: bool) -> Self {
        self.flag_possessives = enabled;
        self
    }
}
