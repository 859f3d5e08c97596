//! The alias substitution engine.
//!
//! One engine is constructed by the host and shared by reference between
//! callers. Profiles are compiled into an immutable [`LookupMaps`] snapshot
//! that is published atomically; `substitute` and `find_pii` only ever read
//! the snapshot that was current when they started.

use crate::case::preserve_case;
use crate::config::EngineConfig;
use crate::index::{Hit, LookupMaps};
use crate::result::{
    Direction, PiiMatch, SubstituteMode, SubstituteOptions, Substitution, SubstitutionResult,
};
use arc_swap::ArcSwapOption;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use veil_common::{now_millis, AiService, AliasProfile, Error, PiiType, ProfileStore, UsageStats};

const POSSESSIVE_SUFFIXES: [&str; 4] = ["'s", "\u{2019}s", "'S", "\u{2019}S"];

/// Whether profiles have been loaded, and how much they compiled to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineStatus {
    Uninitialized,
    Loaded {
        profiles: usize,
        enabled: usize,
        encode_keys: usize,
        decode_keys: usize,
    },
}

struct Snapshot {
    profiles: Vec<AliasProfile>,
    maps: LookupMaps,
}

pub struct AliasEngine {
    config: EngineConfig,
    store: Option<Arc<dyn ProfileStore>>,
    snapshot: ArcSwapOption<Snapshot>,
    /// Increments recorded since the last load from the store.
    usage: Mutex<HashMap<String, UsageStats>>,
}

impl std::fmt::Debug for AliasEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliasEngine")
            .field("config", &self.config)
            .field("has_store", &self.store.is_some())
            .field("status", &self.status())
            .finish()
    }
}

impl Default for AliasEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl AliasEngine {
    /// Engine without a storage collaborator. Profiles come in through
    /// [`AliasEngine::set_profiles`].
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            store: None,
            snapshot: ArcSwapOption::empty(),
            usage: Mutex::new(HashMap::new()),
        }
    }

    /// Engine backed by a storage collaborator.
    pub fn with_store(config: EngineConfig, store: Arc<dyn ProfileStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the profile set and rebuild the lookup maps. Never fails; an
    /// empty set clears all matching.
    pub fn set_profiles(&self, profiles: Vec<AliasProfile>) {
        let maps = LookupMaps::build(&profiles, self.config.enable_variations);
        tracing::debug!(
            profiles = profiles.len(),
            enabled = profiles.iter().filter(|p| p.enabled).count(),
            encode_keys = maps.encode.len(),
            decode_keys = maps.decode.len(),
            "rebuilt lookup maps"
        );
        self.snapshot
            .store(Some(Arc::new(Snapshot { profiles, maps })));
    }

    /// Fetch profiles from the store and rebuild. A failed fetch (or a
    /// missing store) leaves an empty, loaded engine. Returns the number of
    /// profiles loaded.
    pub fn load_profiles(&self) -> usize {
        let profiles = match &self.store {
            Some(store) => match store.load_profiles() {
                Ok(profiles) => profiles,
                Err(e) => {
                    tracing::warn!(error = %e, code = e.code(), "profile load failed; substitution disabled");
                    Vec::new()
                }
            },
            None => {
                tracing::warn!("no profile store configured; substitution disabled");
                Vec::new()
            }
        };
        if let Ok(mut usage) = self.usage.lock() {
            usage.clear();
        }
        let count = profiles.len();
        self.set_profiles(profiles);
        count
    }

    /// Rebuild from the store, or from the current set when there is none.
    pub fn reload(&self) -> usize {
        if self.store.is_some() {
            return self.load_profiles();
        }
        let current = self
            .snapshot
            .load_full()
            .map(|s| s.profiles.clone())
            .unwrap_or_default();
        let count = current.len();
        self.set_profiles(current);
        count
    }

    pub fn status(&self) -> EngineStatus {
        match self.snapshot.load_full() {
            None => EngineStatus::Uninitialized,
            Some(s) => EngineStatus::Loaded {
                profiles: s.profiles.len(),
                enabled: s.profiles.iter().filter(|p| p.enabled).count(),
                encode_keys: s.maps.encode.len(),
                decode_keys: s.maps.decode.len(),
            },
        }
    }

    /// Rewrite `text` in `direction`. Never fails: on any fault the input
    /// comes back unchanged with the error recorded on the result.
    pub fn substitute(
        &self,
        text: &str,
        direction: Direction,
        options: &SubstituteOptions,
    ) -> SubstitutionResult {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.try_substitute(text, direction, options)
        }));
        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, %direction, "substitution failed open");
                SubstitutionResult::failed_open(text, e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(%direction, panic = %message, "substitution panicked; failing open");
                SubstitutionResult::failed_open(text, format!("internal error: {}", message))
            }
        }
    }

    /// `substitute(text, Encode)` with default options.
    pub fn encode(&self, text: &str) -> SubstitutionResult {
        self.substitute(text, Direction::Encode, &SubstituteOptions::default())
    }

    /// `substitute(text, Decode)` with default options.
    pub fn decode(&self, text: &str) -> SubstitutionResult {
        self.substitute(text, Direction::Decode, &SubstituteOptions::default())
    }

    fn try_substitute(
        &self,
        text: &str,
        direction: Direction,
        options: &SubstituteOptions,
    ) -> Result<SubstitutionResult, Error> {
        if text.len() > self.config.max_text_bytes {
            return Err(Error::InputTooLarge {
                len: text.len(),
                limit: self.config.max_text_bytes,
            });
        }
        let Some(snapshot) = self.snapshot.load_full() else {
            return Ok(SubstitutionResult::unchanged(text));
        };

        let hits = snapshot
            .maps
            .direction(direction)
            .scan(text, options.profile_ids.as_deref());
        if hits.is_empty() {
            return Ok(SubstitutionResult::unchanged(text));
        }

        let rewrite = options.mode == SubstituteMode::Replace;
        let mut output = String::with_capacity(text.len());
        let mut last = 0;
        let mut substitutions = Vec::with_capacity(hits.len());

        for hit in &hits {
            let from = &text[hit.start..hit.end];
            let to = preserve_case(from, hit.mapping.target(direction));
            if rewrite {
                output.push_str(&text[last..hit.start]);
                output.push_str(&to);
                last = hit.end;
            }
            substitutions.push(Substitution {
                from: from.to_string(),
                to,
                position: hit.start,
                end: hit.end,
                profile_id: hit.mapping.profile_id.clone(),
                pii_type: hit.mapping.pii_type,
                possessive: self.config.flag_possessives && is_possessive(&text[hit.end..]),
            });
        }

        let text_out = if rewrite {
            output.push_str(&text[last..]);
            output
        } else {
            text.to_string()
        };

        Ok(SubstitutionResult::from_substitutions(
            text_out,
            substitutions,
            |id| profile_name(&hits, id),
        ))
    }

    /// Read-only scan with encode semantics.
    pub fn find_pii(&self, text: &str) -> Vec<PiiMatch> {
        if text.len() > self.config.max_text_bytes {
            tracing::warn!(
                len = text.len(),
                limit = self.config.max_text_bytes,
                "input too large for scan"
            );
            return Vec::new();
        }
        let Some(snapshot) = self.snapshot.load_full() else {
            return Vec::new();
        };
        snapshot
            .maps
            .encode
            .scan(text, None)
            .into_iter()
            .map(|hit| {
                let matched = &text[hit.start..hit.end];
                PiiMatch {
                    text: matched.to_string(),
                    start: hit.start,
                    end: hit.end,
                    alias: preserve_case(matched, &hit.mapping.alias),
                    profile_id: hit.mapping.profile_id.clone(),
                    profile_name: hit.mapping.profile_name.clone(),
                    pii_type: hit.mapping.pii_type,
                }
            })
            .collect()
    }

    /// Count one substitution against a profile and forward it to the
    /// store. Store failures are logged, never returned.
    pub fn update_profile_usage(&self, profile_id: &str, service: AiService, pii_type: PiiType) {
        let now = now_millis();
        match self.usage.lock() {
            Ok(mut usage) => usage
                .entry(profile_id.to_string())
                .or_default()
                .record(service, pii_type, now),
            Err(e) => {
                tracing::warn!(profile = %profile_id, error = %e, "usage counters unavailable");
            }
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.increment_usage(profile_id, service, pii_type, now) {
                tracing::warn!(
                    profile = %profile_id,
                    %service,
                    %pii_type,
                    error = %e,
                    "failed to persist usage"
                );
            }
        }
    }

    /// Apply the usage increments for every substitution in `result`.
    pub fn record_usage(&self, result: &SubstitutionResult, service: AiService) {
        for s in &result.substitutions {
            self.update_profile_usage(&s.profile_id, service, s.pii_type);
        }
    }

    /// Whether at least one enabled profile is loaded.
    pub fn has_profiles(&self) -> bool {
        self.snapshot
            .load_full()
            .is_some_and(|s| s.profiles.iter().any(|p| p.enabled))
    }

    /// Enabled profiles, with in-memory usage merged in.
    pub fn get_profiles(&self) -> Vec<AliasProfile> {
        let Some(snapshot) = self.snapshot.load_full() else {
            return Vec::new();
        };
        snapshot
            .profiles
            .iter()
            .filter(|p| p.enabled)
            .map(|p| self.with_usage(p))
            .collect()
    }

    /// Any loaded profile by id, with in-memory usage merged in.
    pub fn get_profile(&self, id: &str) -> Option<AliasProfile> {
        let snapshot = self.snapshot.load_full()?;
        snapshot
            .profiles
            .iter()
            .find(|p| p.id == id)
            .map(|p| self.with_usage(p))
    }

    /// Whether `value` is a lookup key in `direction`.
    pub fn has_mapping(&self, direction: Direction, value: &str) -> bool {
        self.snapshot
            .load_full()
            .is_some_and(|s| s.maps.direction(direction).get(value).is_some())
    }

    fn with_usage(&self, profile: &AliasProfile) -> AliasProfile {
        let mut profile = profile.clone();
        if let Ok(usage) = self.usage.lock() {
            if let Some(stats) = usage.get(&profile.id) {
                profile.metadata.usage_stats.merge(stats);
            }
        }
        profile
    }
}

fn profile_name<'a>(hits: &'a [Hit], id: &str) -> Option<&'a str> {
    hits.iter()
        .find(|h| h.mapping.profile_id == id)
        .map(|h| h.mapping.profile_name.as_str())
}

fn is_possessive(rest: &str) -> bool {
    POSSESSIVE_SUFFIXES.iter().any(|suffix| {
        rest.strip_prefix(suffix)
            .is_some_and(|after| !after.chars().next().is_some_and(crate::case::is_word_char))
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_common::{IdentityData, MemoryProfileStore};

    fn john() -> AliasProfile {
        AliasProfile::new(
            "p1",
            "Work",
            IdentityData {
                name: Some("John Smith".into()),
                email: Some("john@x.com".into()),
                ..Default::default()
            },
            IdentityData {
                name: Some("Alex Johnson".into()),
                email: Some("alex@y.com".into()),
                ..Default::default()
            },
        )
    }

    fn engine_with(profiles: Vec<AliasProfile>) -> AliasEngine {
        let engine = AliasEngine::default();
        engine.set_profiles(profiles);
        engine
    }

    #[test]
    fn test_scenario_round_trip() {
        let engine = engine_with(vec![john()]);
        let input = "Hi, I'm John Smith (john@x.com)";
        let encoded = engine.encode(input);
        assert_eq!(encoded.text, "Hi, I'm Alex Johnson (alex@y.com)");
        assert_eq!(encoded.count(), 2);
        assert_eq!(engine.decode(&encoded.text).text, input);
    }

    #[test]
    fn test_case_classes() {
        let engine = engine_with(vec![john()]);
        assert_eq!(engine.encode("JOHN SMITH is here").text, "ALEX JOHNSON is here");
        assert_eq!(engine.encode("John Smith").text, "Alex Johnson");
        assert_eq!(engine.encode("john smith").text, "alex johnson");
        assert_eq!(engine.encode("jOHN sMITH").text, "Alex Johnson");
    }

    #[test]
    fn test_possessive() {
        let engine = engine_with(vec![john()]);
        let result = engine.encode("John Smith's car");
        assert_eq!(result.text, "Alex Johnson's car");
        assert!(result.substitutions[0].possessive);

        let curly = engine.encode("JOHN SMITH\u{2019}S CAR");
        assert_eq!(curly.text, "ALEX JOHNSON\u{2019}S CAR");
        assert!(curly.substitutions[0].possessive);

        let not_possessive = engine.encode("John Smith'sy");
        assert!(!not_possessive.substitutions[0].possessive);
    }

    #[test]
    fn test_possessive_flag_off_keeps_suffix() {
        let engine = AliasEngine::new(EngineConfig::default().with_possessive_flag(false));
        engine.set_profiles(vec![john()]);
        let result = engine.encode("John Smith's car");
        assert_eq!(result.text, "Alex Johnson's car");
        assert!(!result.substitutions[0].possessive);
        assert_eq!(engine.decode(&result.text).text, "John Smith's car");
    }

    #[test]
    fn test_uninitialized_is_passthrough() {
        let engine = AliasEngine::default();
        assert_eq!(engine.status(), EngineStatus::Uninitialized);
        let result = engine.encode("John Smith");
        assert_eq!(result.text, "John Smith");
        assert_eq!(result.count(), 0);
        assert!(result.error.is_none());
        assert!(!engine.has_profiles());
    }

    #[test]
    fn test_oversized_input_fails_open() {
        let engine = AliasEngine::new(EngineConfig::default().with_max_text_bytes(8));
        engine.set_profiles(vec![john()]);
        let result = engine.encode("John Smith is here");
        assert_eq!(result.text, "John Smith is here");
        assert_eq!(result.count(), 0);
        assert!(result.error.unwrap().contains("too large"));
    }

    #[test]
    fn test_detect_only_leaves_text() {
        let engine = engine_with(vec![john()]);
        let result = engine.substitute(
            "mail john@x.com",
            Direction::Encode,
            &SubstituteOptions::detect_only(),
        );
        assert_eq!(result.text, "mail john@x.com");
        assert_eq!(result.substitutions[0].to, "alex@y.com");
        assert_eq!(result.substitutions[0].position, 5);
    }

    #[test]
    fn test_find_pii() {
        let engine = engine_with(vec![john()]);
        let found = engine.find_pii("JOHN SMITH wrote to john@x.com");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].alias, "ALEX JOHNSON");
        assert_eq!(found[0].profile_name, "Work");
        assert_eq!(found[1].pii_type, PiiType::Email);
        assert_eq!((found[1].start, found[1].end), (20, 30));
    }

    #[test]
    fn test_status_and_mapping() {
        let engine = engine_with(vec![john()]);
        match engine.status() {
            EngineStatus::Loaded {
                profiles,
                enabled,
                encode_keys,
                ..
            } => {
                assert_eq!(profiles, 1);
                assert_eq!(enabled, 1);
                assert!(encode_keys >= 2);
            }
            other => panic!("unexpected status {other:?}"),
        }
        assert!(engine.has_mapping(Direction::Encode, "JOHN SMITH"));
        assert!(engine.has_mapping(Direction::Decode, "alex@y.com"));
        assert!(!engine.has_mapping(Direction::Decode, "john@x.com"));
    }

    #[test]
    fn test_toggle_enabled_changes_matching() {
        let engine = engine_with(vec![john()]);
        let mut disabled = john();
        disabled.enabled = false;
        engine.set_profiles(vec![disabled]);
        assert_eq!(engine.encode("John Smith").count(), 0);
        assert!(!engine.has_profiles());
        assert!(engine.get_profiles().is_empty());
        assert!(engine.get_profile("p1").is_some());
    }

    #[test]
    fn test_usage_updates_reach_store_and_accessors() {
        let store = Arc::new(MemoryProfileStore::new(vec![john()]));
        let engine = AliasEngine::with_store(EngineConfig::default(), store.clone());
        assert_eq!(engine.load_profiles(), 1);

        let result = engine.encode("John Smith, john@x.com");
        engine.record_usage(&result, AiService::Claude);

        let profile = engine.get_profile("p1").unwrap();
        assert_eq!(profile.metadata.usage_stats.total_substitutions, 2);
        let stored = store.load_profiles().unwrap();
        assert_eq!(stored[0].metadata.usage_stats.total_substitutions, 2);
    }

    #[test]
    fn test_usage_for_unknown_profile_does_not_fail() {
        let store = Arc::new(MemoryProfileStore::default());
        let engine = AliasEngine::with_store(EngineConfig::default(), store);
        engine.load_profiles();
        engine.update_profile_usage("ghost", AiService::Poe, PiiType::Name);
    }

    #[test]
    fn test_load_without_store_is_empty_loaded() {
        let engine = AliasEngine::default();
        assert_eq!(engine.load_profiles(), 0);
        assert!(matches!(engine.status(), EngineStatus::Loaded { profiles: 0, .. }));
    }

    #[test]
    fn test_reload_without_store_keeps_profiles() {
        let engine = engine_with(vec![john()]);
        assert_eq!(engine.reload(), 1);
        assert_eq!(engine.encode("John Smith").count(), 1);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
