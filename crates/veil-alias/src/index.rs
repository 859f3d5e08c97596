//! Compiled lookup maps.
//!
//! Each direction (real→alias, alias→real) is one table of case-folded keys
//! and one Aho-Corasick automaton over those keys. Both are built once per
//! profile rebuild and never mutated afterwards.

use crate::case::{fold, is_word_char};
use crate::result::Direction;
use aho_corasick::{AhoCorasick, MatchKind};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use veil_common::{has_errors, validate_profile, AliasProfile, PiiType};

/// Where a key came from. Primary values beat variations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Variation,
    Primary,
}

/// One real/alias pairing owned by a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub real: String,
    pub alias: String,
    pub profile_id: String,
    pub profile_name: String,
    pub pii_type: PiiType,
}

impl Mapping {
    /// Canonical replacement when scanning in `direction`.
    pub fn target(&self, direction: Direction) -> &str {
        match direction {
            Direction::Encode => &self.alias,
            Direction::Decode => &self.real,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    mapping: Arc<Mapping>,
    tier: Tier,
}

/// A candidate match in the scanned text.
#[derive(Debug, Clone)]
pub struct Hit {
    pub start: usize,
    pub end: usize,
    pub mapping: Arc<Mapping>,
}

/// Key table plus automaton for one direction.
#[derive(Debug, Default)]
pub struct DirectionIndex {
    keys: Vec<String>,
    entries: Vec<Entry>,
    by_key: HashMap<String, usize>,
    automaton: Option<AhoCorasick>,
}

impl DirectionIndex {
    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Look a value up by its folded form.
    pub fn get(&self, value: &str) -> Option<&Mapping> {
        self.by_key
            .get(&fold(value.trim()))
            .map(|&i| self.entries[i].mapping.as_ref())
    }

    /// Insert under the precedence policy: a higher tier always wins, and
    /// within a tier the later claim wins.
    fn insert(&mut self, key: &str, mapping: &Arc<Mapping>, tier: Tier) {
        let key = fold(key.trim());
        if key.is_empty() {
            return;
        }
        match self.by_key.get(&key) {
            Some(&i) => {
                let existing = &self.entries[i];
                if existing.tier > tier {
                    return;
                }
                if existing.mapping.profile_id != mapping.profile_id
                    && (existing.mapping.real != mapping.real
                        || existing.mapping.alias != mapping.alias)
                {
                    tracing::warn!(
                        previous_profile = %existing.mapping.profile_id,
                        profile = %mapping.profile_id,
                        pii_type = %mapping.pii_type,
                        "lookup key claimed by more than one profile; later profile wins"
                    );
                }
                self.entries[i] = Entry {
                    mapping: Arc::clone(mapping),
                    tier,
                };
            }
            None => {
                self.by_key.insert(key.clone(), self.keys.len());
                self.keys.push(key);
                self.entries.push(Entry {
                    mapping: Arc::clone(mapping),
                    tier,
                });
            }
        }
    }

    /// Drop variation-tier entries whose key is in `keys`.
    fn drop_variations(&mut self, keys: &HashSet<String>) {
        let mut kept_keys = Vec::with_capacity(self.keys.len());
        let mut kept_entries = Vec::with_capacity(self.entries.len());
        for (key, entry) in self.keys.drain(..).zip(self.entries.drain(..)) {
            if entry.tier == Tier::Variation && keys.contains(&key) {
                continue;
            }
            kept_keys.push(key);
            kept_entries.push(entry);
        }
        self.by_key = kept_keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), i))
            .collect();
        self.keys = kept_keys;
        self.entries = kept_entries;
    }

    fn compile(&mut self) {
        if self.keys.is_empty() {
            self.automaton = None;
            return;
        }
        match AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .build(&self.keys)
        {
            Ok(ac) => self.automaton = Some(ac),
            Err(e) => {
                tracing::warn!(error = %e, keys = self.keys.len(), "failed to build matcher; matching disabled");
                self.automaton = None;
            }
        }
    }

    /// Find the non-overlapping whole-word matches in `text`.
    ///
    /// Every overlapping automaton hit is a candidate. Candidates failing the
    /// word-boundary rule or the profile filter are dropped, then selection
    /// runs leftmost-first and longest-at-equal-start without overlaps.
    pub fn scan(&self, text: &str, profile_ids: Option<&[String]>) -> Vec<Hit> {
        let Some(automaton) = &self.automaton else {
            return Vec::new();
        };
        let folded = fold(text);

        let mut candidates: Vec<(usize, usize, usize)> = automaton
            .find_overlapping_iter(folded.as_str())
            .filter_map(|m| {
                let id = m.pattern().as_usize();
                let (start, end) = (m.start(), m.end());
                if !on_word_boundary(text, start, end, &self.keys[id]) {
                    return None;
                }
                if let Some(ids) = profile_ids {
                    let owner = &self.entries[id].mapping.profile_id;
                    if !ids.iter().any(|p| p == owner) {
                        return None;
                    }
                }
                Some((start, end, id))
            })
            .collect();

        candidates.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut hits = Vec::new();
        let mut pos = 0;
        for (start, end, id) in candidates {
            if start < pos {
                continue;
            }
            hits.push(Hit {
                start,
                end,
                mapping: Arc::clone(&self.entries[id].mapping),
            });
            pos = end;
        }
        hits
    }
}

/// Whole-word rule, applied per edge only where the key's edge character is
/// itself a word character.
fn on_word_boundary(text: &str, start: usize, end: usize, key: &str) -> bool {
    let key_starts_word = key.chars().next().is_some_and(is_word_char);
    let key_ends_word = key.chars().next_back().is_some_and(is_word_char);

    if key_starts_word && text[..start].chars().next_back().is_some_and(is_word_char) {
        return false;
    }
    if key_ends_word && text[end..].chars().next().is_some_and(is_word_char) {
        return false;
    }
    true
}

/// Both directions, built together so bidirectionality can be enforced.
#[derive(Debug, Default)]
pub struct LookupMaps {
    pub encode: DirectionIndex,
    pub decode: DirectionIndex,
}

impl LookupMaps {
    /// Build from the enabled, valid subset of `profiles`.
    pub fn build(profiles: &[AliasProfile], variations_default: bool) -> Self {
        let mut maps = LookupMaps::default();

        for profile in profiles.iter().filter(|p| p.enabled) {
            let issues = validate_profile(profile);
            if has_errors(&issues) {
                tracing::warn!(
                    profile = %profile.id,
                    errors = issues.iter().filter(|i| i.is_error()).count(),
                    "skipping invalid profile"
                );
                continue;
            }
            maps.add_profile(profile, variations_default);
        }

        let shared: HashSet<String> = maps
            .encode
            .keys
            .iter()
            .filter(|k| maps.decode.by_key.contains_key(*k))
            .cloned()
            .collect();
        if !shared.is_empty() {
            tracing::debug!(
                count = shared.len(),
                "dropping variations present on both sides"
            );
            maps.encode.drop_variations(&shared);
            maps.decode.drop_variations(&shared);
        }

        maps.encode.compile();
        maps.decode.compile();
        maps
    }

    pub fn direction(&self, direction: Direction) -> &DirectionIndex {
        match direction {
            Direction::Encode => &self.encode,
            Direction::Decode => &self.decode,
        }
    }

    fn add_profile(&mut self, profile: &AliasProfile, variations_default: bool) {
        let use_variations = profile.variations_enabled(variations_default);
        let mapping = |pii_type: PiiType, real: &str, alias: &str| {
            Arc::new(Mapping {
                real: real.to_string(),
                alias: alias.to_string(),
                profile_id: profile.id.clone(),
                profile_name: profile.profile_name.clone(),
                pii_type,
            })
        };

        for pii_type in PiiType::STANDARD {
            let (Some(real), Some(alias)) =
                (profile.real.field(pii_type), profile.alias.field(pii_type))
            else {
                continue;
            };
            let m = mapping(pii_type, real, alias);
            self.encode.insert(real, &m, Tier::Primary);
            self.decode.insert(alias, &m, Tier::Primary);

            if let (true, Some(variations)) = (use_variations, &profile.variations) {
                for v in variations.real.active(pii_type) {
                    self.encode.insert(v, &m, Tier::Variation);
                }
                for v in variations.alias.active(pii_type) {
                    self.decode.insert(v, &m, Tier::Variation);
                }
            }
        }

        for (key, real) in &profile.real.custom {
            let real = real.trim();
            let Some(alias) = profile.alias.custom_field(key) else {
                continue;
            };
            if real.is_empty() {
                continue;
            }
            let m = mapping(PiiType::Custom, real, alias);
            self.encode.insert(real, &m, Tier::Primary);
            self.decode.insert(alias, &m, Tier::Primary);
        }
    }
}
