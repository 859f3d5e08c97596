//! Substitution options, results and confidence scoring.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use veil_common::PiiType;

/// Which way to rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// real → alias (outbound request)
    Encode,
    /// alias → real (inbound response)
    Decode,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Encode => write!(f, "encode"),
            Direction::Decode => write!(f, "decode"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "encode" => Ok(Direction::Encode),
            "decode" => Ok(Direction::Decode),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubstituteMode {
    /// Rewrite the text.
    #[default]
    Replace,
    /// Scan and report, leave the text alone.
    DetectOnly,
}

#[derive(Debug, Clone, Default)]
pub struct SubstituteOptions {
    /// Restrict matching to these profiles.
    pub profile_ids: Option<Vec<String>>,
    pub mode: SubstituteMode,
}

impl SubstituteOptions {
    pub fn detect_only() -> Self {
        Self {
            mode: SubstituteMode::DetectOnly,
            ..Self::default()
        }
    }

    pub fn for_profiles(ids: Vec<String>) -> Self {
        Self {
            profile_ids: Some(ids),
            ..Self::default()
        }
    }
}

/// One replaced (or, in detect-only mode, replaceable) span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Substitution {
    /// Matched text as it appeared in the input.
    pub from: String,
    /// Case-adjusted replacement.
    pub to: String,
    /// Byte offset of the match in the input.
    pub position: usize,
    /// Byte offset one past the match in the input.
    pub end: usize,
    pub profile_id: String,
    pub pii_type: PiiType,
    /// A possessive `'s` followed the match and was kept.
    pub possessive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub pii_type: PiiType,
    pub value: String,
    pub position: usize,
}

/// Per-profile summary for activity logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMatch {
    pub profile_id: String,
    pub profile_name: String,
    pub pii_types: Vec<PiiType>,
    pub matches: Vec<MatchRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstitutionResult {
    pub text: String,
    pub substitutions: Vec<Substitution>,
    pub confidence: f64,
    pub profiles_matched: Vec<ProfileMatch>,
    /// Set when the call failed open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubstitutionResult {
    /// The input unchanged, nothing substituted.
    pub fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            substitutions: Vec::new(),
            confidence: confidence(&[]),
            profiles_matched: Vec::new(),
            error: None,
        }
    }

    /// Fail-open pass-through carrying the error text.
    pub fn failed_open(text: &str, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::unchanged(text)
        }
    }

    pub fn count(&self) -> usize {
        self.substitutions.len()
    }

    pub fn is_failed_open(&self) -> bool {
        self.error.is_some()
    }

    /// Build from ordered substitutions. `names` resolves profile ids to
    /// display names.
    pub(crate) fn from_substitutions<'a>(
        text: String,
        substitutions: Vec<Substitution>,
        names: impl Fn(&str) -> Option<&'a str>,
    ) -> Self {
        let mut profiles_matched: Vec<ProfileMatch> = Vec::new();
        for s in &substitutions {
            let idx = match profiles_matched
                .iter()
                .position(|p| p.profile_id == s.profile_id)
            {
                Some(i) => i,
                None => {
                    profiles_matched.push(ProfileMatch {
                        profile_id: s.profile_id.clone(),
                        profile_name: names(&s.profile_id).unwrap_or_default().to_string(),
                        pii_types: Vec::new(),
                        matches: Vec::new(),
                    });
                    profiles_matched.len() - 1
                }
            };
            let pm = &mut profiles_matched[idx];
            if !pm.pii_types.contains(&s.pii_type) {
                pm.pii_types.push(s.pii_type);
            }
            pm.matches.push(MatchRecord {
                pii_type: s.pii_type,
                value: s.from.clone(),
                position: s.position,
            });
        }

        Self {
            confidence: confidence(&substitutions),
            text,
            substitutions,
            profiles_matched,
            error: None,
        }
    }
}

/// A PII span found by a read-only scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PiiMatch {
    pub text: String,
    pub start: usize,
    pub end: usize,
    /// Case-adjusted alias that encode would write here.
    pub alias: String,
    pub profile_id: String,
    pub profile_name: String,
    pub pii_type: PiiType,
}

/// Confidence heuristic.
///
/// 1.0 when nothing was substituted. Otherwise a base of 0.7 plus
/// saturating terms for substitution count, distinct PII types and
/// distinct profiles; the result stays within [0.75, 0.95].
pub fn confidence(substitutions: &[Substitution]) -> f64 {
    if substitutions.is_empty() {
        return 1.0;
    }
    let n = substitutions.len() as f64;
    let types: BTreeSet<PiiType> = substitutions.iter().map(|s| s.pii_type).collect();
    let profiles: BTreeSet<&str> = substitutions.iter().map(|s| s.profile_id.as_str()).collect();
    let t = types.len() as f64;
    let p = profiles.len() as f64;

    let score = 0.7 + 0.1 * (1.0 - 1.0 / (1.0 + n)) + 0.1 * (t / (t + 1.0)) + 0.05 * (p / (p + 1.0));
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sub(profile: &str, pii_type: PiiType) -> Substitution {
        Substitution {
            from: "x".into(),
            to: "y".into(),
            position: 0,
            end: 1,
            profile_id: profile.into(),
            pii_type,
            possessive: false,
        }
    }

    #[test]
    fn test_confidence_baseline() {
        assert_eq!(confidence(&[]), 1.0);
        let one = confidence(&[sub("a", PiiType::Name)]);
        assert!((one - 0.825).abs() < 1e-9, "{one}");
    }

    #[test]
    fn test_confidence_grows_with_diversity() {
        let same = confidence(&[sub("a", PiiType::Name), sub("a", PiiType::Name)]);
        let diverse = confidence(&[sub("a", PiiType::Name), sub("b", PiiType::Email)]);
        assert!(diverse > same);
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("ENCODE".parse::<Direction>().unwrap(), Direction::Encode);
        assert!("sideways".parse::<Direction>().is_err());
        assert_eq!(Direction::Decode.to_string(), "decode");
    }

    #[test]
    fn test_profiles_matched_groups_by_profile() {
        let subs = vec![
            sub("a", PiiType::Name),
            sub("b", PiiType::Email),
            sub("a", PiiType::Email),
            sub("a", PiiType::Name),
        ];
        let result = SubstitutionResult::from_substitutions("t".into(), subs, |id| {
            if id == "a" {
                Some("Work")
            } else {
                None
            }
        });
        assert_eq!(result.profiles_matched.len(), 2);
        assert_eq!(result.profiles_matched[0].profile_name, "Work");
        assert_eq!(
            result.profiles_matched[0].pii_types,
            vec![PiiType::Name, PiiType::Email]
        );
        assert_eq!(result.profiles_matched[0].matches.len(), 3);
        assert_eq!(result.profiles_matched[1].profile_name, "");
    }

    #[test]
    fn test_failed_open_shape() {
        let r = SubstitutionResult::failed_open("hello", "boom");
        assert_eq!(r.text, "hello");
        assert_eq!(r.count(), 0);
        assert_eq!(r.confidence, 1.0);
        assert!(r.is_failed_open());
    }

    const TYPES: [PiiType; 4] = [PiiType::Name, PiiType::Email, PiiType::Phone, PiiType::Company];

    proptest! {
        #[test]
        fn confidence_bounded_and_monotone(picks in prop::collection::vec((0usize..4, 0usize..3), 1..40)) {
            let subs: Vec<Substitution> = picks
                .iter()
                .map(|(t, p)| sub(&format!("p{}", p), TYPES[*t]))
                .collect();
            for k in 1..=subs.len() {
                let c = confidence(&subs[..k]);
                prop_assert!((0.75..=0.95).contains(&c));
                if k > 1 {
                    prop_assert!(c >= confidence(&subs[..k - 1]));
                }
            }
        }
    }
}
