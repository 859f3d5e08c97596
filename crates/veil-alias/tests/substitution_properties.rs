//! Property-based tests for substitution invariants.

use proptest::prelude::*;
use veil_alias::{AliasEngine, CaseClass, Direction, SubstituteOptions};
use veil_common::{AliasProfile, IdentityData};

const REAL_NAMES: [&str; 4] = ["John Smith", "Mary Brown", "Peter Quill", "Zoe"];
const ALIAS_NAMES: [&str; 4] = ["Alex Johnson", "Dana Lee", "Kim Park", "Robin Hart"];
const FILLER: [&str; 10] = [
    "hello", "the", "report", "is", "ready,", "please", "ask", "(about", "it)", "today.",
];

fn engine_for(real: &str, alias: &str) -> AliasEngine {
    let profile = AliasProfile::new(
        "p1",
        "prop",
        IdentityData {
            name: Some(real.to_string()),
            ..Default::default()
        },
        IdentityData {
            name: Some(alias.to_string()),
            ..Default::default()
        },
    );
    let engine = AliasEngine::default();
    engine.set_profiles(vec![profile]);
    engine
}

fn render(name: &str, class: u8) -> String {
    match class {
        0 => name.to_uppercase(),
        1 => name.to_lowercase(),
        _ => name.to_string(),
    }
}

fn build_text(name: &str, segments: &[(usize, bool, u8, bool)]) -> String {
    let mut words = Vec::new();
    for (filler, with_name, class, possessive) in segments {
        words.push(FILLER[*filler].to_string());
        if *with_name {
            let mut rendered = render(name, *class);
            if *possessive {
                rendered.push_str("'s");
            }
            words.push(rendered);
        }
    }
    words.join(" ")
}

fn segments() -> impl Strategy<Value = Vec<(usize, bool, u8, bool)>> {
    prop::collection::vec(
        (0..FILLER.len(), any::<bool>(), 0u8..3, any::<bool>()),
        1..20,
    )
}

proptest! {
    #[test]
    fn decode_inverts_encode(real in 0..REAL_NAMES.len(), alias in 0..ALIAS_NAMES.len(), segs in segments()) {
        let engine = engine_for(REAL_NAMES[real], ALIAS_NAMES[alias]);
        let text = build_text(REAL_NAMES[real], &segs);

        let encoded = engine.encode(&text);
        prop_assert!(encoded.error.is_none());
        let expected = segs.iter().filter(|s| s.1).count();
        prop_assert_eq!(encoded.count(), expected);

        let decoded = engine.decode(&encoded.text);
        prop_assert_eq!(decoded.text, text);
    }

    #[test]
    fn encode_never_leaks_real_value(real in 0..REAL_NAMES.len(), alias in 0..ALIAS_NAMES.len(), segs in segments()) {
        let engine = engine_for(REAL_NAMES[real], ALIAS_NAMES[alias]);
        let text = build_text(REAL_NAMES[real], &segs);
        let encoded = engine.encode(&text);
        prop_assert!(!encoded.text.to_lowercase().contains(&REAL_NAMES[real].to_lowercase()));
    }

    #[test]
    fn replacement_keeps_case_class(real in 0..REAL_NAMES.len(), alias in 0..ALIAS_NAMES.len(), class in 0u8..3) {
        let engine = engine_for(REAL_NAMES[real], ALIAS_NAMES[alias]);
        let matched = render(REAL_NAMES[real], class);
        let result = engine.encode(&matched);
        prop_assert_eq!(result.count(), 1);
        prop_assert_eq!(CaseClass::of(&result.text), CaseClass::of(&matched));
    }

    #[test]
    fn detect_only_never_mutates(real in 0..REAL_NAMES.len(), segs in segments()) {
        let engine = engine_for(REAL_NAMES[real], ALIAS_NAMES[0]);
        let text = build_text(REAL_NAMES[real], &segs);
        let result = engine.substitute(&text, Direction::Encode, &SubstituteOptions::detect_only());
        prop_assert_eq!(result.text, text);
    }

    #[test]
    fn arbitrary_text_never_errors(text in ".{0,200}") {
        let engine = engine_for(REAL_NAMES[0], ALIAS_NAMES[0]);
        let encoded = engine.encode(&text);
        prop_assert!(encoded.error.is_none());
        prop_assert!((0.0..=1.0).contains(&encoded.confidence));
        for s in &encoded.substitutions {
            prop_assert!(text.is_char_boundary(s.position));
            prop_assert!(text.is_char_boundary(s.end));
        }
    }
}
