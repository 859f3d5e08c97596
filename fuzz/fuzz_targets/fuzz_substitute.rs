//! Fuzz target for alias substitution.
//!
//! Arbitrary identity values and text must never panic. A failed call
//! hands back its input unchanged.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use veil_alias::AliasEngine;
use veil_common::{AliasProfile, IdentityData};

#[derive(Debug, Arbitrary)]
struct Input {
    real_name: String,
    alias_name: String,
    real_email: String,
    alias_email: String,
    text: String,
}

fuzz_target!(|input: Input| {
    let profile = AliasProfile::new(
        "fuzz",
        "Fuzz",
        IdentityData {
            name: Some(input.real_name),
            email: Some(input.real_email),
            ..Default::default()
        },
        IdentityData {
            name: Some(input.alias_name),
            email: Some(input.alias_email),
            ..Default::default()
        },
    );
    let engine = AliasEngine::default();
    engine.set_profiles(vec![profile]);

    let encoded = engine.encode(&input.text);
    let decoded = engine.decode(&encoded.text);
    let _ = engine.find_pii(&input.text);
    assert!(encoded.error.is_none() || encoded.text == input.text);
    assert!(decoded.error.is_none() || decoded.text == encoded.text);
});
