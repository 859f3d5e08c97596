//! Fuzz target for user-supplied rule patterns and replacement templates.
//!
//! Bad patterns are reported, never compiled into a panic.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use veil_redact::{test_rule, CustomRule, RedactionEngine};

#[derive(Debug, Arbitrary)]
struct Input {
    pattern: String,
    replacement: String,
    case_sensitive: bool,
    sample: String,
}

fuzz_target!(|input: Input| {
    let rule = CustomRule::new("fuzz", "Fuzz", input.pattern, input.replacement)
        .with_case_sensitive(input.case_sensitive);
    let _ = test_rule(&rule, &input.sample);

    let mut engine = RedactionEngine::new();
    let _ = engine.apply_rules(&input.sample, std::slice::from_ref(&rule));
});
