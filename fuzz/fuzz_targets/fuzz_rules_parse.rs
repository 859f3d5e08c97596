//! Fuzz target for custom rule file parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use veil_redact::{detect_conflicts, parse_rules_str};

fuzz_target!(|data: &str| {
    if let Ok(rules) = parse_rules_str(data) {
        let _ = detect_conflicts(&rules);
    }
});
