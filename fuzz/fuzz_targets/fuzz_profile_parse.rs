//! Fuzz target for profile document parsing.
//!
//! Malformed documents return an error; malformed records are rejected
//! individually. Neither may panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use veil_common::{parse_profiles_str, validate_profile};

fuzz_target!(|data: &str| {
    if let Ok(parsed) = parse_profiles_str(data) {
        for profile in &parsed.profiles {
            let _ = validate_profile(profile);
        }
    }
});
