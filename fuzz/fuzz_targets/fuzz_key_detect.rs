//! Fuzz target for API key detection and redaction.

#![no_main]

use libfuzzer_sys::fuzz_target;
use veil_redact::{redact, ApiKeyDetector, DetectOptions, RedactionMode};

fuzz_target!(|data: &str| {
    let detector = ApiKeyDetector::new(DetectOptions {
        include_generic: true,
        ..Default::default()
    });
    let keys = detector.detect(data);
    for key in &keys {
        assert!(data.is_char_boundary(key.start) && data.is_char_boundary(key.end));
    }
    for mode in [RedactionMode::Full, RedactionMode::Partial, RedactionMode::Placeholder] {
        let _ = redact(data, &keys, mode);
    }
});
