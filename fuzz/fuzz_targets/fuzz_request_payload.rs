//! Fuzz target for request body processing.
//!
//! Any body, JSON or not, comes back as a body; the pipeline fails open.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::Arc;
use veil_alias::AliasEngine;
use veil_cli::{Pipeline, VeilConfig};
use veil_common::{AiService, AliasProfile, IdentityData};

fuzz_target!(|data: &str| {
    let engine = AliasEngine::default();
    engine.set_profiles(vec![AliasProfile::new(
        "p1",
        "Work",
        IdentityData {
            name: Some("John Smith".into()),
            ..Default::default()
        },
        IdentityData {
            name: Some("Alex Johnson".into()),
            ..Default::default()
        },
    )]);
    let pipeline = Pipeline::from_config(Arc::new(engine), &VeilConfig::default(), Vec::new());
    let report = pipeline.process_request(data, AiService::ChatGpt);
    if !report.found_anything() {
        assert_eq!(report.body, data);
    }
    let _ = pipeline.process_response(&report.body, AiService::ChatGpt);
});
