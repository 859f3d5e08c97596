//! Request/response processing.
//!
//! A [`Pipeline`] is the host side of the engines: it opens a chat payload,
//! runs every text segment through alias substitution, the custom-rule pass
//! and the API-key pass, and writes the segments back.
//!
//! Outbound order per segment:
//! 1. real → alias substitution
//! 2. custom rules (when enabled)
//! 3. API-key detection, handled per [`VaultMode`]
//!
//! Processing never fails: any fault returns the body unchanged with the
//! error recorded on the report.

use crate::config::VeilConfig;
use crate::payload::{detect_format, rewrite_segments, PayloadFormat};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use veil_alias::{AliasEngine, Direction, SubstituteOptions, SubstitutionResult};
use veil_common::AiService;
use veil_redact::{
    redact, ApiKeyDetector, CustomRule, KeyFormat, RedactionEngine, RedactionMode, VaultMode,
};

/// API-key pass settings.
#[derive(Debug, Clone)]
pub struct KeyPass {
    pub detector: ApiKeyDetector,
    pub mode: VaultMode,
    pub redaction: RedactionMode,
}

/// Outcome of [`Pipeline::process_request`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestReport {
    /// Body to send.
    pub body: String,
    /// `None` for non-JSON bodies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<PayloadFormat>,
    pub segments: usize,
    pub substitutions: usize,
    /// Profiles that contributed at least one substitution.
    pub profiles_matched: Vec<String>,
    pub rule_matches: usize,
    pub rules_applied: Vec<String>,
    pub keys_detected: usize,
    pub key_formats: Vec<KeyFormat>,
    pub keys_redacted: usize,
    /// Keys were found in warn-first mode; `body` is the original.
    pub needs_warning: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RequestReport {
    fn unchanged(body: &str, format: Option<PayloadFormat>) -> Self {
        Self {
            body: body.to_string(),
            format,
            segments: 0,
            substitutions: 0,
            profiles_matched: Vec::new(),
            rule_matches: 0,
            rules_applied: Vec::new(),
            keys_detected: 0,
            key_formats: Vec::new(),
            keys_redacted: 0,
            needs_warning: false,
            error: None,
        }
    }

    /// Whether anything sensitive was seen.
    pub fn found_anything(&self) -> bool {
        self.substitutions > 0 || self.rule_matches > 0 || self.keys_detected > 0
    }
}

/// Outcome of [`Pipeline::process_response`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseReport {
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<PayloadFormat>,
    pub substitutions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-segment result of the outbound passes.
struct SegmentOutcome {
    text: String,
    substitution: SubstitutionResult,
    rule_matches: usize,
    rules_applied: Vec<String>,
    keys: Vec<KeyFormat>,
    keys_redacted: usize,
}

pub struct Pipeline {
    engine: Arc<AliasEngine>,
    rules: Vec<CustomRule>,
    rule_engine: Mutex<RedactionEngine>,
    keys: Option<KeyPass>,
    decode_responses: bool,
    record_usage: bool,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("engine", &self.engine)
            .field("rules", &self.rules.len())
            .field("keys", &self.keys.as_ref().map(|k| k.mode))
            .field("decode_responses", &self.decode_responses)
            .field("record_usage", &self.record_usage)
            .finish()
    }
}

impl Pipeline {
    /// Pipeline with substitution only.
    pub fn new(engine: Arc<AliasEngine>) -> Self {
        Self {
            engine,
            rules: Vec::new(),
            rule_engine: Mutex::new(RedactionEngine::new()),
            keys: None,
            decode_responses: true,
            record_usage: false,
        }
    }

    /// Pipeline configured from a resolved `config.toml`. `rules` are only
    /// used when the rule pass is enabled.
    pub fn from_config(engine: Arc<AliasEngine>, config: &VeilConfig, rules: Vec<CustomRule>) -> Self {
        let mut pipeline = Self::new(engine).with_decode_responses(config.decode_responses);
        if config.rules.enabled {
            pipeline = pipeline.with_rules(rules);
        }
        if config.api_keys.enabled {
            let detector = ApiKeyDetector::new(config.api_keys.detect_options());
            for rejected in detector.rejected_patterns() {
                tracing::warn!(reason = %rejected.reason, "custom key pattern skipped");
            }
            pipeline = pipeline.with_keys(KeyPass {
                detector,
                mode: config.api_keys.mode,
                redaction: config.api_keys.redaction,
            });
        }
        pipeline
    }

    pub fn with_rules(mut self, rules: Vec<CustomRule>) -> Self {
        if let Ok(engine) = self.rule_engine.get_mut() {
            let report = engine.compile_rules(&rules);
            for rejection in &report.rejected {
                tracing::warn!(
                    rule_id = %rejection.rule_id,
                    issue = rejection.issue.kind(),
                    "custom rule skipped"
                );
            }
        }
        self.rules = rules;
        self
    }

    pub fn with_keys(mut self, keys: KeyPass) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn with_decode_responses(mut self, enabled: bool) -> Self {
        self.decode_responses = enabled;
        self
    }

    /// Forward usage increments to the engine's store after each request.
    pub fn with_usage_recording(mut self, enabled: bool) -> Self {
        self.record_usage = enabled;
        self
    }

    pub fn engine(&self) -> &AliasEngine {
        &self.engine
    }

    /// Rewrite an outbound request body.
    pub fn process_request(&self, body: &str, service: AiService) -> RequestReport {
        if body.trim().is_empty() {
            return RequestReport::unchanged(body, None);
        }

        let Ok(payload) = serde_json::from_str::<Value>(body) else {
            tracing::debug!(len = body.len(), "non-JSON request body; plain text pass");
            return self.process_plain_request(body, service);
        };

        let format = detect_format(&payload);
        let mut outcomes = Vec::new();
        let mut first_error = None;
        let rewritten = rewrite_segments(&payload, |segment| {
            let outcome = self.process_segment(segment, service);
            if let Some(e) = &outcome.substitution.error {
                first_error.get_or_insert_with(|| e.clone());
            }
            let text = outcome.text.clone();
            outcomes.push(outcome);
            text
        });

        let mut report = self.summarize(body, Some(format), &outcomes);
        report.error = first_error;
        if outcomes.is_empty() {
            tracing::debug!(%format, "no text segments in request");
            return report;
        }
        if report.needs_warning {
            return report;
        }
        if rewritten != payload {
            match serde_json::to_string(&rewritten) {
                Ok(body) => report.body = body,
                Err(e) => {
                    tracing::warn!(error = %e, "request re-serialization failed; sending original");
                    let mut failed = RequestReport::unchanged(body, Some(format));
                    failed.error = Some(e.to_string());
                    return failed;
                }
            }
        }
        self.record(&outcomes, service);
        report
    }

    fn process_plain_request(&self, body: &str, service: AiService) -> RequestReport {
        let outcome = self.process_segment(body, service);
        let mut report = self.summarize(body, None, std::slice::from_ref(&outcome));
        report.error = outcome.substitution.error.clone();
        if !report.needs_warning {
            report.body = outcome.text.clone();
            self.record(std::slice::from_ref(&outcome), service);
        }
        report
    }

    fn process_segment(&self, segment: &str, service: AiService) -> SegmentOutcome {
        let substitution = self.substitute(segment, Direction::Encode, service);
        let mut text = substitution.text.clone();

        let mut rule_matches = 0;
        let mut rules_applied = Vec::new();
        if !self.rules.is_empty() {
            match self.rule_engine.lock() {
                Ok(mut engine) => {
                    let result = engine.apply_rules(&text, &self.rules);
                    rule_matches = result.count();
                    rules_applied = result.rules_applied;
                    text = result.text;
                }
                Err(_) => tracing::warn!("rule engine unavailable; rule pass skipped"),
            }
        }

        let mut keys = Vec::new();
        let mut keys_redacted = 0;
        if let Some(pass) = &self.keys {
            let found = pass.detector.detect(&text);
            keys = found.iter().map(|k| k.format).collect();
            if !found.is_empty() {
                tracing::info!(
                    count = found.len(),
                    mode = ?pass.mode,
                    "API keys detected"
                );
            }
            if pass.mode.redacts() && !found.is_empty() {
                text = redact(&text, &found, pass.redaction);
                keys_redacted = found.len();
            }
        }

        SegmentOutcome {
            text,
            substitution,
            rule_matches,
            rules_applied,
            keys,
            keys_redacted,
        }
    }

    fn substitute(&self, text: &str, direction: Direction, service: AiService) -> SubstitutionResult {
        let active: Vec<String> = self
            .engine
            .get_profiles()
            .into_iter()
            .filter(|p| p.is_active_for(service))
            .map(|p| p.id)
            .collect();
        self.engine
            .substitute(text, direction, &SubstituteOptions::for_profiles(active))
    }

    fn summarize(
        &self,
        body: &str,
        format: Option<PayloadFormat>,
        outcomes: &[SegmentOutcome],
    ) -> RequestReport {
        let mut report = RequestReport::unchanged(body, format);
        report.segments = outcomes.len();
        for outcome in outcomes {
            report.substitutions += outcome.substitution.count();
            for pm in &outcome.substitution.profiles_matched {
                if !report.profiles_matched.contains(&pm.profile_id) {
                    report.profiles_matched.push(pm.profile_id.clone());
                }
            }
            report.rule_matches += outcome.rule_matches;
            for id in &outcome.rules_applied {
                if !report.rules_applied.contains(id) {
                    report.rules_applied.push(id.clone());
                }
            }
            report.keys_detected += outcome.keys.len();
            for format in &outcome.keys {
                if !report.key_formats.contains(format) {
                    report.key_formats.push(*format);
                }
            }
            report.keys_redacted += outcome.keys_redacted;
        }
        report.needs_warning = report.keys_detected > 0
            && self
                .keys
                .as_ref()
                .is_some_and(|k| k.mode == VaultMode::WarnFirst);
        report
    }

    fn record(&self, outcomes: &[SegmentOutcome], service: AiService) {
        if !self.record_usage {
            return;
        }
        for outcome in outcomes {
            self.engine.record_usage(&outcome.substitution, service);
        }
    }

    /// Rewrite an inbound response body (alias → real). No rule or key
    /// pass runs on responses.
    pub fn process_response(&self, body: &str, service: AiService) -> ResponseReport {
        let unchanged = |format: Option<PayloadFormat>| ResponseReport {
            body: body.to_string(),
            format,
            substitutions: 0,
            error: None,
        };
        if body.is_empty() || !self.decode_responses {
            return unchanged(None);
        }

        let payload = serde_json::from_str::<Value>(body)
            .ok()
            .filter(|p| detect_format(p) != PayloadFormat::Unknown);
        let Some(payload) = payload else {
            let result = self.substitute(body, Direction::Decode, service);
            return ResponseReport {
                substitutions: result.count(),
                body: result.text,
                format: None,
                error: result.error,
            };
        };

        let format = detect_format(&payload);
        let mut substitutions = 0;
        let mut error = None;
        let rewritten = rewrite_segments(&payload, |segment| {
            let result = self.substitute(segment, Direction::Decode, service);
            substitutions += result.count();
            if result.error.is_some() {
                error = result.error.clone();
            }
            result.text
        });
        if substitutions == 0 {
            return ResponseReport {
                error,
                ..unchanged(Some(format))
            };
        }
        match serde_json::to_string(&rewritten) {
            Ok(body) => ResponseReport {
                body,
                format: Some(format),
                substitutions,
                error,
            },
            Err(e) => ResponseReport {
                error: Some(e.to_string()),
                ..unchanged(Some(format))
            },
        }
    }
}
