//! Profile validation.
//!
//! Errors exclude a profile from the lookup maps; warnings are advisory.

use crate::identity::PiiType;
use crate::profile::AliasProfile;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// A single problem found in a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileIssue {
    pub severity: IssueSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<PiiType>,
    /// Custom field key when `field` is `Custom`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub message: String,
}

impl ProfileIssue {
    fn error(field: Option<PiiType>, message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Error,
            field,
            key: None,
            message: message.into(),
        }
    }

    fn warning(field: Option<PiiType>, message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            field,
            key: None,
            message: message.into(),
        }
    }

    fn with_key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == IssueSeverity::Error
    }
}

/// Check a profile. Messages name fields, never values.
pub fn validate_profile(profile: &AliasProfile) -> Vec<ProfileIssue> {
    let mut issues = Vec::new();

    if profile.id.trim().is_empty() {
        issues.push(ProfileIssue::error(None, "profile id is empty"));
    }

    for pii_type in PiiType::STANDARD {
        let real = profile.real.field(pii_type);
        let alias = profile.alias.field(pii_type);
        match (real, alias) {
            (Some(r), Some(a)) if r.to_lowercase() == a.to_lowercase() => {
                issues.push(ProfileIssue::error(
                    Some(pii_type),
                    format!("real and alias {} are identical", pii_type),
                ));
            }
            (Some(_), None) => {
                issues.push(ProfileIssue::warning(
                    Some(pii_type),
                    format!("real {} has no alias counterpart and will not be replaced", pii_type),
                ));
            }
            _ => {}
        }
    }

    for (key, real) in &profile.real.custom {
        let real = real.trim();
        if real.is_empty() {
            continue;
        }
        match profile.alias.custom_field(key) {
            Some(alias) if alias.to_lowercase() == real.to_lowercase() => {
                issues.push(
                    ProfileIssue::error(
                        Some(PiiType::Custom),
                        "real and alias custom values are identical",
                    )
                    .with_key(key),
                );
            }
            None => {
                issues.push(
                    ProfileIssue::warning(
                        Some(PiiType::Custom),
                        "custom value has no alias counterpart and will not be replaced",
                    )
                    .with_key(key),
                );
            }
            _ => {}
        }
    }

    if let Some(variations) = &profile.variations {
        for pii_type in PiiType::STANDARD.into_iter().chain([PiiType::Custom]) {
            let real: Vec<String> = variations
                .real
                .active(pii_type)
                .iter()
                .map(|v| v.to_lowercase())
                .collect();
            let overlapping = variations
                .alias
                .active(pii_type)
                .iter()
                .filter(|v| real.contains(&v.to_lowercase()))
                .count();
            if overlapping > 0 {
                issues.push(ProfileIssue::warning(
                    Some(pii_type),
                    format!(
                        "{} {} variation(s) appear on both the real and alias side and will be ignored",
                        overlapping, pii_type
                    ),
                ));
            }
        }
    }

    issues
}

/// Whether any issue is an error.
pub fn has_errors(issues: &[ProfileIssue]) -> bool {
    issues.iter().any(ProfileIssue::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityData;
    use crate::profile::{ProfileVariations, VariationSet};

    fn profile(real_name: &str, alias_name: &str) -> AliasProfile {
        AliasProfile::new(
            "p1",
            "test",
            IdentityData {
                name: Some(real_name.into()),
                ..Default::default()
            },
            IdentityData {
                name: Some(alias_name.into()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_clean_profile_has_no_issues() {
        assert!(validate_profile(&profile("John Smith", "Alex Johnson")).is_empty());
    }

    #[test]
    fn test_identical_values_are_errors() {
        let issues = validate_profile(&profile("John Smith", "john smith"));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
        assert_eq!(issues[0].field, Some(PiiType::Name));
        assert!(!issues[0].message.contains("John"));
    }

    #[test]
    fn test_empty_id_is_error() {
        let mut p = profile("A", "B");
        p.id = "  ".into();
        assert!(has_errors(&validate_profile(&p)));
    }

    #[test]
    fn test_missing_alias_is_warning() {
        let mut p = profile("A", "B");
        p.real.email = Some("a@x.com".into());
        p.real.custom.insert("badge".into(), "B-1".into());
        let issues = validate_profile(&p);
        assert_eq!(issues.len(), 2);
        assert!(!has_errors(&issues));
        assert_eq!(issues[1].key.as_deref(), Some("badge"));
    }

    #[test]
    fn test_overlapping_variations_warn() {
        let mut p = profile("Ann Lee", "Ann Kim");
        let mut real = VariationSet::default();
        real.generated
            .insert(PiiType::Name, vec!["Ann Lee".into(), "ann".into()]);
        let mut alias = VariationSet::default();
        alias
            .generated
            .insert(PiiType::Name, vec!["Ann Kim".into(), "Ann".into()]);
        p.variations = Some(ProfileVariations { real, alias });

        let issues = validate_profile(&p);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, IssueSeverity::Warning);
        assert!(issues[0].message.starts_with("1 name"));
    }
}
