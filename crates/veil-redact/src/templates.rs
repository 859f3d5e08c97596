//! Built-in rule templates for common PII shapes.
//!
//! Templates that tend to match unrelated numbers ship disabled.

use serde::Serialize;

use crate::error::{RedactionError, Result};
use crate::rule::{CustomRule, RuleCategory};

/// A rule blueprint without identity or usage fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub pattern: &'static str,
    pub replacement: &'static str,
    pub priority: i32,
    pub enabled: bool,
    pub case_sensitive: bool,
    pub category: RuleCategory,
    pub tags: &'static [&'static str],
    pub examples: &'static [&'static str],
}

static RULE_TEMPLATES: &[RuleTemplate] = &[
    // Financial
    RuleTemplate {
        name: "Social Security Number (SSN)",
        description: "Matches US Social Security Numbers (XXX-XX-XXXX)",
        pattern: r"\b\d{3}-\d{2}-\d{4}\b",
        replacement: "[SSN-REDACTED]",
        priority: 90,
        enabled: true,
        case_sensitive: false,
        category: RuleCategory::Financial,
        tags: &["ssn", "social security", "financial"],
        examples: &["123-45-6789", "987-65-4321"],
    },
    RuleTemplate {
        name: "Credit Card Number",
        description: "Matches credit card numbers (4-digit groups)",
        pattern: r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b",
        replacement: "[CARD-REDACTED]",
        priority: 90,
        enabled: true,
        case_sensitive: false,
        category: RuleCategory::Financial,
        tags: &["credit card", "payment", "financial"],
        examples: &["1234 5678 9012 3456", "1234-5678-9012-3456", "1234567890123456"],
    },
    RuleTemplate {
        name: "Bank Account Number",
        description: "Matches US bank account numbers (8-17 digits)",
        pattern: r"\b\d{8,17}\b",
        replacement: "[ACCOUNT-REDACTED]",
        priority: 80,
        enabled: true,
        case_sensitive: false,
        category: RuleCategory::Financial,
        tags: &["bank", "account", "financial"],
        examples: &["12345678", "1234567890123456"],
    },
    RuleTemplate {
        name: "Routing Number",
        description: "Matches US bank routing numbers (9 digits)",
        pattern: r"\b\d{9}\b",
        replacement: "[ROUTING-REDACTED]",
        priority: 75,
        // Overlaps with account numbers.
        enabled: false,
        case_sensitive: false,
        category: RuleCategory::Financial,
        tags: &["routing", "bank", "financial"],
        examples: &["123456789", "987654321"],
    },
    // Medical
    RuleTemplate {
        name: "Medical Record Number (MRN)",
        description: "Matches medical record numbers (MRN followed by 6-10 digits)",
        pattern: r"\bMRN[:\s#-]{0,2}\d{6,10}\b",
        replacement: "[MRN-REDACTED]",
        priority: 85,
        enabled: true,
        case_sensitive: false,
        category: RuleCategory::Medical,
        tags: &["medical", "health", "mrn"],
        examples: &["MRN: 1234567", "MRN#1234567", "MRN-1234567"],
    },
    RuleTemplate {
        name: "Health Insurance ID",
        description: "Matches health insurance member IDs (alphanumeric, 8-15 chars)",
        pattern: r"\b[A-Z0-9]{8,15}\b",
        replacement: "[INSURANCE-REDACTED]",
        priority: 70,
        enabled: false,
        case_sensitive: true,
        category: RuleCategory::Medical,
        tags: &["insurance", "health", "medical"],
        examples: &["ABC12345678", "XYZ987654321"],
    },
    RuleTemplate {
        name: "Prescription Number (Rx)",
        description: "Matches prescription numbers",
        pattern: r"\bRx[:\s#-]{0,2}\d{6,10}\b",
        replacement: "[RX-REDACTED]",
        priority: 80,
        enabled: true,
        case_sensitive: false,
        category: RuleCategory::Medical,
        tags: &["prescription", "rx", "medical"],
        examples: &["Rx: 123456", "Rx#1234567"],
    },
    // Personal
    RuleTemplate {
        name: "Passport Number",
        description: "Matches US passport numbers (9 digits)",
        pattern: r"\b\d{9}\b",
        replacement: "[PASSPORT-REDACTED]",
        priority: 75,
        enabled: false,
        case_sensitive: false,
        category: RuleCategory::Personal,
        tags: &["passport", "travel", "id"],
        examples: &["123456789", "987654321"],
    },
    RuleTemplate {
        name: "Driver License Number",
        description: "Matches driver license numbers (varies by state)",
        pattern: r"\bDL[:\s#-]{0,2}[A-Z0-9]{5,15}\b",
        replacement: "[DL-REDACTED]",
        priority: 85,
        enabled: true,
        case_sensitive: false,
        category: RuleCategory::Personal,
        tags: &["drivers license", "id", "dmv"],
        examples: &["DL: A1234567", "DL#A1234567"],
    },
    RuleTemplate {
        name: "Date of Birth (DOB)",
        description: "Matches dates in MM/DD/YYYY or MM-DD-YYYY format",
        pattern: r"\b(0?[1-9]|1[0-2])[/-](0?[1-9]|[12]\d|3[01])[/-](19|20)\d{2}\b",
        replacement: "[DOB-REDACTED]",
        priority: 80,
        enabled: false,
        case_sensitive: false,
        category: RuleCategory::Personal,
        tags: &["dob", "birthday", "date"],
        examples: &["01/15/1990", "12-31-1985", "3/7/2000"],
    },
    // Corporate
    RuleTemplate {
        name: "Employee ID",
        description: "Matches employee IDs (EMP or EID followed by digits)",
        pattern: r"\b(EMP|EID)[:\s#-]{0,2}\d{4,8}\b",
        replacement: "[EMP-REDACTED]",
        priority: 85,
        enabled: true,
        case_sensitive: false,
        category: RuleCategory::Corporate,
        tags: &["employee", "id", "work"],
        examples: &["EMP: 12345", "EID#123456", "EMP-1234567"],
    },
    RuleTemplate {
        name: "Internal Project Code",
        description: "Matches internal project codes (PROJ followed by alphanumeric)",
        pattern: r"\bPROJ[:\s#-]{0,2}[A-Z0-9]{4,10}\b",
        replacement: "[PROJECT-REDACTED]",
        priority: 75,
        enabled: false,
        case_sensitive: false,
        category: RuleCategory::Corporate,
        tags: &["project", "internal", "work"],
        examples: &["PROJ: ABC123", "PROJ#XYZ789"],
    },
    RuleTemplate {
        name: "Customer ID",
        description: "Matches customer IDs (CUST followed by digits)",
        pattern: r"\bCUST[:\s#-]{0,2}\d{4,10}\b",
        replacement: "[CUSTOMER-REDACTED]",
        priority: 75,
        enabled: false,
        case_sensitive: false,
        category: RuleCategory::Corporate,
        tags: &["customer", "id", "crm"],
        examples: &["CUST: 12345", "CUST#123456"],
    },
    // Utility
    RuleTemplate {
        name: "IPv4 Address",
        description: "Matches IPv4 addresses",
        pattern: r"\b(?:\d{1,3}\.){3}\d{1,3}\b",
        replacement: "[IP-REDACTED]",
        priority: 70,
        enabled: false,
        case_sensitive: false,
        category: RuleCategory::Custom,
        tags: &["ip", "network", "address"],
        examples: &["192.168.1.1", "10.0.0.1"],
    },
    RuleTemplate {
        name: "MAC Address",
        description: "Matches MAC addresses",
        pattern: r"\b(?:[0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}\b",
        replacement: "[MAC-REDACTED]",
        priority: 70,
        enabled: false,
        case_sensitive: false,
        category: RuleCategory::Custom,
        tags: &["mac", "network", "hardware"],
        examples: &["00:1A:2B:3C:4D:5E", "00-1A-2B-3C-4D-5E"],
    },
    RuleTemplate {
        name: "UUID/GUID",
        description: "Matches UUIDs/GUIDs",
        pattern: r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b",
        replacement: "[UUID-REDACTED]",
        priority: 70,
        enabled: false,
        case_sensitive: false,
        category: RuleCategory::Custom,
        tags: &["uuid", "guid", "id"],
        examples: &["550e8400-e29b-41d4-a716-446655440000"],
    },
];

/// Every built-in template.
pub fn templates() -> &'static [RuleTemplate] {
    RULE_TEMPLATES
}

pub fn find_template(name: &str) -> Option<&'static RuleTemplate> {
    RULE_TEMPLATES.iter().find(|t| t.name == name)
}

impl RuleTemplate {
    /// Instantiate the template as a fresh rule with a new id.
    pub fn to_rule(&self) -> CustomRule {
        let id = format!("rule_{}", uuid::Uuid::new_v4().simple());
        let mut rule = CustomRule::new(id, self.name, self.pattern, self.replacement)
            .with_priority(self.priority)
            .with_case_sensitive(self.case_sensitive);
        rule.description = Some(self.description.to_string());
        rule.enabled = self.enabled;
        rule.category = self.category;
        rule.tags = self.tags.iter().map(|t| t.to_string()).collect();
        rule.examples = self.examples.iter().map(|e| e.to_string()).collect();
        rule
    }
}

/// Create a rule from the template with exactly this name.
pub fn create_rule_from_template(name: &str) -> Result<CustomRule> {
    find_template(name)
        .map(RuleTemplate::to_rule)
        .ok_or_else(|| RedactionError::TemplateNotFound(name.to_string()))
}

pub fn templates_by_category(category: RuleCategory) -> Vec<&'static RuleTemplate> {
    RULE_TEMPLATES
        .iter()
        .filter(|t| t.category == category)
        .collect()
}

/// Templates carrying `tag` (case-insensitive, whole tag).
pub fn search_templates_by_tag(tag: &str) -> Vec<&'static RuleTemplate> {
    let tag = tag.trim().to_lowercase();
    RULE_TEMPLATES
        .iter()
        .filter(|t| t.tags.iter().any(|candidate| *candidate == tag))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::compile_pattern;

    #[test]
    fn test_all_templates_are_valid_and_match_their_examples() {
        assert_eq!(templates().len(), 16);
        for template in templates() {
            let regex = compile_pattern(template.pattern, template.case_sensitive)
                .unwrap_or_else(|e| panic!("{}: {}", template.name, e));
            for example in template.examples {
                assert!(
                    regex.is_match(example),
                    "{} does not match its example {}",
                    template.name,
                    example
                );
            }
        }
    }

    #[test]
    fn test_create_rule_from_template() {
        let rule = create_rule_from_template("Social Security Number (SSN)").unwrap();
        assert!(rule.id.starts_with("rule_"));
        assert_eq!(rule.priority, 90);
        assert_eq!(rule.category, RuleCategory::Financial);
        assert_eq!(rule.match_count, 0);
        assert_eq!(rule.examples.len(), 2);

        let other = create_rule_from_template("Social Security Number (SSN)").unwrap();
        assert_ne!(rule.id, other.id);

        assert!(matches!(
            create_rule_from_template("Nope"),
            Err(RedactionError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_disabled_templates_stay_disabled() {
        let rule = create_rule_from_template("Routing Number").unwrap();
        assert!(!rule.enabled);
    }

    #[test]
    fn test_by_category_and_tag() {
        assert_eq!(templates_by_category(RuleCategory::Medical).len(), 3);
        assert_eq!(templates_by_category(RuleCategory::Custom).len(), 3);

        let ids: Vec<_> = search_templates_by_tag("ID").iter().map(|t| t.name).collect();
        assert_eq!(
            ids,
            vec![
                "Passport Number",
                "Driver License Number",
                "Employee ID",
                "Customer ID",
                "UUID/GUID"
            ]
        );
        assert!(search_templates_by_tag("missing").is_empty());
    }
}
