//! Identity records and PII field classification.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category of a matched identity field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub enum PiiType {
    /// Full personal name
    Name,
    /// Email address
    Email,
    /// Landline / primary phone
    Phone,
    /// Mobile phone
    CellPhone,
    /// Postal address
    Address,
    /// Employer or organisation
    Company,
    /// Job title
    JobTitle,
    /// User-defined custom field
    Custom,
}

impl PiiType {
    /// The standard identity fields, in lookup-map construction order.
    pub const STANDARD: [PiiType; 7] = [
        PiiType::Name,
        PiiType::Email,
        PiiType::Phone,
        PiiType::CellPhone,
        PiiType::Address,
        PiiType::Company,
        PiiType::JobTitle,
    ];

    /// Parse from the wire name.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "name" => Some(PiiType::Name),
            "email" => Some(PiiType::Email),
            "phone" => Some(PiiType::Phone),
            "cellPhone" | "cell_phone" => Some(PiiType::CellPhone),
            "address" => Some(PiiType::Address),
            "company" => Some(PiiType::Company),
            "jobTitle" | "job_title" => Some(PiiType::JobTitle),
            "custom" => Some(PiiType::Custom),
            _ => None,
        }
    }

    /// Wire name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            PiiType::Name => "name",
            PiiType::Email => "email",
            PiiType::Phone => "phone",
            PiiType::CellPhone => "cellPhone",
            PiiType::Address => "address",
            PiiType::Company => "company",
            PiiType::JobTitle => "jobTitle",
            PiiType::Custom => "custom",
        }
    }
}

impl std::fmt::Display for PiiType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// AI chat service a request or response belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum AiService {
    #[serde(rename = "chatgpt")]
    ChatGpt,
    Claude,
    Gemini,
    Perplexity,
    Poe,
    Copilot,
    You,
    #[default]
    Unknown,
}

impl AiService {
    /// Parse from a service name, case-insensitively.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "chatgpt" | "openai" => Some(AiService::ChatGpt),
            "claude" => Some(AiService::Claude),
            "gemini" => Some(AiService::Gemini),
            "perplexity" => Some(AiService::Perplexity),
            "poe" => Some(AiService::Poe),
            "copilot" => Some(AiService::Copilot),
            "you" => Some(AiService::You),
            "unknown" => Some(AiService::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for AiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AiService::ChatGpt => "chatgpt",
            AiService::Claude => "claude",
            AiService::Gemini => "gemini",
            AiService::Perplexity => "perplexity",
            AiService::Poe => "poe",
            AiService::Copilot => "copilot",
            AiService::You => "you",
            AiService::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for AiService {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AiService::parse_str(s).ok_or_else(|| format!("unknown service: {}", s))
    }
}

/// Identity field values. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentityData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,

    /// Open key/value custom fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, String>,
}

impl IdentityData {
    /// Get a standard field's value, trimmed. Empty values read as absent.
    ///
    /// Always `None` for `PiiType::Custom`; use [`IdentityData::custom_field`].
    pub fn field(&self, pii_type: PiiType) -> Option<&str> {
        let value = match pii_type {
            PiiType::Name => self.name.as_deref(),
            PiiType::Email => self.email.as_deref(),
            PiiType::Phone => self.phone.as_deref(),
            PiiType::CellPhone => self.cell_phone.as_deref(),
            PiiType::Address => self.address.as_deref(),
            PiiType::Company => self.company.as_deref(),
            PiiType::JobTitle => self.job_title.as_deref(),
            PiiType::Custom => None,
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    /// Set a standard field. Setting `Custom` is a no-op.
    pub fn set_field(&mut self, pii_type: PiiType, value: impl Into<String>) {
        let value = Some(value.into());
        match pii_type {
            PiiType::Name => self.name = value,
            PiiType::Email => self.email = value,
            PiiType::Phone => self.phone = value,
            PiiType::CellPhone => self.cell_phone = value,
            PiiType::Address => self.address = value,
            PiiType::Company => self.company = value,
            PiiType::JobTitle => self.job_title = value,
            PiiType::Custom => {}
        }
    }

    /// Get a custom field's value, trimmed. Empty values read as absent.
    pub fn custom_field(&self, key: &str) -> Option<&str> {
        self.custom
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Populated standard fields in construction order.
    pub fn fields(&self) -> impl Iterator<Item = (PiiType, &str)> + '_ {
        PiiType::STANDARD
            .iter()
            .filter_map(move |t| self.field(*t).map(|v| (*t, v)))
    }

    /// Whether no field at all is populated.
    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none() && self.custom.values().all(|v| v.trim().is_empty())
    }
}
