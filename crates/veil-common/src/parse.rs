//! Boundary parsing of profile records.
//!
//! The storage collaborator hands over loosely typed JSON. Each record is
//! parsed on its own so one malformed entry does not sink the rest.

use crate::error::{Error, Result};
use crate::profile::AliasProfile;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// On-disk profile file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFile {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default)]
    pub profiles: Vec<AliasProfile>,
}

impl ProfileFile {
    pub fn new(profiles: Vec<AliasProfile>) -> Self {
        Self {
            schema_version: default_schema_version(),
            profiles,
        }
    }
}

fn default_schema_version() -> String {
    crate::PROFILE_SCHEMA_VERSION.to_string()
}

/// A record that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRecord {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub reason: String,
}

impl RejectedRecord {
    pub fn to_error(&self) -> Error {
        Error::MalformedRecord {
            index: self.index,
            reason: self.reason.clone(),
        }
    }
}

/// Outcome of parsing a profile document.
#[derive(Debug, Clone, Default)]
pub struct ParsedProfiles {
    pub schema_version: Option<String>,
    pub profiles: Vec<AliasProfile>,
    pub rejected: Vec<RejectedRecord>,
}

/// Parse a profile document from text.
pub fn parse_profiles_str(input: &str) -> Result<ParsedProfiles> {
    if input.trim().is_empty() {
        return Ok(ParsedProfiles::default());
    }
    let value: Value = serde_json::from_str(input)?;
    parse_profiles(value)
}

/// Parse a profile document: `{"schemaVersion", "profiles": [...]}` or a bare array.
pub fn parse_profiles(value: Value) -> Result<ParsedProfiles> {
    let (schema_version, records) = match value {
        Value::Array(records) => (None, records),
        Value::Object(mut map) => {
            let schema_version = map
                .get("schemaVersion")
                .and_then(Value::as_str)
                .map(str::to_string);
            let records = match map.remove("profiles") {
                Some(Value::Array(records)) => records,
                Some(Value::Null) | None => Vec::new(),
                Some(_) => {
                    return Err(Error::Config(
                        "\"profiles\" must be an array of profile records".to_string(),
                    ))
                }
            };
            (schema_version, records)
        }
        _ => {
            return Err(Error::Config(
                "profile document must be an object or an array".to_string(),
            ))
        }
    };

    let mut parsed = ParsedProfiles {
        schema_version,
        ..ParsedProfiles::default()
    };

    for (index, record) in records.into_iter().enumerate() {
        let id = record.get("id").and_then(Value::as_str).map(str::to_string);
        if !record.is_object() {
            parsed.rejected.push(RejectedRecord {
                index,
                id,
                reason: "record is not an object".to_string(),
            });
            continue;
        }
        match serde_json::from_value::<AliasProfile>(record) {
            Ok(profile) => parsed.profiles.push(profile),
            Err(e) => {
                tracing::warn!(index, id = ?id, error = %e, "rejecting malformed profile record");
                parsed.rejected.push(RejectedRecord {
                    index,
                    id,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(parsed)
}
