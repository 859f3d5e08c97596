//! Veil common types, errors and storage contracts.
//!
//! This crate provides the foundational types shared by the substitution and
//! redaction crates:
//! - Identity records and the real/alias profile model
//! - PII field and AI service classifications
//! - Boundary parsing and validation of profile records
//! - The storage collaborator contract (`ProfileStore`)
//! - The unified error type

pub mod error;
pub mod identity;
pub mod parse;
pub mod profile;
pub mod store;
pub mod validate;

pub use error::{Error, ErrorCategory, Result};
pub use identity::{AiService, IdentityData, PiiType};
pub use parse::{parse_profiles, parse_profiles_str, ParsedProfiles, ProfileFile, RejectedRecord};
pub use profile::{
    AliasProfile, CustomVariation, ProfileMetadata, ProfileSettings, ProfileVariations,
    UsageStats, VariationSet,
};
pub use store::{JsonProfileStore, MemoryProfileStore, ProfileStore};
pub use validate::{has_errors, validate_profile, IssueSeverity, ProfileIssue};

/// Schema version written into profile files.
pub const PROFILE_SCHEMA_VERSION: &str = "2.0.0";

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
