//! Bidirectional alias substitution for Veil.
//!
//! This crate rewrites free text between a user's real identity values and
//! their pseudonymous aliases, in both directions, before text leaves the
//! machine and after responses come back.
//!
//! # Key Features
//!
//! - **Single-pass matching**: every lookup key of a direction is compiled
//!   into one Aho-Corasick automaton at rebuild time.
//! - **Whole-word, longest-first**: "Ann" never matches inside "Anna", and
//!   "Ann Smith" wins over "Ann" at the same position.
//! - **Case preservation**: ALL-CAPS, Title-Case and lower-case spans get
//!   their replacement rendered in the same class.
//! - **Fail-open**: `substitute` never errors; faults return the input
//!   unchanged with the error recorded on the result.
//!
//! # Example
//!
//! ```
//! use veil_alias::AliasEngine;
//! use veil_common::{AliasProfile, IdentityData};
//!
//! let real = IdentityData { name: Some("John Smith".into()), ..Default::default() };
//! let alias = IdentityData { name: Some("Alex Johnson".into()), ..Default::default() };
//!
//! let engine = AliasEngine::default();
//! engine.set_profiles(vec![AliasProfile::new("p1", "Work", real, alias)]);
//!
//! let out = engine.encode("Ask JOHN SMITH about it");
//! assert_eq!(out.text, "Ask ALEX JOHNSON about it");
//! ```

pub mod case;
pub mod config;
pub mod engine;
pub mod index;
pub mod result;
pub mod variations;

pub use case::{fold, preserve_case, CaseClass};
pub use config::{EngineConfig, DEFAULT_MAX_TEXT_BYTES};
pub use engine::{AliasEngine, EngineStatus};
pub use index::{LookupMaps, Mapping};
pub use result::{
    confidence, Direction, MatchRecord, PiiMatch, ProfileMatch, SubstituteMode,
    SubstituteOptions, Substitution, SubstitutionResult,
};
pub use variations::{
    build_profile_variations, contains_variation, find_variations, generate_email_variations,
    generate_field_variations, generate_generic_variations, generate_identity_variations,
    generate_name_variations, generate_phone_variations, variation_overlaps, variation_stats,
    VariationStats,
};
