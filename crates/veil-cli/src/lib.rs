//! Veil host library.
//!
//! The `veil` binary is a thin layer over this crate:
//! - `config`: `config.toml` resolution with provenance
//! - `logging`: tracing subscriber setup (stderr only)
//! - `payload`: text segments inside chat request payloads
//! - `pipeline`: substitution, rule and API-key passes over request and
//!   response bodies
//! - `exit_codes`: the process exit contract

pub mod config;
pub mod exit_codes;
pub mod input;
pub mod logging;
pub mod payload;
pub mod pipeline;

pub use config::{load_config, ConfigError, ConfigOptions, ConfigSource, ResolvedConfig, VeilConfig};
pub use exit_codes::ExitCode;
pub use payload::{detect_format, extract_segments, replace_segments, rewrite_segments, PayloadFormat};
pub use pipeline::{KeyPass, Pipeline, RequestReport, ResponseReport};
