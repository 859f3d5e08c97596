//! Reading command input and data files.

use crate::exit_codes::ExitCode;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use veil_common::{parse_profiles_str, ParsedProfiles};
use veil_redact::{parse_rules_str, CustomRule};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read stdin: {0}")]
    Stdin(#[source] std::io::Error),

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid profile file {path}: {source}")]
    Profiles {
        path: PathBuf,
        #[source]
        source: veil_common::Error,
    },
}

impl InputError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            InputError::Io { .. } | InputError::Stdin(_) => ExitCode::IoError,
            InputError::Json { .. } => ExitCode::ValidationFailed,
            InputError::Profiles { source, .. } => ExitCode::for_error(source),
        }
    }
}

/// Read a whole input: the file at `path`, or stdin when `path` is `None`
/// or `-`.
pub fn read_input(path: Option<&Path>) -> Result<String, InputError> {
    match path {
        Some(p) if p != Path::new("-") => read_file(p),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(InputError::Stdin)?;
            Ok(buf)
        }
    }
}

fn read_file(path: &Path) -> Result<String, InputError> {
    std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a custom rule file. A missing file is an empty rule set.
pub fn load_rules(path: &Path) -> Result<Vec<CustomRule>, InputError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "rules file not found; no custom rules");
        return Ok(Vec::new());
    }
    let content = read_file(path)?;
    parse_rules_str(&content).map_err(|source| InputError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and parse a profile file, keeping per-record rejections.
pub fn load_profiles(path: &Path) -> Result<ParsedProfiles, InputError> {
    let content = read_file(path)?;
    parse_profiles_str(&content).map_err(|source| InputError::Profiles {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_rules_file_is_empty() {
        let dir = tempdir().unwrap();
        let rules = load_rules(&dir.path().join("none.json")).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_bad_rules_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_rules(&path).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::ValidationFailed);
        assert!(err.to_string().contains("rules.json"));
    }

    #[test]
    fn test_missing_input_file() {
        let err = read_input(Some(Path::new("/nonexistent/input.txt"))).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::IoError);
    }

    #[test]
    fn test_profiles_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        std::fs::write(
            &path,
            r#"[{"id": "p1", "real": {"name": "Jane Roe"}, "alias": {"name": "Kim Lee"}}, {"id": 5}]"#,
        )
        .unwrap();
        let parsed = load_profiles(&path).unwrap();
        assert_eq!(parsed.profiles.len(), 1);
        assert_eq!(parsed.rejected.len(), 1);
        assert_eq!(parsed.rejected[0].index, 1);
    }
}
