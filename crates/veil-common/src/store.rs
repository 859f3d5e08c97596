//! Storage collaborator contract.
//!
//! The engines never persist anything themselves. A `ProfileStore` supplies
//! plain profile records and absorbs usage-count updates.

use crate::error::{Error, Result};
use crate::identity::{AiService, PiiType};
use crate::parse::{parse_profiles_str, ProfileFile};
use crate::profile::AliasProfile;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Supplier of profile records and consumer of usage increments.
pub trait ProfileStore: Send + Sync {
    /// Load every stored profile in plain form.
    fn load_profiles(&self) -> Result<Vec<AliasProfile>>;

    /// Persist one usage increment for a profile.
    fn increment_usage(
        &self,
        profile_id: &str,
        service: AiService,
        pii_type: PiiType,
        at_millis: i64,
    ) -> Result<()>;
}

/// Profiles held in memory. Useful for hosts that already hold decrypted
/// records and for tests.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<Vec<AliasProfile>>,
}

impl MemoryProfileStore {
    pub fn new(profiles: Vec<AliasProfile>) -> Self {
        Self {
            profiles: Mutex::new(profiles),
        }
    }

    /// Replace the stored set.
    pub fn replace(&self, profiles: Vec<AliasProfile>) -> Result<()> {
        let mut guard = self.lock()?;
        *guard = profiles;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<AliasProfile>>> {
        self.profiles
            .lock()
            .map_err(|e| Error::StorageUnavailable(format!("lock poisoned: {}", e)))
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load_profiles(&self) -> Result<Vec<AliasProfile>> {
        Ok(self.lock()?.clone())
    }

    fn increment_usage(
        &self,
        profile_id: &str,
        service: AiService,
        pii_type: PiiType,
        at_millis: i64,
    ) -> Result<()> {
        let mut guard = self.lock()?;
        let profile = guard
            .iter_mut()
            .find(|p| p.id == profile_id)
            .ok_or_else(|| Error::ProfileNotFound(profile_id.to_string()))?;
        profile
            .metadata
            .usage_stats
            .record(service, pii_type, at_millis);
        Ok(())
    }
}

/// Profiles in a JSON file (`ProfileFile` shape or a bare array).
///
/// Writers are serialised through a mutex and the file is replaced via a
/// temp file and rename. Records are updated in place as raw JSON so fields
/// this crate does not model survive a rewrite.
#[derive(Debug)]
pub struct JsonProfileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a full profile set, replacing the file.
    pub fn save_profiles(&self, profiles: &[AliasProfile]) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| Error::StorageUnavailable(format!("lock poisoned: {}", e)))?;
        let file = ProfileFile::new(profiles.to_vec());
        write_json_atomic(&self.path, &serde_json::to_value(&file)?)
    }

    fn read_value(&self) -> Result<Value> {
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl ProfileStore for JsonProfileStore {
    fn load_profiles(&self) -> Result<Vec<AliasProfile>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let parsed = parse_profiles_str(&content)?;
        if !parsed.rejected.is_empty() {
            tracing::warn!(
                path = %self.path.display(),
                rejected = parsed.rejected.len(),
                loaded = parsed.profiles.len(),
                "some profile records were rejected"
            );
        }
        Ok(parsed.profiles)
    }

    fn increment_usage(
        &self,
        profile_id: &str,
        service: AiService,
        pii_type: PiiType,
        at_millis: i64,
    ) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| Error::StorageUnavailable(format!("lock poisoned: {}", e)))?;

        let mut doc = self.read_value()?;
        let records = match &mut doc {
            Value::Array(records) => records,
            Value::Object(map) => match map.get_mut("profiles") {
                Some(Value::Array(records)) => records,
                _ => return Err(Error::ProfileNotFound(profile_id.to_string())),
            },
            _ => {
                return Err(Error::Config(
                    "profile document must be an object or an array".to_string(),
                ))
            }
        };

        let slot = records
            .iter_mut()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(profile_id))
            .ok_or_else(|| Error::ProfileNotFound(profile_id.to_string()))?;

        let mut profile: AliasProfile = serde_json::from_value(slot.clone())?;
        profile
            .metadata
            .usage_stats
            .record(service, pii_type, at_millis);

        let updated = serde_json::to_value(&profile.metadata)?;
        if let Value::Object(record) = slot {
            record.insert("metadata".to_string(), updated);
        }

        write_json_atomic(&self.path, &doc)
    }
}

fn write_json_atomic(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let content = serde_json::to_vec_pretty(value)?;
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("profiles.json");
    let tmp_path = path.with_file_name(format!("{}.tmp.{}", file_name, std::process::id()));
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(&content)?;
        let _ = file.sync_all();
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityData;

    fn sample() -> AliasProfile {
        AliasProfile::new(
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
        )
    }

    #[test]
    fn test_memory_store_increment() {
        let store = MemoryProfileStore::new(vec![sample()]);
        store
            .increment_usage("p1", AiService::Claude, PiiType::Name, 42)
            .unwrap();
        let profiles = store.load_profiles().unwrap();
        assert_eq!(profiles[0].metadata.usage_stats.total_substitutions, 1);
        assert_eq!(profiles[0].metadata.usage_stats.last_used, Some(42));
    }

    #[test]
    fn test_memory_store_unknown_profile() {
        let store = MemoryProfileStore::default();
        let err = store
            .increment_usage("nope", AiService::Claude, PiiType::Name, 1)
            .unwrap_err();
        assert!(matches!(err, Error::ProfileNotFound(_)));
    }

    #[test]
    fn test_json_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonProfileStore::new(dir.path().join("absent.json"));
        assert!(store.load_profiles().unwrap().is_empty());
    }
}
