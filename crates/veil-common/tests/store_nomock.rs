//! No-mock integration tests for the JSON profile store.
//!
//! These tests work against real files in a temp directory, covering:
//!
//! - Save and reload of a full profile set
//! - Usage increments persisted across store instances
//! - Concurrent increments from several threads not losing counts
//! - Unmodelled fields surviving a rewrite
//! - Malformed records skipped on load

use std::sync::Arc;
use std::thread;

use tempfile::tempdir;
use veil_common::{
    AiService, AliasProfile, Error, IdentityData, JsonProfileStore, PiiType, ProfileStore,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn profile(id: &str, real: &str, alias: &str) -> AliasProfile {
    AliasProfile::new(
        id,
        format!("{} profile", id),
        IdentityData {
            name: Some(real.to_string()),
            ..Default::default()
        },
        IdentityData {
            name: Some(alias.to_string()),
            ..Default::default()
        },
    )
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn save_then_load_round_trips() {
    let dir = tempdir().unwrap();
    let store = JsonProfileStore::new(dir.path().join("profiles.json"));

    let profiles = vec![
        profile("a", "John Smith", "Alex Johnson"),
        profile("b", "Mary Major", "Jane Roe"),
    ];
    store.save_profiles(&profiles).unwrap();

    let loaded = store.load_profiles().unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].id, "a");
    assert_eq!(loaded[1].alias.name.as_deref(), Some("Jane Roe"));
}

#[test]
fn save_creates_parent_directories() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("profiles.json");
    let store = JsonProfileStore::new(&path);
    store.save_profiles(&[profile("a", "A", "B")]).unwrap();
    assert!(path.exists());
}

#[test]
fn increments_persist_across_instances() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("profiles.json");
    JsonProfileStore::new(&path)
        .save_profiles(&[profile("a", "John Smith", "Alex Johnson")])
        .unwrap();

    {
        let store = JsonProfileStore::new(&path);
        store
            .increment_usage("a", AiService::ChatGpt, PiiType::Name, 1_000)
            .unwrap();
        store
            .increment_usage("a", AiService::Claude, PiiType::Email, 2_000)
            .unwrap();
    }

    let loaded = JsonProfileStore::new(&path).load_profiles().unwrap();
    let stats = &loaded[0].metadata.usage_stats;
    assert_eq!(stats.total_substitutions, 2);
    assert_eq!(stats.by_service[&AiService::ChatGpt], 1);
    assert_eq!(stats.by_pii_type[&PiiType::Email], 1);
    assert_eq!(stats.last_used, Some(2_000));
}

#[test]
fn increment_unknown_profile_errors() {
    let dir = tempdir().unwrap();
    let store = JsonProfileStore::new(dir.path().join("profiles.json"));
    store.save_profiles(&[profile("a", "A", "B")]).unwrap();

    let err = store
        .increment_usage("missing", AiService::Claude, PiiType::Name, 1)
        .unwrap_err();
    assert!(matches!(err, Error::ProfileNotFound(id) if id == "missing"));
}

#[test]
fn increment_without_file_is_io_error() {
    let dir = tempdir().unwrap();
    let store = JsonProfileStore::new(dir.path().join("absent.json"));
    let err = store
        .increment_usage("a", AiService::Claude, PiiType::Name, 1)
        .unwrap_err();
    assert_eq!(err.code(), 60);
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn concurrent_increments_do_not_lose_counts() {
    let dir = tempdir().unwrap();
    let store = Arc::new(JsonProfileStore::new(dir.path().join("profiles.json")));
    store.save_profiles(&[profile("a", "A", "B")]).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..10 {
                    store
                        .increment_usage("a", AiService::Gemini, PiiType::Name, t * 100 + i)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let loaded = store.load_profiles().unwrap();
    assert_eq!(loaded[0].metadata.usage_stats.total_substitutions, 40);
}

// ============================================================================
// Raw document handling
// ============================================================================

#[test]
fn unmodelled_fields_survive_increment() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("profiles.json");
    std::fs::write(
        &path,
        r#"[{"id":"a","real":{"name":"John"},"alias":{"name":"Alex"},"syncToken":"abc"}]"#,
    )
    .unwrap();

    let store = JsonProfileStore::new(&path);
    store
        .increment_usage("a", AiService::Poe, PiiType::Name, 5)
        .unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw[0]["syncToken"], "abc");
    assert_eq!(raw[0]["metadata"]["usageStats"]["totalSubstitutions"], 1);
}

#[test]
fn malformed_records_are_skipped_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("profiles.json");
    std::fs::write(
        &path,
        r#"{"schemaVersion":"2.0.0","profiles":[
            {"id":"a","real":{"name":"John"},"alias":{"name":"Alex"}},
            {"id":"broken","real":"not-an-object","alias":{}}
        ]}"#,
    )
    .unwrap();

    let loaded = JsonProfileStore::new(&path).load_profiles().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, "a");
}
