//! End-to-end tests against the real filesystem backend.
//!
//! HOME is redirected to a scratch directory under the system temp dir, and
//! the `.config` directory is created up front so the mount probe selects
//! the filesystem backend. Every test in this binary pins HOME to the same
//! value, so the redirect is safe under parallel test execution; individual
//! tests keep to their own document paths.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use confstore::{ConfigStore, FileSystemBackend};
use confstore_core::{Platform, StorageBackend};

/// Redirects HOME to `<temp>/confstore_home_<pid>` and returns the
/// `.config` directory that the mount probe will find.
fn scratch_home() -> PathBuf {
    let home = std::env::temp_dir().join(format!("confstore_home_{}", std::process::id()));
    let config_dir = home.join(".config");
    std::fs::create_dir_all(&config_dir).expect("create scratch config dir");
    std::env::set_var("HOME", &home);
    config_dir
}

fn fs_store() -> ConfigStore {
    // RUST_LOG=debug surfaces the mount decisions while debugging a failure.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .ok();

    ConfigStore::with_backends(
        Some(Arc::new(FileSystemBackend::new()) as Arc<dyn StorageBackend>),
        None,
        Platform::Linux,
    )
}

#[tokio::test]
async fn test_round_trip_on_disk() {
    // Arrange
    let config_dir = scratch_home();
    let store = fs_store();
    let path = format!("confstore-tests/{}/settings.json", Uuid::new_v4());
    let original = json!({
        "theme": "dark",
        "autosave": { "enabled": true, "interval_secs": 30 },
    });

    // Act
    store.save(&original, &path).await.expect("save");
    let restored = store.load(&path).await.expect("load");

    // Assert – value round-trips and the document landed under .config
    assert_eq!(restored, original);
    let on_disk = config_dir.join(&path);
    assert!(on_disk.exists(), "expected document at {on_disk:?}");

    std::fs::remove_file(&on_disk).ok();
}

#[tokio::test]
async fn test_load_of_never_saved_path_yields_blank_object_on_disk() {
    // Arrange
    let config_dir = scratch_home();
    let store = fs_store();
    let path = format!("confstore-tests/{}/fresh.json", Uuid::new_v4());

    // Act
    let value = store.load(&path).await.expect("load");

    // Assert – blank object, and the empty file was materialized
    assert_eq!(value, json!({}));
    let on_disk = config_dir.join(&path);
    assert!(on_disk.exists());
    assert_eq!(std::fs::metadata(&on_disk).unwrap().len(), 0);

    std::fs::remove_file(&on_disk).ok();
}

#[tokio::test]
async fn test_save_creates_intermediate_directories() {
    // Arrange
    let config_dir = scratch_home();
    let store = fs_store();
    let path = format!("confstore-tests/{}/deep/nested/tree/settings.json", Uuid::new_v4());

    // Act
    store.save(&json!({"ok": true}), &path).await.expect("save");

    // Assert
    assert!(config_dir.join(&path).exists());
}

#[tokio::test]
async fn test_saved_document_is_plain_json_on_disk() {
    // Arrange
    let config_dir = scratch_home();
    let store = fs_store();
    let path = format!("confstore-tests/{}/settings.json", Uuid::new_v4());

    // Act
    store.save(&json!({"answer": 42}), &path).await.expect("save");

    // Assert – a human can read the stored file directly
    let raw = std::fs::read_to_string(config_dir.join(&path)).expect("read raw");
    let parsed: serde_json::Value = serde_json::from_str(&raw).expect("valid JSON on disk");
    assert_eq!(parsed, json!({"answer": 42}));
}
