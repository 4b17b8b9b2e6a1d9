//! Integration tests for fixture data management
//!
//! Each test works on its own temporary directory so the backing documents
//! never collide.

use std::collections::HashSet;

use anyhow::Result;
use tempfile::TempDir;
use webtest_tests::prelude::*;

/// The canonical lifecycle: create, look up, clear
#[tokio::test]
async fn test_widget_lifecycle() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut data = TestDataManager::open(temp_dir.path().join("test_data.json")).await?;

    let widget = data.create_test_data(json!({"name": "Widget"})).await?;
    assert!(widget.contains_key("id"), "created record should carry an id");
    assert_eq!(widget["name"], "Widget");

    assert_eq!(data.get_test_data("name", "Widget"), Some(&widget));

    data.clear().await?;
    assert!(data.get_test_data("name", "Widget").is_none());
    Ok(())
}

/// Missing documents start empty and appear on the first write
#[tokio::test]
async fn test_document_created_lazily() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("nested").join("fixtures").join("data.json");

    let mut data = TestDataManager::open(&path).await?;
    assert!(data.is_empty());
    assert!(!path.exists(), "opening must not create the document");

    data.create_test_data(json!({"name": "first"})).await?;
    assert!(path.exists());

    let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(on_disk, json!([{"id": 1, "name": "first"}]));
    Ok(())
}

/// Generated identifiers are pairwise distinct
#[tokio::test]
async fn test_generated_ids_are_unique() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut data = TestDataManager::open(temp_dir.path().join("data.json")).await?;

    let mut ids = HashSet::new();
    for n in 0..50 {
        let record = data.create_test_data(json!({ "n": n })).await?;
        assert!(ids.insert(record["id"].to_string()), "duplicate id {}", record["id"]);
    }

    assert_eq!(data.len(), 50);
    Ok(())
}

/// Records written by one manager are read back in order by another
#[tokio::test]
async fn test_round_trip_through_new_manager() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("data.json");

    let mut writer = TestDataManager::open(&path).await?;
    let mut created = Vec::new();
    for name in ["A", "B", "C"] {
        created.push(writer.create_test_data(json!({ "name": name, "tags": [name] })).await?);
    }
    drop(writer);

    let reader = TestDataManager::open(&path).await?;
    assert_eq!(reader.records(), created.as_slice());
    Ok(())
}

/// Clearing leaves nothing behind, also for a manager opened afterwards
#[tokio::test]
async fn test_clear_then_reload_is_empty() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("data.json");

    let mut data = TestDataManager::open(&path).await?;
    data.create_test_data(json!({"name": "Widget"})).await?;
    data.create_test_data(json!({"name": "Gadget"})).await?;
    data.clear().await?;

    let reloaded = TestDataManager::open(&path).await?;
    assert!(reloaded.is_empty());
    assert!(reloaded.get_test_data("name", "Widget").is_none());
    Ok(())
}

/// Every cleared document is byte-identical, however it got there
#[tokio::test]
async fn test_cleared_documents_are_identical() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let used = temp_dir.path().join("used.json");
    let fresh = temp_dir.path().join("fresh.json");

    let mut data = TestDataManager::open(&used).await?;
    for n in 0..3 {
        data.create_test_data(json!({ "n": n })).await?;
    }
    data.clear().await?;
    let after_first_clear = std::fs::read(&used)?;

    data.clear().await?;
    assert_eq!(std::fs::read(&used)?, after_first_clear, "clear should be idempotent");

    TestDataManager::open(&fresh).await?.clear().await?;
    assert_eq!(std::fs::read(&fresh)?, after_first_clear);
    Ok(())
}

/// Lookups return the first match, and `None` when nothing matches
#[tokio::test]
async fn test_lookup_semantics() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut data = TestDataManager::open(temp_dir.path().join("data.json")).await?;

    let first = data.create_test_data(json!({"kind": "tool", "name": "hammer"})).await?;
    data.create_test_data(json!({"kind": "tool", "name": "saw"})).await?;
    data.create_test_data(json!({"kind": "part", "name": "bolt"})).await?;

    assert_eq!(data.get_test_data("kind", "tool"), Some(&first));
    assert!(data.get_test_data("kind", "vehicle").is_none());
    assert!(data.get_test_data("missing_key", "tool").is_none());
    assert_eq!(data.find_all("kind", "tool").len(), 2);

    // Lookups compare JSON values, so "1" and 1 differ
    assert!(data.get_test_data("id", "1").is_none());
    assert_eq!(data.get_test_data("id", 1), Some(&first));

    let err = data.require_test_data("kind", "vehicle").unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    Ok(())
}

/// Explicit identifiers are kept as given
#[tokio::test]
async fn test_explicit_identifier() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut data = TestDataManager::open(temp_dir.path().join("data.json")).await?;

    let record = data
        .create_test_data(json!({"name": "Test Resource", "id": "test123", "value": 100}))
        .await?;

    let keys: Vec<&str> = record.keys().map(String::as_str).collect();
    assert_eq!(keys, ["id", "name", "value"]);
    assert_eq!(data.require_test_data("id", "test123")?["value"], 100);
    Ok(())
}

/// Manager settings come from the harness configuration
#[tokio::test]
async fn test_open_from_loaded_config() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let data_file = temp_dir.path().join("configured.json");

    let config = ConfigLoader::new()
        .with_only_path(temp_dir.path())
        .with_env_vars([
            ("WEBTEST__DATA__DATA_FILE", data_file.to_string_lossy().into_owned()),
            ("WEBTEST__DATA__ID_FIELD", "uuid".to_string()),
        ])
        .load()?;

    let mut data = TestDataManager::from_config(&config.data).await?;
    let record = data.create_test_data(json!({"name": "Widget"})).await?;

    assert_eq!(record["uuid"], 1);
    assert!(data_file.exists());
    Ok(())
}
