/// Snapshot persistence tests
///
/// Tests that a saved snapshot restores the whole store across a
/// restart: rows, extra bags, counters and soft-delete state.
/// Run with: cargo test --test snapshot_persistence_tests

use branchdesk::engine::ListFilter;
use branchdesk::{AppConfig, BackOffice, EngineError};
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

type JsonMap = serde_json::Map<String, serde_json::Value>;

fn payload(value: serde_json::Value) -> JsonMap {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("test payload must be an object"),
    }
}

async fn engine_at(path: &PathBuf) -> BackOffice {
    let config = AppConfig::default().snapshot_path(path.clone());
    BackOffice::bootstrap(config).await.unwrap()
}

#[tokio::test]
async fn test_restart_restores_rows_and_extra_bags() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("office.snapshot");

    {
        let engine = engine_at(&path).await;
        engine
            .create(
                "staff",
                &payload(json!({
                    "name": "Asha",
                    "contact1": "9876543210",
                    "adharno": "1234 5678 9012",
                    "old_employee_no": "E-204",
                })),
            )
            .await
            .unwrap();
        engine
            .create("client", &payload(json!({ "name": "Banu", "dob": "25/03/1990" })))
            .await
            .unwrap();
        engine.save_snapshot().await.unwrap();
    }

    let engine = engine_at(&path).await;
    let staff = engine.list("staff", ListFilter::default()).await.unwrap();
    assert_eq!(staff.records.len(), 1);
    assert_eq!(staff.records[0]["name"], "Asha");
    assert_eq!(staff.records[0]["staffcode"], "STF001");
    assert_eq!(staff.records[0]["extra_data"]["old_employee_no"], "E-204");

    let clients = engine.list("client", ListFilter::default()).await.unwrap();
    assert_eq!(clients.records[0]["dob"], "1990-03-25");
}

#[tokio::test]
async fn test_restart_continues_ids_and_codes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("office.snapshot");

    {
        let engine = engine_at(&path).await;
        engine
            .create(
                "staff",
                &payload(json!({
                    "name": "Asha",
                    "staffcode": "STF031",
                    "contact1": "9876543210",
                    "adharno": "1234 5678 9012",
                })),
            )
            .await
            .unwrap();
        engine.save_snapshot().await.unwrap();
    }

    let engine = engine_at(&path).await;
    assert_eq!(engine.next_code("staff").await.unwrap(), "STF032");

    let created = engine
        .create(
            "staff",
            &payload(json!({ "name": "Banu", "contact1": "9876543211", "adharno": "2222 3333 4444" })),
        )
        .await
        .unwrap();
    assert_eq!(created.id, 2, "ids continue above restored rows");
    assert_eq!(created.code.as_deref(), Some("STF032"));
}

#[tokio::test]
async fn test_soft_delete_state_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("office.snapshot");

    {
        let engine = engine_at(&path).await;
        let client = engine
            .create("client", &payload(json!({ "name": "Asha" })))
            .await
            .unwrap();
        let posting = engine
            .create("posting", &payload(json!({ "debit": 100 })))
            .await
            .unwrap();
        let admin = engine.identities().get("admin").await.unwrap();
        engine.delete("client", client.id, &admin).await.unwrap();
        engine.delete("posting", posting.id, &admin).await.unwrap();
        engine.save_snapshot().await.unwrap();
    }

    let engine = engine_at(&path).await;
    let clients = engine.list("client", ListFilter::default()).await.unwrap();
    assert_eq!(clients.records[0]["status"], "inactive");

    let postings = engine.list("posting", ListFilter::default()).await.unwrap();
    assert_eq!(postings.records[0]["extra_data"]["deleted"], true);
}

#[tokio::test]
async fn test_unprovisioned_tables_are_skipped_on_restore() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("office.snapshot");

    {
        let engine = engine_at(&path).await;
        engine
            .create("client", &payload(json!({ "name": "Asha" })))
            .await
            .unwrap();
        engine
            .create("village", &payload(json!({ "vname": "Kotturu" })))
            .await
            .unwrap();
        engine.save_snapshot().await.unwrap();
    }

    // the next deployment lags a migration; its snapshot still loads
    let config = AppConfig::default()
        .snapshot_path(path.clone())
        .skip_table("village");
    let engine = BackOffice::bootstrap(config).await.unwrap();

    let clients = engine.list("client", ListFilter::default()).await.unwrap();
    assert_eq!(clients.records.len(), 1);

    let err = engine.list("village", ListFilter::default()).await.unwrap_err();
    assert!(matches!(err, EngineError::TableMissing(_)));
}

#[tokio::test]
async fn test_corrupt_snapshot_fails_bootstrap() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("office.snapshot");
    std::fs::write(&path, b"not a snapshot").unwrap();

    let config = AppConfig::default().snapshot_path(path);
    let err = BackOffice::bootstrap(config).await.unwrap_err();
    assert!(matches!(err, EngineError::Snapshot(_)));
}

#[tokio::test]
async fn test_save_without_a_configured_path_errors() {
    let engine = BackOffice::bootstrap(AppConfig::default()).await.unwrap();
    let err = engine.save_snapshot().await.unwrap_err();
    assert!(matches!(err, EngineError::Snapshot(_)));
    assert!(err.to_string().contains("No snapshot path"));
}

#[tokio::test]
async fn test_missing_snapshot_file_is_a_clean_first_boot() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("never-written.snapshot");

    // no file yet: bootstrap proceeds with empty tables
    let engine = engine_at(&path).await;
    let page = engine.list("client", ListFilter::default()).await.unwrap();
    assert!(page.records.is_empty());
}
