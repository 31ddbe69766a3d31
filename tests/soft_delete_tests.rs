/// Delete policy tests
///
/// Tests for the delete ladder: referential blocking, status flip,
/// extra-bag flagging, hard removal and the missing-table degradation.
/// Run with: cargo test --test soft_delete_tests

use branchdesk::auth::Identity;
use branchdesk::engine::ListFilter;
use branchdesk::store::Store;
use branchdesk::{AppConfig, BackOffice, DeleteOutcome, EngineError, FieldValue, REGISTRY};
use serde_json::json;
use std::collections::BTreeMap;

type JsonMap = serde_json::Map<String, serde_json::Value>;

fn payload(value: serde_json::Value) -> JsonMap {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("test payload must be an object"),
    }
}

async fn engine() -> BackOffice {
    BackOffice::bootstrap(AppConfig::default()).await.unwrap()
}

async fn admin(engine: &BackOffice) -> Identity {
    engine.identities().get("admin").await.unwrap()
}

#[tokio::test]
async fn test_status_entity_flips_to_inactive() {
    let engine = engine().await;
    let created = engine
        .create("client", &payload(json!({ "name": "Asha" })))
        .await
        .unwrap();

    let admin = admin(&engine).await;
    let outcome = engine.delete("client", created.id, &admin).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::SoftDeleted);

    // the row stays listable, only the active filter hides it
    let page = engine.list("client", ListFilter::default()).await.unwrap();
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0]["status"], "inactive");

    let page = engine
        .list("client", ListFilter { active_only: true, hide_deleted: false })
        .await
        .unwrap();
    assert!(page.records.is_empty());
}

#[tokio::test]
async fn test_statusless_entity_gets_extra_bag_flag() {
    let engine = engine().await;
    let created = engine
        .create("posting", &payload(json!({ "debit": 500 })))
        .await
        .unwrap();

    let admin = admin(&engine).await;
    let outcome = engine.delete("posting", created.id, &admin).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Flagged);

    let page = engine.list("posting", ListFilter::default()).await.unwrap();
    assert_eq!(page.records[0]["extra_data"]["deleted"], true);

    let page = engine
        .list("posting", ListFilter { active_only: false, hide_deleted: true })
        .await
        .unwrap();
    assert!(page.records.is_empty());
}

#[tokio::test]
async fn test_bare_entity_is_really_removed() {
    let engine = engine().await;
    let created = engine
        .create(
            "column",
            &payload(json!({ "module": "staff", "field_name": "blood_group" })),
        )
        .await
        .unwrap();

    let admin = admin(&engine).await;
    let outcome = engine.delete("column", created.id, &admin).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::HardDeleted);

    let page = engine.list("column", ListFilter::default()).await.unwrap();
    assert!(page.records.is_empty());

    let err = engine.delete("column", created.id, &admin).await.unwrap_err();
    assert!(matches!(err, EngineError::RecordNotFound { .. }));
}

#[tokio::test]
async fn test_referenced_record_blocks_every_delete_path() {
    let engine = engine().await;
    let voucher = engine
        .create("voucher", &payload(json!({ "narration": "Cash receipt" })))
        .await
        .unwrap();
    engine
        .create("posting", &payload(json!({ "voucher": voucher.id, "debit": 250 })))
        .await
        .unwrap();

    let admin = admin(&engine).await;
    let err = engine.delete("voucher", voucher.id, &admin).await.unwrap_err();
    match &err {
        EngineError::Conflict(message) => {
            assert!(message.contains("posting.voucher"), "got: {}", message);
        }
        other => panic!("expected conflict, got {:?}", other),
    }

    // the block happens before the soft path, so the voucher is untouched
    let page = engine.list("voucher", ListFilter::default()).await.unwrap();
    assert_eq!(page.records[0]["status"], "active");
    assert!(page.records[0]["extra_data"].get("deleted").is_none());
}

#[tokio::test]
async fn test_account_head_hierarchy_restricts_parent_delete() {
    let engine = engine().await;
    let parent = engine
        .create("accounthead", &payload(json!({ "name": "Assets" })))
        .await
        .unwrap();
    engine
        .create(
            "accounthead",
            &payload(json!({ "name": "Cash in Hand", "parent": parent.id })),
        )
        .await
        .unwrap();

    let admin = admin(&engine).await;
    let err = engine.delete("accounthead", parent.id, &admin).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
    assert!(err.to_string().contains("accounthead.parent"));
}

#[tokio::test]
async fn test_delete_after_referrer_removed_succeeds() {
    let engine = engine().await;
    let voucher = engine
        .create("voucher", &payload(json!({ "narration": "Cash receipt" })))
        .await
        .unwrap();
    let posting = engine
        .create("posting", &payload(json!({ "voucher": voucher.id, "debit": 250 })))
        .await
        .unwrap();

    let admin = admin(&engine).await;
    assert!(engine.delete("voucher", voucher.id, &admin).await.is_err());

    // flagging the posting is not enough; the row still points at the voucher
    engine.delete("posting", posting.id, &admin).await.unwrap();
    let err = engine.delete("voucher", voucher.id, &admin).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // clearing the reference releases the block
    engine
        .update("posting", posting.id, &payload(json!({ "debit": 250 })))
        .await
        .unwrap();
    let outcome = engine.delete("voucher", voucher.id, &admin).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::SoftDeleted);
}

#[tokio::test]
async fn test_missing_table_degrades_for_migration_entities() {
    let config = AppConfig::default().skip_table("appointment");
    let engine = BackOffice::bootstrap(config).await.unwrap();
    let admin = admin(&engine).await;

    let outcome = engine.delete("appointment", 7, &admin).await.unwrap();
    match outcome {
        DeleteOutcome::MigrationsNeeded { note } => {
            assert!(note.contains("Run migrations"), "got: {}", note);
        }
        other => panic!("expected migrations note, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_table_stays_an_error_elsewhere() {
    let config = AppConfig::default().skip_table("village");
    let engine = BackOffice::bootstrap(config).await.unwrap();
    let admin = admin(&engine).await;

    let err = engine.delete("village", 1, &admin).await.unwrap_err();
    assert!(matches!(err, EngineError::TableMissing(_)));
}

#[tokio::test]
async fn test_hard_removal_clears_loose_references() {
    // exercised at the store layer: hard removal is followed by a
    // set-null fixup over every loose (non-restricting) referrer
    let store = Store::provision(&REGISTRY, &[]);
    let group_desc = REGISTRY.get("group").unwrap();
    let client_desc = REGISTRY.get("client").unwrap();

    let group_id = {
        let table = store.table("group").unwrap();
        let mut guard = table.write().await;
        let mut values = vec![FieldValue::Null; group_desc.fields.len()];
        values[group_desc.field_index("name").unwrap()] = FieldValue::Text("Alpha".into());
        guard.insert(values, BTreeMap::new())
    };
    let client_id = {
        let table = store.table("client").unwrap();
        let mut guard = table.write().await;
        let mut values = vec![FieldValue::Null; client_desc.fields.len()];
        values[client_desc.field_index("name").unwrap()] = FieldValue::Text("Asha".into());
        values[client_desc.field_index("group").unwrap()] = FieldValue::Number(group_id as f64);
        guard.insert(values, BTreeMap::new())
    };

    {
        let table = store.table("group").unwrap();
        table.write().await.remove(group_id);
    }
    store.apply_set_null(&REGISTRY, "group", group_id).await;

    let table = store.table("client").unwrap();
    let guard = table.read().await;
    let row = guard.get(client_id).unwrap();
    assert!(row.value(client_desc, "group").unwrap().is_null());
    assert_eq!(
        row.value(client_desc, "name").and_then(FieldValue::as_str),
        Some("Asha")
    );
}
