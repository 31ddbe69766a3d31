/// Entity resolution tests
///
/// Tests for the closed registry: token normalization, legacy vs core
/// table separation and the faux permission entities.
/// Run with: cargo test --test entity_resolution_tests

use branchdesk::engine::ListFilter;
use branchdesk::registry::{normalize_entity, REGISTRY, Resolution};
use branchdesk::{AppConfig, BackOffice, EngineError};

async fn engine() -> BackOffice {
    BackOffice::bootstrap(AppConfig::default()).await.unwrap()
}

#[test]
fn test_normalization_strips_case_and_separators() {
    assert_eq!(normalize_entity("User Profile"), "userprofile");
    assert_eq!(normalize_entity("user_profile"), "userprofile");
    assert_eq!(normalize_entity("USER-PROFILE"), "userprofile");
    assert_eq!(normalize_entity("  Loan Application "), "loanapplication");
}

#[test]
fn test_registry_resolves_variants_to_one_descriptor() {
    let canonical = match REGISTRY.resolve("userprofile") {
        Resolution::Entity(d) => d,
        other => panic!("expected entity, got {:?}", other),
    };
    for token in ["User Profile", "USER_PROFILE", "user-profile"] {
        match REGISTRY.resolve(token) {
            Resolution::Entity(d) => assert_eq!(d.name, canonical.name, "token {}", token),
            other => panic!("token {} resolved to {:?}", token, other),
        }
    }
}

#[test]
fn test_no_fuzzy_matching_for_unknown_tokens() {
    // close-but-wrong tokens must not resolve to anything
    for token in ["clien", "client2", "staf", "userprofiles", "vouchers"] {
        assert!(
            matches!(REGISTRY.resolve(token), Resolution::NotFound),
            "token {} must not resolve",
            token
        );
    }
}

#[test]
fn test_group_and_groups_are_distinct_tables() {
    let core = match REGISTRY.resolve("group") {
        Resolution::Entity(d) => d,
        other => panic!("expected entity, got {:?}", other),
    };
    let legacy = match REGISTRY.resolve("groups") {
        Resolution::Entity(d) => d,
        other => panic!("expected entity, got {:?}", other),
    };
    assert_eq!(core.name, "group");
    assert_eq!(legacy.name, "groups");
    assert!(core.code.is_some(), "core group carries an auto code");
    assert!(legacy.code.is_none(), "legacy mirror has no auto code");
}

#[test]
fn test_permission_tokens_resolve_as_faux() {
    for token in ["userpermission", "userpermissions", "User Permissions"] {
        assert!(
            matches!(REGISTRY.resolve(token), Resolution::Faux),
            "token {}",
            token
        );
    }
}

#[tokio::test]
async fn test_engine_serves_both_group_tables_independently() {
    let engine = engine().await;
    let core = engine
        .create("group", &serde_json::json!({ "name": "SHG Alpha" }).as_object().unwrap().clone())
        .await
        .unwrap();
    assert_eq!(core.code.as_deref(), Some("GRP001"));

    engine
        .create(
            "groups",
            &serde_json::json!({ "groupcode": "G-77", "groupname": "Beta (CSV)" })
                .as_object()
                .unwrap()
                .clone(),
        )
        .await
        .unwrap();

    let core_page = engine.list("group", ListFilter::default()).await.unwrap();
    let legacy_page = engine.list("groups", ListFilter::default()).await.unwrap();
    assert_eq!(core_page.records.len(), 1);
    assert_eq!(legacy_page.records.len(), 1);
    assert_eq!(core_page.records[0]["name"], "SHG Alpha");
    assert_eq!(legacy_page.records[0]["groupname"], "Beta (CSV)");
}

#[tokio::test]
async fn test_unknown_entity_is_not_found_everywhere() {
    let engine = engine().await;

    let err = engine.list("warehouse", ListFilter::default()).await.unwrap_err();
    assert!(matches!(err, EngineError::EntityNotFound(_)));
    assert!(err.to_string().contains("warehouse"));

    let err = engine.form("warehouse", None).await.unwrap_err();
    assert!(matches!(err, EngineError::EntityNotFound(_)));

    let err = engine
        .create("warehouse", &serde_json::Map::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::EntityNotFound(_)));
}

#[tokio::test]
async fn test_faux_tokens_blocked_from_every_operation() {
    let engine = engine().await;

    let err = engine.list("userpermission", ListFilter::default()).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    assert!(err.to_string().contains("permission screen"));

    let err = engine
        .create("userpermissions", &serde_json::Map::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .update("userpermission", 1, &serde_json::Map::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn test_roster_provisions_every_registered_table() {
    let engine = engine().await;
    // a sample across core and legacy names; each must list cleanly
    for entity in [
        "company", "branch", "village", "center", "staff", "client",
        "loanapplication", "voucher", "posting", "members", "loans",
        "savings", "pdc", "dayend", "mxloans",
    ] {
        let page = engine.list(entity, ListFilter::default()).await;
        assert!(page.is_ok(), "entity {} must be provisioned", entity);
    }
}
