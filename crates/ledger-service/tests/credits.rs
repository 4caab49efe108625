//! Credit balance, history and purchase integration tests.

mod common;

use common::{mint_token, TestHarness};
use ledger_service::ServiceConfig;
use serde_json::json;

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn get_balance_without_auth_fails() {
    let harness = TestHarness::new();

    harness
        .server
        .get("/v1/credits/balance")
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn token_for_wrong_audience_is_rejected() {
    let harness = TestHarness::new();
    let token = mint_token(&harness.test_account_id.to_string(), "someone-else");

    harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", format!("Bearer {token}"))
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn token_with_non_uuid_subject_is_rejected() {
    let harness = TestHarness::new();
    let token = mint_token("not-a-uuid", "ledger");

    harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", format!("Bearer {token}"))
        .await
        .assert_status_unauthorized();
}

// ============================================================================
// Balance and initialization
// ============================================================================

#[tokio::test]
async fn balance_initializes_new_account() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 50);
    assert_eq!(body["account_id"], harness.test_account_id.to_string());
}

#[tokio::test]
async fn balance_is_zero_without_auto_initialize() {
    let harness = TestHarness::with(
        ServiceConfig {
            auto_initialize: false,
            ..ServiceConfig::default()
        },
        common::StubAnalyzer::default(),
    );

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>()["balance"], 0);

    let history = harness
        .server
        .get("/v1/credits/transactions")
        .add_header("authorization", harness.user_auth_header())
        .await;
    history.assert_status_ok();
    assert!(history.json::<serde_json::Value>()["transactions"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn initialize_is_idempotent() {
    let harness = TestHarness::new();

    let first = harness
        .server
        .post("/v1/credits/initialize")
        .add_header("authorization", harness.user_auth_header())
        .await;
    first.assert_status_ok();
    let first: serde_json::Value = first.json();
    assert_eq!(first["created"], true);
    assert_eq!(first["balance"], 50);
    assert_eq!(first["transaction"]["kind"], "initialize");
    assert_eq!(first["transaction"]["balance_before"], 0);

    let second: serde_json::Value = harness
        .server
        .post("/v1/credits/initialize")
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();
    assert_eq!(second["created"], false);
    assert_eq!(second["balance"], 50);
    assert!(second.get("transaction").is_none());
}

// ============================================================================
// Transactions
// ============================================================================

#[tokio::test]
async fn list_transactions_with_pagination() {
    let harness = TestHarness::new();

    for pack in ["starter", "starter", "professional"] {
        harness
            .server
            .post("/v1/credits/purchase")
            .add_header("authorization", harness.user_auth_header())
            .json(&json!({ "pack_id": pack }))
            .await
            .assert_status_ok();
    }

    let page: serde_json::Value = harness
        .server
        .get("/v1/credits/transactions?limit=2&offset=0")
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();
    let transactions = page["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 2);
    assert_eq!(page["has_more"], true);
    assert_eq!(transactions[0]["description"], "purchase:professional");
    assert_eq!(transactions[0]["sequence"], 4);

    let last: serde_json::Value = harness
        .server
        .get("/v1/credits/transactions?limit=2&offset=2")
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();
    assert_eq!(last["has_more"], false);
    assert_eq!(last["transactions"][1]["kind"], "initialize");
}

#[tokio::test]
async fn transactions_are_isolated_per_account() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/v1/credits/initialize")
        .add_header("authorization", harness.user_auth_header())
        .await
        .assert_status_ok();

    let body: serde_json::Value = harness
        .server
        .get("/v1/credits/transactions")
        .add_header("authorization", TestHarness::other_user_auth_header())
        .await
        .json();
    assert!(body["transactions"].as_array().unwrap().is_empty());
}

// ============================================================================
// Packs and purchase
// ============================================================================

#[tokio::test]
async fn list_packs_returns_catalog() {
    let harness = TestHarness::new();

    let body: serde_json::Value = harness.server.get("/v1/credits/packs").await.json();
    let ids: Vec<_> = body["packs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["starter", "professional", "enterprise"]);
}

#[tokio::test]
async fn purchase_grants_pack_credits() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/credits/purchase")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "pack_id": "starter" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 150);
    assert_eq!(body["transaction"]["kind"], "grant");
    assert_eq!(body["transaction"]["amount"], 100);
    assert_eq!(body["transaction"]["metadata"]["pack_id"], "starter");
}

#[tokio::test]
async fn purchase_unknown_pack_fails() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/v1/credits/purchase")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "pack_id": "platinum" }))
        .await
        .assert_status_not_found();
}
