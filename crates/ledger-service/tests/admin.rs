//! Admin and service endpoint integration tests.

mod common;

use common::{TestHarness, ADMIN_API_KEY, SERVICE_API_KEY};
use serde_json::json;

// ============================================================================
// Admin
// ============================================================================

#[tokio::test]
async fn admin_endpoints_require_admin_key() {
    let harness = TestHarness::new();

    harness
        .server
        .get("/v1/admin/accounts")
        .await
        .assert_status_unauthorized();

    harness
        .server
        .get("/v1/admin/accounts")
        .add_header("x-admin-key", "wrong")
        .await
        .assert_status_unauthorized();

    harness
        .server
        .post(&format!(
            "/v1/admin/accounts/{}/grant",
            harness.test_account_id
        ))
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "amount": 1000, "reason": "self-service" }))
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn admin_set_balance_records_delta_and_admin_id() {
    let harness = TestHarness::new();
    let path = format!("/v1/admin/accounts/{}/balance", harness.test_account_id);

    let response = harness
        .server
        .post(&path)
        .add_header("x-admin-key", ADMIN_API_KEY)
        .add_header("x-admin-id", "alice")
        .json(&json!({ "balance": 1000, "reason": "correction" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 1000);
    assert_eq!(body["transaction"]["kind"], "admin_set");
    assert_eq!(body["transaction"]["amount"], 950);
    assert_eq!(body["transaction"]["metadata"]["admin_id"], "alice");
}

#[tokio::test]
async fn admin_set_rejects_negative_balance() {
    let harness = TestHarness::new();

    harness
        .server
        .post(&format!(
            "/v1/admin/accounts/{}/balance",
            harness.test_account_id
        ))
        .add_header("x-admin-key", ADMIN_API_KEY)
        .json(&json!({ "balance": -1, "reason": "oops" }))
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn admin_grant_and_audit() {
    let harness = TestHarness::new();
    let account = harness.test_account_id;

    let grant: serde_json::Value = harness
        .server
        .post(&format!("/v1/admin/accounts/{account}/grant"))
        .add_header("x-admin-key", ADMIN_API_KEY)
        .json(&json!({ "amount": 25, "reason": "goodwill" }))
        .await
        .json();
    assert_eq!(grant["balance"], 75);
    assert_eq!(grant["transaction"]["kind"], "admin_grant");

    let audit = harness
        .server
        .get(&format!("/v1/admin/accounts/{account}/audit"))
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await;
    audit.assert_status_ok();
    let audit: serde_json::Value = audit.json();
    assert_eq!(audit["consistent"], true);
    assert_eq!(audit["records"], 2);
    assert_eq!(audit["replayed_balance"], 75);
}

#[tokio::test]
async fn admin_audit_unknown_account_is_not_found() {
    let harness = TestHarness::new();

    harness
        .server
        .get(&format!(
            "/v1/admin/accounts/{}/audit",
            ledger_core::AccountId::generate()
        ))
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await
        .assert_status_not_found();

    harness
        .server
        .get("/v1/admin/accounts/not-a-uuid/audit")
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn admin_lists_accounts() {
    let harness = TestHarness::new();

    for _ in 0..3 {
        harness
            .server
            .post("/v1/credits/initialize")
            .add_header("authorization", TestHarness::other_user_auth_header())
            .await
            .assert_status_ok();
    }

    let body: serde_json::Value = harness
        .server
        .get("/v1/admin/accounts?limit=2")
        .add_header("x-admin-key", ADMIN_API_KEY)
        .await
        .json();
    assert_eq!(body["accounts"].as_array().unwrap().len(), 2);
    assert_eq!(body["has_more"], true);
    assert_eq!(body["accounts"][0]["balance"], 50);
}

// ============================================================================
// Service usage
// ============================================================================

#[tokio::test]
async fn service_consume_charges_account() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/usage/consume")
        .add_header("x-api-key", SERVICE_API_KEY)
        .add_header("x-service-name", "chat")
        .json(&json!({
            "account_id": harness.test_account_id.to_string(),
            "amount": 5,
            "reason": "chat message",
            "metadata": { "invocation_id": "inv-1" }
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 45);
    assert_eq!(body["transaction"]["amount"], -5);
    assert_eq!(body["transaction"]["metadata"]["invocation_id"], "inv-1");
    assert_eq!(body["transaction"]["metadata"]["source"], "chat");
}

#[tokio::test]
async fn service_consume_maps_errors() {
    let harness = TestHarness::new();
    let account = harness.test_account_id.to_string();

    harness
        .server
        .post("/v1/usage/consume")
        .json(&json!({ "account_id": account, "amount": 5, "reason": "x" }))
        .await
        .assert_status_unauthorized();

    harness
        .server
        .post("/v1/usage/consume")
        .add_header("x-api-key", SERVICE_API_KEY)
        .json(&json!({ "account_id": account, "amount": 0, "reason": "x" }))
        .await
        .assert_status_bad_request();

    let response = harness
        .server
        .post("/v1/usage/consume")
        .add_header("x-api-key", SERVICE_API_KEY)
        .json(&json!({ "account_id": account, "amount": 51, "reason": "x" }))
        .await;
    response.assert_status(axum::http::StatusCode::PAYMENT_REQUIRED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["details"]["balance"], 50);
}
