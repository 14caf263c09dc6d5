//! Lead webhook integration tests.

mod common;

use std::future::IntoFuture;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::StatusCode;
use serde_json::json;

use common::{token_header, value, RecordingGateway, TestHarness, TOKEN};
use lead_meter_core::BillingTarget;
use lead_meter_service::ServiceConfig;

fn roofco_payload() -> serde_json::Value {
    json!({
        "clientId": "roofco",
        "leadId": "abc123",
        "occurredAt": "2025-08-25T20:00:00Z"
    })
}

// ============================================================================
// Accepted events
// ============================================================================

#[tokio::test]
async fn reference_event_is_recorded() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/ghl-webhook")
        .add_header(token_header(), value(TOKEN))
        .json(&roofco_payload())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body, json!({ "success": true }));

    let submissions = harness.gateway.submissions();
    assert_eq!(submissions.len(), 1);
    let record = &submissions[0];
    assert_eq!(record.target, BillingTarget::SubscriptionItem("si_999".into()));
    assert_eq!(record.quantity, 1);
    assert_eq!(record.timestamp, 1_756_152_000);
    assert_eq!(record.idempotency_key, "ghl:roofco:abc123:1756152000");
}

#[tokio::test]
async fn redelivery_reuses_the_idempotency_key() {
    let harness = TestHarness::new();

    for _ in 0..2 {
        harness
            .server
            .post("/ghl-webhook")
            .add_header(token_header(), value(TOKEN))
            .json(&roofco_payload())
            .await
            .assert_status_ok();
    }

    let submissions = harness.gateway.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].idempotency_key, submissions[1].idempotency_key);
    assert_eq!(submissions[0], submissions[1]);
}

#[tokio::test]
async fn missing_occurred_at_uses_current_time() {
    let harness = TestHarness::new();

    let before = chrono::Utc::now().timestamp();
    harness
        .server
        .post("/ghl-webhook")
        .add_header(token_header(), value(TOKEN))
        .json(&json!({ "clientId": "roofco", "leadId": "abc123" }))
        .await
        .assert_status_ok();
    let after = chrono::Utc::now().timestamp();

    let record = &harness.gateway.submissions()[0];
    assert!(record.timestamp >= before - 5 && record.timestamp <= after + 5);
    assert_eq!(
        record.idempotency_key,
        format!("ghl:roofco:abc123:{}", record.timestamp)
    );
}

#[tokio::test]
async fn unparseable_occurred_at_uses_current_time() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/ghl-webhook")
        .add_header(token_header(), value(TOKEN))
        .json(&json!({ "clientId": "roofco", "occurredAt": "last tuesday" }))
        .await
        .assert_status_ok();

    let record = &harness.gateway.submissions()[0];
    assert!((record.timestamp - chrono::Utc::now().timestamp()).abs() <= 5);
}

#[tokio::test]
async fn missing_lead_uses_placeholder() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/ghl-webhook")
        .add_header(token_header(), value(TOKEN))
        .json(&json!({ "clientId": "roofco", "occurredAt": "2025-08-25T20:00:00Z" }))
        .await
        .assert_status_ok();

    assert_eq!(
        harness.gateway.submissions()[0].idempotency_key,
        "ghl:roofco:noLead:1756152000"
    );
}

#[tokio::test]
async fn meter_targets_are_supported() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/ghl-webhook")
        .add_header(token_header(), value(TOKEN))
        .json(&json!({ "clientId": "plumbco", "leadId": "l-1" }))
        .await
        .assert_status_ok();

    assert_eq!(
        harness.gateway.submissions()[0].target,
        BillingTarget::Meter {
            event_name: "leads_created".into(),
            customer: "cus_123".into(),
        }
    );
}

#[tokio::test]
async fn concurrent_events_are_all_recorded() {
    let harness = TestHarness::new();

    let requests = (0..20).map(|i| {
        harness
            .server
            .post("/ghl-webhook")
            .add_header(token_header(), value(TOKEN))
            .json(&json!({
                "clientId": "roofco",
                "leadId": format!("lead-{i}"),
                "occurredAt": "2025-08-25T20:00:00Z"
            }))
            .into_future()
    });

    for response in futures::future::join_all(requests).await {
        response.assert_status_ok();
    }

    let mut keys: Vec<String> = harness
        .gateway
        .submissions()
        .into_iter()
        .map(|r| r.idempotency_key)
        .collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 20);
}

// ============================================================================
// Shared token
// ============================================================================

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/ghl-webhook")
        .json(&roofco_payload())
        .await;

    response.assert_status_unauthorized();
    assert_eq!(response.text(), "Unauthorized");
    assert!(harness.gateway.submissions().is_empty());
}

#[tokio::test]
async fn wrong_token_is_unauthorized() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/ghl-webhook")
        .add_header(token_header(), value("secret2"))
        .json(&roofco_payload())
        .await;

    response.assert_status_unauthorized();
    assert!(harness.gateway.submissions().is_empty());
}

#[tokio::test]
async fn token_is_checked_before_the_payload() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/ghl-webhook")
        .bytes(Bytes::from_static(b"{not json"))
        .content_type("application/json")
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn unconfigured_token_rejects_every_request() {
    let harness = TestHarness::with_config(ServiceConfig {
        shared_webhook_token: None,
        ..common::test_config()
    });

    let response = harness
        .server
        .post("/ghl-webhook")
        .add_header(token_header(), value(""))
        .json(&roofco_payload())
        .await;

    response.assert_status_unauthorized();
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn malformed_body_is_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/ghl-webhook")
        .add_header(token_header(), value(TOKEN))
        .bytes(Bytes::from_static(b"{not json"))
        .content_type("application/json")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "Invalid JSON payload");
    assert!(harness.gateway.submissions().is_empty());
}

#[tokio::test]
async fn oversized_body_is_an_invalid_payload() {
    let harness = TestHarness::with_config(ServiceConfig {
        max_body_bytes: 64,
        ..common::test_config()
    });
    let payload = json!({ "clientId": "roofco", "leadId": "x".repeat(256) });

    let response = harness
        .server
        .post("/ghl-webhook")
        .add_header(token_header(), value(TOKEN))
        .json(&payload)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "Invalid JSON payload");
    assert!(harness.gateway.submissions().is_empty());
}

#[tokio::test]
async fn oversized_body_without_token_is_unauthorized() {
    let harness = TestHarness::with_config(ServiceConfig {
        max_body_bytes: 64,
        ..common::test_config()
    });

    harness
        .server
        .post("/ghl-webhook")
        .json(&json!({ "clientId": "roofco", "leadId": "x".repeat(256) }))
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn missing_client_id_is_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/ghl-webhook")
        .add_header(token_header(), value(TOKEN))
        .json(&json!({ "leadId": "abc123" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "Missing clientId in webhook body.");
    assert!(harness.gateway.submissions().is_empty());
}

#[tokio::test]
async fn unknown_client_is_rejected_without_billing() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/ghl-webhook")
        .add_header(token_header(), value(TOKEN))
        .json(&json!({ "clientId": "nobody", "leadId": "abc123" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text(),
        "Unknown clientId 'nobody' (no billing meter mapping)."
    );
    assert!(harness.gateway.submissions().is_empty());
}

#[tokio::test]
async fn client_lookup_is_case_sensitive() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/ghl-webhook")
        .add_header(token_header(), value(TOKEN))
        .json(&json!({ "clientId": "RoofCo" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    assert!(harness.gateway.submissions().is_empty());
}

// ============================================================================
// Billing gateway
// ============================================================================

#[tokio::test]
async fn gateway_rejection_is_reported() {
    let harness = TestHarness::with_failing_gateway("No such subscription item: 'si_999'");

    let response = harness
        .server
        .post("/ghl-webhook")
        .add_header(token_header(), value(TOKEN))
        .json(&roofco_payload())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "No such subscription item: 'si_999'");
    assert_eq!(harness.gateway.submissions().len(), 1);
}

#[tokio::test]
async fn slow_gateway_is_reported_as_bad_request() {
    let harness = TestHarness::with_gateway(
        ServiceConfig {
            request_timeout_seconds: 1,
            ..common::test_config()
        },
        RecordingGateway::slow(Duration::from_secs(2)),
    );

    let response = harness
        .server
        .post("/ghl-webhook")
        .add_header(token_header(), value(TOKEN))
        .json(&roofco_payload())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "Usage submission timed out after 1s");
}

#[tokio::test]
async fn dropped_request_does_not_cancel_submission() {
    let harness = TestHarness::with_gateway(
        common::test_config(),
        RecordingGateway::slow(Duration::from_millis(300)),
    );

    let request = harness
        .server
        .post("/ghl-webhook")
        .add_header(token_header(), value(TOKEN))
        .json(&roofco_payload())
        .into_future();

    // The caller gives up while the submission is still in flight.
    let abandoned = tokio::time::timeout(Duration::from_millis(50), request).await;
    assert!(abandoned.is_err());
    assert!(harness.gateway.submissions().is_empty());

    tokio::time::sleep(Duration::from_millis(600)).await;

    let submissions = harness.gateway.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].idempotency_key, "ghl:roofco:abc123:1756152000");
}
