//! API surface tests over in-memory adapters and scripted fakes

use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use serde_json::{json, Value};

use domain_fulfillment::PolicyLifecycle;
use domain_underwriting::UnderwritingError;
use interface_api::create_router;
use test_utils::{
    CountingNotifier, FakePaymentGateway, FakeUnderwriting, InMemoryAccountDirectory,
    InMemoryDocumentStore, InMemoryEventStore, InMemoryPolicyRepository,
};

struct TestApp {
    server: TestServer,
    underwriting: Arc<FakeUnderwriting>,
    gateway: Arc<FakePaymentGateway>,
    notifier: Arc<CountingNotifier>,
}

fn test_app() -> TestApp {
    let underwriting = Arc::new(FakeUnderwriting::new());
    let gateway = Arc::new(FakePaymentGateway::new());
    let notifier = Arc::new(CountingNotifier::new());

    let lifecycle = Arc::new(PolicyLifecycle::new(
        Arc::new(InMemoryAccountDirectory::new()),
        Arc::new(InMemoryPolicyRepository::new()),
        Arc::new(InMemoryEventStore::new()),
        gateway.clone(),
        underwriting.clone(),
        Arc::new(InMemoryDocumentStore::new()),
        notifier.clone(),
    ));

    TestApp {
        server: TestServer::new(create_router(lifecycle)).expect("test server"),
        underwriting,
        gateway,
        notifier,
    }
}

fn purchase_body() -> Value {
    json!({
        "email": "traveler@example.com",
        "trip_start": "2025-09-01",
        "trip_end": "2025-09-14",
        "departure_country": "GB",
        "destination_countries": ["FR", "IT"],
        "tier_level": 2,
        "locality_code": "EU",
        "price_amount": "129.00",
        "price_currency": "GBP",
        "travelers": [{
            "first_name": "Alex",
            "last_name": "Morgan",
            "birth_date": "1990-04-12",
            "passport_number": "123456789",
            "passport_country": "GB"
        }]
    })
}

async fn purchase(app: &TestApp) -> (String, String) {
    let response = app
        .server
        .post("/api/v1/policies/purchase")
        .json(&purchase_body())
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    (
        body["policy_id"].as_str().expect("policy id").to_string(),
        body["checkout_session_id"]
            .as_str()
            .expect("session id")
            .to_string(),
    )
}

async fn notify_payment(app: &TestApp, policy_id: &str, session: &str) -> Value {
    let response = app
        .server
        .post("/api/v1/payments/notifications")
        .json(&json!({
            "policy_id": policy_id,
            "checkout_session_id": session,
            "payment_intent_id": "pi_1",
            "amount_minor": 12900,
            "currency": "GBP"
        }))
        .await;
    response.assert_status_ok();
    response.json()
}

/// Polls until the background saga settles the policy into `expected`
async fn wait_for_state(app: &TestApp, policy_id: &str, expected: &str) {
    for _ in 0..100 {
        let response = app
            .server
            .get(&format!("/api/v1/policies/{policy_id}/state"))
            .await;
        if response.status_code() == 200 {
            let body: Value = response.json();
            if body["state"] == expected {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("policy {policy_id} never reached state {expected}");
}

#[tokio::test]
async fn health_endpoints_respond() {
    let app = test_app();
    app.server.get("/health").await.assert_status_ok();
    app.server.get("/health/ready").await.assert_status_ok();
}

#[tokio::test]
async fn quote_returns_price() {
    let app = test_app();
    let response = app
        .server
        .post("/api/v1/quotes")
        .json(&json!({
            "trip_start": "2025-09-01",
            "trip_end": "2025-09-14",
            "departure_country": "GB",
            "destination_countries": ["FR"],
            "tier_level": 2,
            "locality_code": "EU",
            "traveler_count": 1
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["currency"], "USD");
    assert_eq!(body["amount"], "129.00");
}

#[tokio::test]
async fn purchase_creates_pending_policy() {
    let app = test_app();
    let (policy_id, session) = purchase(&app).await;
    assert!(session.starts_with("cs_"));

    let response = app
        .server
        .get(&format!("/api/v1/policies/{policy_id}/state"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["state"], "pending_payment");
}

#[tokio::test]
async fn purchase_rejects_bad_input() {
    let app = test_app();
    let mut body = purchase_body();
    body["travelers"] = json!([]);

    let response = app
        .server
        .post("/api/v1/policies/purchase")
        .json(&body)
        .await;
    response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn payment_notification_drives_fulfillment_to_completed() {
    let app = test_app();
    let (policy_id, session) = purchase(&app).await;

    let ack = notify_payment(&app, &policy_id, &session).await;
    assert_eq!(ack["outcome"], "recorded");

    wait_for_state(&app, &policy_id, "completed").await;
    assert_eq!(app.underwriting.create_calls(), 1);
    assert_eq!(app.notifier.confirmations(), 1);

    let response = app
        .server
        .get(&format!("/api/v1/policies/{policy_id}/history"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let states: Vec<&str> = body["entries"]
        .as_array()
        .expect("entries")
        .iter()
        .map(|e| e["state"].as_str().expect("state"))
        .collect();
    assert_eq!(
        states,
        vec![
            "pending_payment",
            "payment_received",
            "contract_created",
            "contract_confirmed",
            "completed"
        ]
    );
}

#[tokio::test]
async fn duplicate_notification_acknowledges_without_reprocessing() {
    let app = test_app();
    let (policy_id, session) = purchase(&app).await;

    let first = notify_payment(&app, &policy_id, &session).await;
    assert_eq!(first["outcome"], "recorded");
    wait_for_state(&app, &policy_id, "completed").await;

    let second = notify_payment(&app, &policy_id, &session).await;
    assert_eq!(second["outcome"], "already_recorded");
    assert_eq!(app.underwriting.create_calls(), 1);
}

#[tokio::test]
async fn failed_fulfillment_is_retryable_by_operator() {
    let app = test_app();
    app.underwriting.script_confirm(Err(UnderwritingError::rejected(
        Some("NOT_CONFIRMABLE".into()),
        "manual review required",
    )));

    let (policy_id, session) = purchase(&app).await;
    notify_payment(&app, &policy_id, &session).await;
    wait_for_state(&app, &policy_id, "failed").await;

    let history: Value = app
        .server
        .get(&format!("/api/v1/policies/{policy_id}/history"))
        .await
        .json();
    let entries = history["entries"].as_array().expect("entries");
    assert_eq!(entries.len(), 4);
    let failure = &entries[3];
    assert_eq!(failure["state"], "failed");
    assert_eq!(failure["detail"]["step"], "contract_confirmation");

    // Operator retry resumes from the confirmed step
    app.server
        .post(&format!("/api/v1/policies/{policy_id}/retry"))
        .await
        .assert_status_ok();
    wait_for_state(&app, &policy_id, "completed").await;
    assert_eq!(app.underwriting.create_calls(), 1);
}

#[tokio::test]
async fn retry_is_rejected_unless_failed() {
    let app = test_app();
    let (policy_id, _session) = purchase(&app).await;

    let response = app
        .server
        .post(&format!("/api/v1/policies/{policy_id}/retry"))
        .await;
    response.assert_status(axum::http::StatusCode::CONFLICT);
}

#[tokio::test]
async fn refund_requires_payment() {
    let app = test_app();
    let (policy_id, _session) = purchase(&app).await;

    let response = app
        .server
        .post(&format!("/api/v1/policies/{policy_id}/refund"))
        .json(&json!({ "reason": "customer request", "initiated_by": "ops@example.com" }))
        .await;
    response.assert_status(axum::http::StatusCode::CONFLICT);
}

#[tokio::test]
async fn refund_settles_after_payment() {
    let app = test_app();
    let (policy_id, session) = purchase(&app).await;
    notify_payment(&app, &policy_id, &session).await;
    wait_for_state(&app, &policy_id, "completed").await;

    app.server
        .post(&format!("/api/v1/policies/{policy_id}/refund"))
        .json(&json!({ "reason": "trip cancelled", "initiated_by": "ops@example.com" }))
        .await
        .assert_status_ok();

    wait_for_state(&app, &policy_id, "refunded").await;
    assert_eq!(app.gateway.refund_calls(), 1);
    assert_eq!(app.notifier.refund_notices(), 1);
}

#[tokio::test]
async fn unknown_policy_state_is_not_found() {
    let app = test_app();
    let response = app
        .server
        .get(&format!("/api/v1/policies/{}/state", uuid::Uuid::new_v4()))
        .await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn checkout_failure_is_bad_gateway_and_retryable() {
    let app = test_app();
    app.gateway.fail_next_checkout();

    let response = app
        .server
        .post("/api/v1/policies/purchase")
        .json(&purchase_body())
        .await;
    response.assert_status(axum::http::StatusCode::BAD_GATEWAY);

    // The same purchase succeeds once the gateway recovers
    purchase(&app).await;
}
