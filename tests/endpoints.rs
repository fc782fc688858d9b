//! HTTP-surface tests: the full router with the gate middleware in front,
//! driven through `oneshot` with an explicit peer address.

mod common;

use std::net::SocketAddr;

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::{Sha256, Sha512};
use tower::ServiceExt;

use coachpay::db::{queries, AppState};
use coachpay::models::{Gateway, PaymentStatus};
use coachpay::webhooks;

fn app(state: AppState) -> Router {
    Router::new()
        .merge(webhooks::router(state.clone()))
        .with_state(state)
}

fn peer(addr: &str) -> SocketAddr {
    format!("{addr}:54321").parse().unwrap()
}

fn post_json(uri: &str, from: SocketAddr, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .extension(ConnectInfo(from))
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn paymob_payload(payment_id: i64, success: bool) -> serde_json::Value {
    json!({
        "obj": {
            "id": 987_654,
            "amount_cents": 50_000,
            "created_at": "2024-03-01T10:15:00.000000",
            "currency": "EGP",
            "success": success,
            "order": { "id": 555, "merchant_order_id": payment_id.to_string() }
        }
    })
}

/// Keyed hash over the pinned canonical concatenation, computed from the same
/// values the payload carries.
fn paymob_signature(key: &str, payment_id: i64, success: bool) -> String {
    let canonical = format!(
        "{}{}{}{}{}{}",
        50_000, "2024-03-01T10:15:00.000000", "EGP", 987_654, payment_id, success
    );
    let mut mac = Hmac::<Sha512>::new_from_slice(key.as_bytes()).unwrap();
    mac.update(canonical.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn stripe_signature_header(secret: &str, body: &[u8]) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let signed = format!("{}.{}", timestamp, String::from_utf8_lossy(body));
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(signed.as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[tokio::test]
async fn excess_requests_get_429_and_other_addresses_do_not() {
    let mut config = common::test_config();
    config.rate_limit_rpm = 2;
    let state = common::test_state_with(config);
    let app = app(state);

    let sender = peer("203.0.113.5");
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post_json("/webhooks/paymob", sender, json!({})))
            .await
            .unwrap();
        // Admitted by the gate; rejected further in as an unusable payload.
        assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    let response = app
        .clone()
        .oneshot(post_json("/webhooks/paymob", sender, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("rate limit exceeded"));

    // A different sender still gets through.
    let response = app
        .oneshot(post_json("/webhooks/paymob", peer("198.51.100.7"), json!({})))
        .await
        .unwrap();
    assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn unlisted_sources_get_403_when_allow_list_enabled() {
    let mut config = common::test_config();
    config.allow_list_enabled = true;
    config.allow_list = vec!["203.0.113.5".parse().unwrap()];
    let state = common::test_state_with(config);
    let app = app(state);

    let response = app
        .clone()
        .oneshot(post_json("/webhooks/paymob", peer("198.51.100.7"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("source address not allowed"));

    let response = app
        .oneshot(post_json("/webhooks/paymob", peer("203.0.113.5"), json!({})))
        .await
        .unwrap();
    assert_ne!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn tampered_paymob_proof_gets_400_and_no_state_change() {
    let mut config = common::test_config();
    config.paymob_hmac_key = "paymob-test-key".to_string();
    let state = common::test_state_with(config);
    let sub_id = common::seed_subscription(&state);
    common::seed_payment_with_id(&state, 42, sub_id, Gateway::Paymob);
    let app = app(state.clone());

    let bad_sig = paymob_signature("some-other-key", 42, true);
    let response = app
        .oneshot(post_json(
            &format!("/webhooks/paymob?hmac={bad_sig}"),
            peer("203.0.113.5"),
            paymob_payload(42, true),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));

    let conn = state.db.get().unwrap();
    let payment = queries::get_payment_by_id(&conn, 42).unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn authentic_paymob_delivery_settles_through_http() {
    let mut config = common::test_config();
    config.paymob_hmac_key = "paymob-test-key".to_string();
    let state = common::test_state_with(config);
    let sub_id = common::seed_subscription(&state);
    common::seed_payment_with_id(&state, 42, sub_id, Gateway::Paymob);
    let app = app(state.clone());

    let sig = paymob_signature("paymob-test-key", 42, true);
    let response = app
        .oneshot(post_json(
            &format!("/webhooks/paymob?hmac={sig}"),
            peer("203.0.113.5"),
            paymob_payload(42, true),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["paymentId"], json!(42));

    let conn = state.db.get().unwrap();
    let payment = queries::get_payment_by_id(&conn, 42).unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
}

#[tokio::test]
async fn stripe_without_signature_header_gets_400() {
    let mut config = common::test_config();
    config.stripe_webhook_secret = "whsec_test".to_string();
    let state = common::test_state_with(config);
    let app = app(state);

    let response = app
        .oneshot(post_json(
            "/webhooks/stripe",
            peer("203.0.113.5"),
            json!({"type": "checkout.session.completed", "data": {"object": {"id": "cs_1"}}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tampered_stripe_signature_gets_400_and_no_state_change() {
    let mut config = common::test_config();
    config.stripe_webhook_secret = "whsec_test".to_string();
    let state = common::test_state_with(config);
    let sub_id = common::seed_subscription(&state);
    let payment_id = common::seed_payment(&state, sub_id, Gateway::Stripe);
    let app = app(state.clone());

    let payload = json!({
        "type": "checkout.session.completed",
        "data": {"object": {
            "id": "cs_1",
            "payment_intent": "pi_1",
            "metadata": {"SubscriptionId": sub_id.to_string()}
        }}
    });
    let body_bytes = serde_json::to_vec(&payload).unwrap();
    let header = stripe_signature_header("whsec_other", &body_bytes);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/stripe")
                .header("content-type", "application/json")
                .header("Signature", header)
                .extension(ConnectInfo(peer("203.0.113.5")))
                .body(Body::from(body_bytes))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let conn = state.db.get().unwrap();
    let payment = queries::get_payment_by_id(&conn, payment_id).unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn authentic_stripe_delivery_settles_through_http() {
    let mut config = common::test_config();
    config.stripe_webhook_secret = "whsec_test".to_string();
    let state = common::test_state_with(config);
    let sub_id = common::seed_subscription(&state);
    let payment_id = common::seed_payment(&state, sub_id, Gateway::Stripe);
    let app = app(state.clone());

    let payload = json!({
        "type": "checkout.session.completed",
        "data": {"object": {
            "id": "cs_1",
            "payment_intent": "pi_1",
            "metadata": {"SubscriptionId": sub_id.to_string()}
        }}
    });
    let body_bytes = serde_json::to_vec(&payload).unwrap();
    let header = stripe_signature_header("whsec_test", &body_bytes);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/stripe")
                .header("content-type", "application/json")
                .header("Signature", header)
                .extension(ConnectInfo(peer("203.0.113.5")))
                .body(Body::from(body_bytes))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["paymentId"], json!(payment_id));

    let conn = state.db.get().unwrap();
    let payment = queries::get_payment_by_id(&conn, payment_id).unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
}
