//! HTTP endpoint tests
//!
//! Drive the full axum router with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower::ServiceExt;

use drs_notify::handlers::{app_router, NotifyState};
use drs_notify::sns::{
    ConfirmationClient, ConfirmationError, ConfirmationResponse, Envelope, EnvelopeType, Handlers,
    HmacVerifier,
};

const SECRET: &str = "server-test-secret-0123456789abcdef";

/// Confirmation client that always answers 200
struct AlwaysOk;

#[async_trait]
impl ConfirmationClient for AlwaysOk {
    async fn fetch(&self, _url: &str) -> Result<ConfirmationResponse, ConfirmationError> {
        Ok(ConfirmationResponse {
            status: 200,
            body: String::new(),
        })
    }
}

async fn body_json(body: Body) -> Value {
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn app(handlers: Handlers) -> (Router, Arc<NotifyState>) {
    let state = Arc::new(NotifyState::new(
        Arc::new(HmacVerifier::new(SECRET)),
        Arc::new(AlwaysOk),
        handlers,
    ));
    (app_router(state.clone()), state)
}

fn signed_notification(message: Value) -> Envelope {
    let mut envelope = Envelope {
        kind: EnvelopeType::Notification,
        message_id: "msg-http-1".to_string(),
        topic_arn: "arn:aws:sns:us-east-1:123456789012:drs".to_string(),
        subject: None,
        message: message.to_string(),
        timestamp: "2024-05-01T12:00:00.000Z".to_string(),
        signature_version: "1".to_string(),
        signature: String::new(),
        signing_cert_url: "https://sns.us-east-1.amazonaws.com/cert.pem".to_string(),
        subscribe_url: None,
        token: None,
        unsubscribe_url: None,
    };
    envelope.signature = HmacVerifier::new(SECRET).sign(&envelope).unwrap();
    envelope
}

fn order_placed() -> Value {
    json!({
        "notificationInfo": { "notificationType": "OrderPlacedNotification" },
        "deviceInfo": {
            "deviceIdentifier": { "serialNumber": "S1" },
            "productIdentifier": { "modelId": "M1" }
        },
        "customerInfo": { "directedCustomerId": "C1" },
        "orderInfo": { "instanceId": "I1", "slotId": "SL1", "productInfo": [{ "asin": "A1" }] }
    })
}

fn post(envelope: &Envelope) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/notifications")
        .header("content-type", "text/plain; charset=UTF-8")
        .header("x-amz-sns-message-type", envelope.kind.as_str())
        .body(Body::from(serde_json::to_vec(envelope).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (router, _) = app(Handlers::new(|_| {}));
    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response.into_body()).await,
        json!({ "status": "healthy" })
    );
}

#[tokio::test]
async fn test_delivered_notification_returns_ok() {
    let orders = Arc::new(Mutex::new(Vec::new()));
    let seen = orders.clone();
    let handlers = Handlers::new(|_| {}).on_order_placed(move |ctx, order| {
        seen.lock()
            .push((ctx.customer_id.to_string(), order.instance_id.clone()))
    });

    let (router, state) = app(handlers);
    let response = router
        .oneshot(post(&signed_notification(order_placed())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response.into_body()).await,
        json!({ "outcome": "OrderPlacedNotification" })
    );
    assert_eq!(*orders.lock(), vec![("C1".to_string(), "I1".to_string())]);
    assert_eq!(state.status.dispatch_metrics().delivered, 1);
}

#[tokio::test]
async fn test_bad_signature_returns_unauthorized() {
    let (router, state) = app(Handlers::new(|_| {}));
    let mut envelope = signed_notification(order_placed());
    envelope.signature = "bm90LWEtc2lnbmF0dXJl".to_string();

    let response = router.oneshot(post(&envelope)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let metrics = state.status.dispatch_metrics();
    assert_eq!(metrics.failed, 1);
    assert_eq!(metrics.failures_by_code.get("invalid_signature"), Some(&1));
}

#[tokio::test]
async fn test_missing_handler_is_accepted() {
    let (router, _) = app(Handlers::new(|_| {}));
    let response = router
        .oneshot(post(&signed_notification(order_placed())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(
        body_json(response.into_body()).await,
        json!({ "outcome": "missing_handler" })
    );
}

#[tokio::test]
async fn test_garbage_body_is_bad_request() {
    let (router, state) = app(Handlers::new(|_| {}));
    let request = Request::post("/notifications")
        .body(Body::from("definitely not json"))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.status.total_dispatches(), 0);
}

#[tokio::test]
async fn test_message_type_header_mismatch() {
    let (router, _) = app(Handlers::new(|_| {}));
    let envelope = signed_notification(order_placed());
    let request = Request::post("/notifications")
        .header("x-amz-sns-message-type", "SubscriptionConfirmation")
        .body(Body::from(serde_json::to_vec(&envelope).unwrap()))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_reports_counters() {
    let (router, _) = app(Handlers::new(|_| {}).on_non_drs_message(|_| {}));

    let response = router
        .clone()
        .oneshot(post(&signed_notification(json!({ "hello": "world" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(Request::get("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let status = body_json(response.into_body()).await;
    assert_eq!(status["name"], json!("drs-notify"));
    assert_eq!(status["status"], json!("running"));
    assert_eq!(status["dispatch"]["non_drs"], json!(1));
    assert_eq!(status["latency"]["total_requests"], json!(1));
}
