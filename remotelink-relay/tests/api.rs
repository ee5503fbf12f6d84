mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use common::{field, seed_remote};
use remotelink_core::RemoteId;
use remotelink_relay::{
    Collection, InboundMessage, MemoryDocumentStore, MockTransport, Relay, TelemetryLiveness,
    api,
};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app(store: MemoryDocumentStore, transport: MockTransport) -> Router {
    api::router(Arc::new(Relay::new(
        store,
        transport,
        TelemetryLiveness::default(),
    )))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let response = app(MemoryDocumentStore::new(), MockTransport::new())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn send_command_reports_outcome_and_cascade() {
    let store = MemoryDocumentStore::new();
    seed_remote(&store, "r1", "", false, 2).await.unwrap();

    let response = app(store.clone(), MockTransport::new())
        .oneshot(post_json(
            "/api/commands/send",
            json!({ "remoteId": "r1", "message": "send", "command": { "power": "on" } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["outcome"], json!({ "status": "delivered" }));
    assert_eq!(body["data"]["isOnline"], json!(true));
    assert_eq!(body["data"]["isAvailable"], json!(true));
    assert_eq!(body["data"]["devicesUpdated"], json!(2));
    assert_eq!(body["data"]["devicesFailed"], json!(0));

    assert_eq!(
        field(&store, Collection::Devices, "r1-d0", "isAvailable").await,
        Some(json!(true))
    );
}

#[tokio::test]
async fn send_command_failure_is_not_an_http_error() {
    let store = MemoryDocumentStore::new();
    seed_remote(&store, "r1", "", true, 1).await.unwrap();

    let response = app(store, MockTransport::with_offline([RemoteId::from("r1")]))
        .oneshot(post_json(
            "/api/commands/send",
            json!({ "remoteId": "r1", "command": { "power": "on" } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["outcome"]["status"], json!("failed"));
    assert_eq!(body["data"]["isOnline"], json!(false));
    assert_eq!(body["data"]["isAvailable"], json!(false));
}

#[tokio::test]
async fn send_command_rejects_missing_remote_id() {
    let transport = MockTransport::new();
    let response = app(MemoryDocumentStore::new(), transport.clone())
        .oneshot(post_json(
            "/api/commands/send",
            json!({ "message": "send", "command": { "power": "on" } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("invalid-argument"));
    assert!(transport.sent().await.is_empty());
}

#[tokio::test]
async fn send_command_rejects_mistyped_body_as_invalid_argument() {
    let transport = MockTransport::new();
    let response = app(MemoryDocumentStore::new(), transport.clone())
        .oneshot(post_json("/api/commands/send", json!({ "remoteId": 5 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("invalid-argument"));
    assert!(transport.sent().await.is_empty());
}

#[tokio::test]
async fn send_command_with_unknown_stored_command_is_not_found() {
    let store = MemoryDocumentStore::new();
    seed_remote(&store, "r1", "", false, 0).await.unwrap();
    let transport = MockTransport::new();

    let response = app(store, transport.clone())
        .oneshot(post_json(
            "/api/commands/send",
            json!({ "remoteId": "r1", "message": "send", "commandId": "missing" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], json!("not-found"));
    assert!(transport.sent().await.is_empty());
}

#[tokio::test]
async fn telemetry_push_is_applied() {
    let store = MemoryDocumentStore::new();
    seed_remote(&store, "r2", "learning", false, 1).await.unwrap();

    let message = InboundMessage::new("r2", &json!({ "state": "", "temp": 21 }));
    let response = app(store.clone(), MockTransport::new())
        .oneshot(post_json(
            "/api/telemetry",
            json!({ "message": message, "subscription": "projects/p/subscriptions/telemetry" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(field(&store, Collection::Remotes, "r2", "temp").await, Some(json!(21)));
    assert_eq!(
        field(&store, Collection::Devices, "r2-d0", "isAvailable").await,
        Some(json!(true))
    );
}

#[tokio::test]
async fn malformed_telemetry_is_acknowledged_and_dropped() {
    let store = MemoryDocumentStore::new();
    seed_remote(&store, "r2", "learning", false, 0).await.unwrap();

    let response = app(store.clone(), MockTransport::new())
        .oneshot(post_json(
            "/api/telemetry",
            json!({ "message": { "attributes": { "deviceId": "r2" }, "data": "not base64!" } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(field(&store, Collection::Remotes, "r2", "state").await, Some(json!("learning")));
}

#[tokio::test]
async fn sweep_endpoint_returns_report() {
    let store = MemoryDocumentStore::new();
    seed_remote(&store, "r1", "", false, 1).await.unwrap();
    seed_remote(&store, "r2", "", true, 1).await.unwrap();

    let response = app(store, MockTransport::with_offline([RemoteId::from("r2")]))
        .oneshot(post_json("/api/sweep", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["probed"], json!(2));
    assert_eq!(body["data"]["online"], json!(1));
    assert_eq!(body["data"]["offline"], json!(1));
    assert_eq!(body["data"]["failures"], json!([]));
}
