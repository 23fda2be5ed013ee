// Tests for the status endpoints of the HTTP surface

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use common::Harness;
use interview_relay::identity::{IdentityProvider, StaticTokenIdentity};
use interview_relay::relay::ConnectionHandle;
use interview_relay::{create_router, AppState};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

fn app(h: &Harness) -> axum::Router {
    let identity: Arc<dyn IdentityProvider> = Arc::new(StaticTokenIdentity::new(HashMap::new()));
    create_router(AppState::new(
        h.registry.clone(),
        h.relay.clone(),
        h.media.clone(),
        identity,
    ))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn test_health_check() {
    let h = Harness::new(None);
    let (status, body) = get(app(&h), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK".to_vec());
}

#[tokio::test]
async fn test_sessions_count() {
    let h = Harness::new(None);
    let handle = ConnectionHandle::new();
    let _client = h.relay.register(handle);
    h.registry.attach("p1", handle, "Ada").await;

    let (status, body) = get(app(&h), "/sessions").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["active_sessions"], 1);
    assert_eq!(json["connections"], 1);
}

#[tokio::test]
async fn test_session_status() {
    let h = Harness::new(None);
    let handle = ConnectionHandle::new();
    h.relay.register(handle);
    h.registry.attach("p1", handle, "Ada").await;
    h.registry.disconnect("p1", handle).await;

    let (status, body) = get(app(&h), "/sessions/p1").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["participant_id"], "p1");
    assert_eq!(json["state"], "grace");
    assert_eq!(json["connected"], false);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let h = Harness::new(None);
    let (status, body) = get(app(&h), "/sessions/nobody").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("nobody"));
}
