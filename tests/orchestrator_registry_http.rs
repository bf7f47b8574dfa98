use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use serde_json::{json, Value};
use shardwarehouse::orchestrator::{router, OrchestratorState};
use shardwarehouse::registry::WorkerRegistry;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app(ttl: Duration) -> axum::Router {
    let state = OrchestratorState {
        registry: Arc::new(WorkerRegistry::new(ttl)),
        client: reqwest::Client::new(),
    };
    router(state)
}

async fn post_json(app: &axum::Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() { Value::Null } else { serde_json::from_slice(&body).unwrap() };
    (status, json)
}

async fn get_workers(app: &axum::Router) -> Value {
    let request = Request::builder().method(Method::GET).uri("/workers").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// A freshly registered worker is immediately visible to `/workers`,
/// which is what unblocks a query that was waiting for one to appear.
#[tokio::test]
async fn registering_a_worker_makes_it_immediately_active() {
    let app = app(Duration::from_secs(45));

    let before = get_workers(&app).await;
    assert!(before["active"].as_array().unwrap().is_empty());

    let (status, body) = post_json(
        &app,
        "/workers/register",
        json!({"worker_id": "w1", "base_url": "http://127.0.0.1:9100", "load": 0.0}),
    )
    .await;
    assert!(status.is_success());
    assert_eq!(body["ok"], true);

    let after = get_workers(&app).await;
    let active = after["active"].as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["worker_id"], "w1");
}

/// Heartbeating an unknown worker returns 404, the signal a worker uses
/// to decide it must call `/workers/register` again.
#[tokio::test]
async fn heartbeat_for_unregistered_worker_is_not_found() {
    let app = app(Duration::from_secs(45));
    let (status, _) = post_json(&app, "/workers/heartbeat", json!({"worker_id": "ghost"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// `/workers` must list registrations in a stable, FIFO order so that
/// repeatedly dispatching to "the first active worker" is deterministic
/// across requests, not subject to hash-map iteration order.
#[tokio::test]
async fn active_workers_are_listed_in_registration_order() {
    let app = app(Duration::from_secs(45));

    for (id, port) in [("w1", 9101), ("w2", 9102), ("w3", 9103)] {
        post_json(
            &app,
            "/workers/register",
            json!({"worker_id": id, "base_url": format!("http://127.0.0.1:{port}"), "load": 0.0}),
        )
        .await;
    }

    // Heartbeating an already-registered worker must not change its
    // position in the listing.
    post_json(&app, "/workers/heartbeat", json!({"worker_id": "w2"})).await;

    let after = get_workers(&app).await;
    let ids: Vec<&str> = after["active"].as_array().unwrap().iter().map(|w| w["worker_id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["w1", "w2", "w3"]);
}

/// With a zero-second TTL a worker's registration expires by the very
/// next poll, which is the mechanism a 60s worker-wait timeout rests on
/// when no worker ever registers.
#[tokio::test]
async fn expired_registration_drops_out_of_the_active_set() {
    let app = app(Duration::from_millis(0));
    post_json(
        &app,
        "/workers/register",
        json!({"worker_id": "w1", "base_url": "http://127.0.0.1:9100", "load": 0.0}),
    )
    .await;
    tokio::time::sleep(Duration::from_millis(5)).await;

    let after = get_workers(&app).await;
    assert!(after["active"].as_array().unwrap().is_empty());
}
