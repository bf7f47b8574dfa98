use axum::body::{to_bytes, Body};
use axum::http::{Method, Request};
use serde_json::{json, Value};
use shardwarehouse::worker::{router, DuckDbExecutor, WorkerState};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> axum::Router {
    let engine = Arc::new(DuckDbExecutor::open_in_memory(None).unwrap());
    router(WorkerState { engine })
}

async fn post_json(app: &axum::Router, uri: &str, payload: Value) -> Value {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request should build");

    let response = app.clone().oneshot(request).await.expect("response expected");
    assert!(response.status().is_success());
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body should be readable");
    serde_json::from_slice(&body).expect("body should be valid JSON")
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();
    let request = Request::builder().method(Method::GET).uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.status().is_success());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["ok"], true);
}

#[tokio::test]
async fn create_task_is_idempotent_under_if_not_exists() {
    let app = app();
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().to_string_lossy().to_string();

    let create_payload = json!({
        "kind": "create",
        "db_path": db_path,
        "table": "events",
        "table_schema": [
            {"name": "id", "type": "int", "nullable": false},
            {"name": "label", "type": "varchar", "nullable": true}
        ],
        "if_not_exists": true
    });

    let first = post_json(&app, "/tasks/execute", create_payload.clone()).await;
    assert_eq!(first["ok"], true);

    let second = post_json(&app, "/tasks/execute", create_payload).await;
    assert_eq!(second["ok"], true, "re-creating with if_not_exists must be a no-op success, not an error");
}

#[tokio::test]
async fn create_without_if_not_exists_conflicts_on_second_call() {
    let app = app();
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().to_string_lossy().to_string();

    let create_payload = json!({
        "kind": "create",
        "db_path": db_path,
        "table": "events",
        "table_schema": [{"name": "id", "type": "int", "nullable": false}],
        "if_not_exists": false
    });

    let first = post_json(&app, "/tasks/execute", create_payload.clone()).await;
    assert_eq!(first["ok"], true);

    let second = post_json(&app, "/tasks/execute", create_payload).await;
    assert_eq!(second["ok"], false);
    assert!(second["error"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn drop_task_removes_table_directory() {
    let app = app();
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().to_string_lossy().to_string();

    post_json(
        &app,
        "/tasks/execute",
        json!({
            "kind": "create",
            "db_path": db_path,
            "table": "events",
            "table_schema": [{"name": "id", "type": "int", "nullable": false}],
            "if_not_exists": false
        }),
    )
    .await;

    assert!(dir.path().join("events").is_dir());

    let drop_resp = post_json(
        &app,
        "/tasks/execute",
        json!({"kind": "drop", "db_path": db_path, "table": "events", "if_exists": false}),
    )
    .await;
    assert_eq!(drop_resp["ok"], true);
    assert!(!dir.path().join("events").exists());
}
