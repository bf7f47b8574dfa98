use super::dispatcher::route_external_query;
use crate::registry::WorkerRegistry;
use crate::rpc::{ExternalQueryRequest, ExternalQueryResponse, HeartbeatRequest, RegisterRequest};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct OrchestratorState {
    pub registry: Arc<WorkerRegistry>,
    pub client: reqwest::Client,
}

pub fn router(state: OrchestratorState) -> Router {
    Router::new()
        .route("/workers/register", post(register))
        .route("/workers/heartbeat", post(heartbeat))
        .route("/workers", get(list_workers))
        .route("/query", post(query))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn register(State(state): State<OrchestratorState>, Json(req): Json<RegisterRequest>) -> impl IntoResponse {
    state.registry.upsert(&req.worker_id, &req.base_url, req.load);
    Json(serde_json::json!({ "ok": true }))
}

async fn heartbeat(State(state): State<OrchestratorState>, Json(req): Json<HeartbeatRequest>) -> Response {
    match state.registry.heartbeat(&req.worker_id, req.base_url.as_deref(), req.load) {
        Ok(()) => Json(serde_json::json!({ "ok": true })).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "worker not registered").into_response(),
    }
}

async fn list_workers(State(state): State<OrchestratorState>) -> impl IntoResponse {
    Json(serde_json::json!({ "active": state.registry.list_active() }))
}

async fn query(
    State(state): State<OrchestratorState>,
    Json(req): Json<ExternalQueryRequest>,
) -> Json<ExternalQueryResponse> {
    Json(route_external_query(&state.client, &state.registry, &req.path, &req.query).await)
}
