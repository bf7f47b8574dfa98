use super::engine::QueryExecutor;
use super::executor::{worker_create, worker_drop, worker_insert};
use crate::catalog::DbConn;
use crate::core::Result;
use crate::parser::{CreateQuery, DropQuery, InsertQuery};
use crate::rpc::{TaskRequest, TaskResponse};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Clone)]
pub struct WorkerState {
    pub engine: Arc<dyn QueryExecutor>,
}

pub fn router(state: WorkerState) -> Router {
    Router::new()
        .route("/tasks/execute", post(execute_task))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

/// Single internal endpoint for all task kinds, mirroring
/// `original_source/worker/api.py`'s `execute_task`.
async fn execute_task(State(state): State<WorkerState>, Json(task): Json<TaskRequest>) -> Json<TaskResponse> {
    info!(?task, "executing task");
    let engine = state.engine.clone();

    let outcome = tokio::task::spawn_blocking(move || handle_task(task, engine.as_ref())).await;

    match outcome {
        Ok(Ok(resp)) => Json(resp),
        Ok(Err(err)) => {
            error!(error = %err, "task failed");
            Json(TaskResponse::err(err.to_string()))
        }
        Err(join_err) => Json(TaskResponse::err(format!("task panicked: {join_err}"))),
    }
}

fn handle_task(task: TaskRequest, engine: &dyn QueryExecutor) -> Result<TaskResponse> {
    match task {
        TaskRequest::Create(req) => {
            let mut conn = DbConn::open(&req.db_path)?;
            let query = CreateQuery {
                table: req.table,
                schema: req.table_schema,
                if_not_exists: req.if_not_exists,
            };
            worker_create(&mut conn, &query).map(TaskResponse::ok)
        }
        TaskRequest::Drop(req) => {
            let mut conn = DbConn::open(&req.db_path)?;
            let query = DropQuery {
                table: req.table,
                if_exists: req.if_exists,
            };
            worker_drop(&mut conn, &query).map(TaskResponse::ok)
        }
        TaskRequest::Insert(req) => {
            let conn = DbConn::open(&req.db_path)?;
            let query = InsertQuery {
                table: req.table,
                src_path: req.src_path,
                rows_per_shard: req.rows_per_shard,
            };
            worker_insert(&conn, &query, engine).map(TaskResponse::ok)
        }
        TaskRequest::Select(req) => {
            let _conn = DbConn::open(&req.db_path)?;
            engine.execute_statement(&req.raw_query)?;
            Ok(TaskResponse::ok("Statement executed successfully"))
        }
    }
}
