use super::client::send_task;
use crate::catalog::DbConn;
use crate::core::{DbError, Result};
use crate::parser::{self, Query};
use crate::planner::build_plan;
use crate::registry::{WorkerInfo, WorkerRegistry};
use crate::rpc::{
    CreateRequest, DropRequest, ExternalQueryResponse, InsertRequest, KindType, SelectRequest, TaskRequest,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const WORKER_WAIT_TIMEOUT: Duration = Duration::from_secs(60);
const WORKER_WAIT_POLL: Duration = Duration::from_millis(500);

pub async fn orchestrate_create(
    client: &reqwest::Client,
    registry: &WorkerRegistry,
    conn: &DbConn,
    query: crate::parser::CreateQuery,
) -> ExternalQueryResponse {
    let kind = KindType::Create;
    let Some(worker) = registry.choose_worker() else {
        return ExternalQueryResponse::failed(kind, "No active workers");
    };

    let task = TaskRequest::Create(CreateRequest {
        db_path: conn.path.display().to_string(),
        table: query.table,
        table_schema: query.schema,
        if_not_exists: query.if_not_exists,
    });

    respond(kind, &worker, send_task(client, &worker.base_url, task).await)
}

pub async fn orchestrate_drop(
    client: &reqwest::Client,
    registry: &WorkerRegistry,
    conn: &DbConn,
    query: crate::parser::DropQuery,
) -> ExternalQueryResponse {
    let kind = KindType::Drop;
    let Some(worker) = registry.choose_worker() else {
        return ExternalQueryResponse::failed(kind, "No active workers");
    };

    let task = TaskRequest::Drop(DropRequest {
        db_path: conn.path.display().to_string(),
        table: query.table,
        if_exists: query.if_exists,
    });

    respond(kind, &worker, send_task(client, &worker.base_url, task).await)
}

pub async fn orchestrate_insert(
    client: &reqwest::Client,
    registry: &WorkerRegistry,
    conn: &DbConn,
    query: crate::parser::InsertQuery,
) -> ExternalQueryResponse {
    let kind = KindType::Insert;
    let Some(worker) = registry.choose_worker() else {
        return ExternalQueryResponse::failed(kind, "No active workers");
    };

    let task = TaskRequest::Insert(InsertRequest {
        db_path: conn.path.display().to_string(),
        table: query.table,
        src_path: query.src_path,
        rows_per_shard: query.rows_per_shard,
    });

    respond(kind, &worker, send_task(client, &worker.base_url, task).await)
}

fn respond(kind: KindType, worker: &WorkerInfo, result: Result<crate::rpc::TaskResponse>) -> ExternalQueryResponse {
    match result {
        Ok(resp) => ExternalQueryResponse {
            ok: resp.ok,
            kind,
            worker_id: Some(worker.worker_id.clone()),
            worker_url: Some(worker.base_url.clone()),
            result: resp.result,
            error: resp.error,
        },
        Err(err) => ExternalQueryResponse::failed(kind, err.to_string()),
    }
}

async fn wait_for_worker(registry: &WorkerRegistry, wait_start: std::time::Instant) -> Result<WorkerInfo> {
    loop {
        if let Some(worker) = registry.choose_worker() {
            return Ok(worker);
        }
        if wait_start.elapsed() > WORKER_WAIT_TIMEOUT {
            return Err(DbError::WorkerWaitTimeout);
        }
        tokio::time::sleep(WORKER_WAIT_POLL).await;
    }
}

pub async fn orchestrate_select(
    client: &reqwest::Client,
    registry: &WorkerRegistry,
    conn: &DbConn,
    query: crate::parser::SelectQuery,
) -> ExternalQueryResponse {
    let kind = KindType::Select;

    let tmp_path = conn.path.join("tmp");
    if let Err(err) = std::fs::create_dir_all(&tmp_path) {
        return ExternalQueryResponse::failed(kind, err.to_string());
    }
    let out_path = conn.path.join("out.parquet");

    let manifest = match crate::catalog::Manifest::load(conn.manifest_path(&query.table)) {
        Ok(m) => m,
        Err(err) => return ExternalQueryResponse::failed(kind, err.to_string()),
    };
    if manifest.shards.is_empty() {
        return ExternalQueryResponse::failed(kind, format!("No shards found for table {}", query.table));
    }

    let plan = build_plan(&query, &manifest.shards, &conn.path, &tmp_path, &out_path);
    info!(levels = plan.levels.len(), jobs = plan.total_jobs(), "executing plan");

    let wait_start = std::time::Instant::now();

    for (level_i, level_sqls) in plan.levels.iter().enumerate() {
        for sql in level_sqls {
            let worker = match wait_for_worker(registry, wait_start).await {
                Ok(w) => w,
                Err(err) => return ExternalQueryResponse::failed(kind, err.to_string()),
            };

            let task = TaskRequest::Select(SelectRequest {
                db_path: conn.path.display().to_string(),
                raw_query: sql.clone(),
            });

            match send_task(client, &worker.base_url, task).await {
                Ok(resp) if resp.ok => {}
                Ok(resp) => {
                    return ExternalQueryResponse::failed(
                        kind,
                        format!(
                            "Execution failed at level {level_i}: {}",
                            resp.error.unwrap_or_default()
                        ),
                    );
                }
                Err(err) => {
                    return ExternalQueryResponse::failed(kind, format!("Execution failed at level {level_i}: {err}"));
                }
            }
        }
        info!(level = level_i, statements = level_sqls.len(), "completed level");
    }

    let _ = std::fs::remove_dir_all(&tmp_path);

    ExternalQueryResponse {
        ok: true,
        kind,
        worker_id: None,
        worker_url: None,
        result: Some(format!("Successfully executed select, result in {}", out_path.display())),
        error: None,
    }
}

/// Parses `raw_query` and dispatches it to the matching orchestration path.
pub async fn route_external_query(
    client: &reqwest::Client,
    registry: &Arc<WorkerRegistry>,
    db_path: &str,
    raw_query: &str,
) -> ExternalQueryResponse {
    let conn = match DbConn::open(Path::new(db_path)) {
        Ok(conn) => conn,
        Err(err) => return ExternalQueryResponse::failed(KindType::Unknown, err.to_string()),
    };

    let query = match parser::parse(raw_query) {
        Ok(q) => q,
        Err(err) => return ExternalQueryResponse::failed(KindType::Unknown, err.to_string()),
    };

    match query {
        Query::Create(q) => orchestrate_create(client, registry, &conn, q).await,
        Query::Drop(q) => orchestrate_drop(client, registry, &conn, q).await,
        Query::Insert(q) => orchestrate_insert(client, registry, &conn, q).await,
        Query::Select(q) => orchestrate_select(client, registry, &conn, q).await,
    }
}
