use crate::core::{DbError, Result};
use crate::rpc::{TaskRequest, TaskResponse};

/// Sends one task to a worker's `/tasks/execute` endpoint and returns its
/// response. Transport failures (connection refused, timeout) surface as
/// [`DbError::WorkerError`] rather than panicking the dispatch loop.
pub async fn send_task(client: &reqwest::Client, worker_base_url: &str, task: TaskRequest) -> Result<TaskResponse> {
    let resp = client
        .post(format!("{worker_base_url}/tasks/execute"))
        .json(&task)
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(DbError::WorkerError {
            level: 0,
            step: 0,
            message: format!("worker returned HTTP {}", resp.status()),
        });
    }

    Ok(resp.json::<TaskResponse>().await?)
}
