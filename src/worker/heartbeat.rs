use crate::rpc::{HeartbeatRequest, RegisterRequest};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    pub worker_id: String,
    pub base_url: String,
    pub orchestrator_url: String,
    pub heartbeat_interval: Duration,
}

/// Registers with the orchestrator, retrying every second until it
/// succeeds. Mirrors `original_source/worker/client.py`'s
/// `register_once_with_retries`: transport errors and non-2xx responses
/// are both swallowed and retried rather than surfaced to the caller.
pub async fn register_with_retry(client: &reqwest::Client, cfg: &HeartbeatConfig) {
    let payload = RegisterRequest {
        worker_id: cfg.worker_id.clone(),
        base_url: cfg.base_url.clone(),
        load: 0.0,
    };

    loop {
        let attempt = client
            .post(format!("{}/workers/register", cfg.orchestrator_url))
            .json(&payload)
            .send()
            .await;

        match attempt {
            Ok(resp) if resp.status().is_success() => {
                info!(worker_id = %cfg.worker_id, "registered with orchestrator");
                return;
            }
            Ok(resp) => warn!(status = %resp.status(), "registration rejected, retrying"),
            Err(err) => warn!(error = %err, "registration request failed, retrying"),
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

/// Background task: register once, then heartbeat forever. A 404 from the
/// heartbeat endpoint means the orchestrator forgot this worker (restart,
/// TTL expiry) and triggers re-registration.
pub async fn registration_and_heartbeat_loop(cfg: HeartbeatConfig) {
    let client = reqwest::Client::new();
    register_with_retry(&client, &cfg).await;

    loop {
        let payload = HeartbeatRequest {
            worker_id: cfg.worker_id.clone(),
            base_url: None,
            load: Some(0.0),
        };

        match client
            .post(format!("{}/workers/heartbeat", cfg.orchestrator_url))
            .json(&payload)
            .send()
            .await
        {
            Ok(resp) if resp.status() == reqwest::StatusCode::NOT_FOUND => {
                warn!("orchestrator forgot this worker, re-registering");
                register_with_retry(&client, &cfg).await;
            }
            Ok(resp) if !resp.status().is_success() => {
                warn!(status = %resp.status(), "heartbeat rejected");
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "heartbeat request failed"),
        }

        tokio::time::sleep(cfg.heartbeat_interval).await;
    }
}
