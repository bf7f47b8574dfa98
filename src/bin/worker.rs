use clap::Parser;
use shardwarehouse::worker::heartbeat::{registration_and_heartbeat_loop, HeartbeatConfig};
use shardwarehouse::worker::{router, DuckDbExecutor, WorkerState};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Executes CREATE/DROP/INSERT and the materialising statements an
/// orchestrator's plan dispatches, against a single embedded DuckDB
/// connection.
#[derive(Parser, Debug)]
#[command(name = "worker")]
struct Cli {
    #[arg(long, env = "WORKER_ID")]
    worker_id: Option<String>,

    #[arg(long, env = "ORCHESTRATOR_URL", default_value = "http://127.0.0.1:8000")]
    orchestrator_url: String,

    #[arg(long, env = "HEARTBEAT_SECONDS", default_value_t = 5.0)]
    heartbeat_seconds: f64,

    #[arg(long, env = "BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8001")]
    bind_addr: String,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// `PRAGMA threads` for the embedded engine.
    #[arg(long, env = "DUCKDB_THREADS")]
    threads: Option<u32>,
}

fn default_worker_id() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let worker_id = cli.worker_id.unwrap_or_else(default_worker_id);
    let base_url = cli.base_url.unwrap_or_else(|| format!("http://127.0.0.1:{}", port_of(&cli.bind_addr)));

    let heartbeat_cfg = HeartbeatConfig {
        worker_id: worker_id.clone(),
        base_url,
        orchestrator_url: cli.orchestrator_url.trim_end_matches('/').to_string(),
        heartbeat_interval: Duration::from_secs_f64(cli.heartbeat_seconds),
    };
    tokio::spawn(registration_and_heartbeat_loop(heartbeat_cfg));

    let engine = Arc::new(DuckDbExecutor::open_in_memory(cli.threads)?);
    let state = WorkerState { engine };

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&cli.bind_addr).await?;
    tracing::info!(worker_id = %worker_id, addr = %cli.bind_addr, "worker listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn port_of(bind_addr: &str) -> &str {
    bind_addr.rsplit(':').next().unwrap_or("8001")
}
