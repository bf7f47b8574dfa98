use clap::Parser;
use shardwarehouse::orchestrator::{router, OrchestratorState};
use shardwarehouse::registry::WorkerRegistry;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// External-facing control plane: accepts `/query` statements, tracks live
/// workers, and drives SELECT plans to completion.
#[derive(Parser, Debug)]
#[command(name = "orchestrator")]
struct Cli {
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    bind_addr: String,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let state = OrchestratorState {
        registry: Arc::new(WorkerRegistry::default()),
        client: reqwest::Client::new(),
    };

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&cli.bind_addr).await?;
    tracing::info!(addr = %cli.bind_addr, "orchestrator listening");
    axum::serve(listener, app).await?;

    Ok(())
}
