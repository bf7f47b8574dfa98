pub mod engine;
mod executor;
pub mod heartbeat;
pub mod http;

pub use engine::{DuckDbExecutor, ExecutionOutcome, QueryExecutor};
pub use executor::{worker_create, worker_drop, worker_insert};
pub use heartbeat::{registration_and_heartbeat_loop, HeartbeatConfig};
pub use http::{router, WorkerState};
