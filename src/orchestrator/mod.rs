mod client;
mod dispatcher;
pub mod http;

pub use client::send_task;
pub use dispatcher::{orchestrate_create, orchestrate_drop, orchestrate_insert, orchestrate_select, route_external_query};
pub use http::{router, OrchestratorState};
