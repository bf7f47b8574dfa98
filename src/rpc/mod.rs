mod control;
mod task;

pub use control::{ExternalQueryRequest, ExternalQueryResponse, HeartbeatRequest, KindType, RegisterRequest};
pub use task::{CreateRequest, DropRequest, InsertRequest, SelectRequest, TaskRequest, TaskResponse};
