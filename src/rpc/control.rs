use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KindType {
    Create,
    Drop,
    Insert,
    Select,
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub worker_id: String,
    pub base_url: String,
    #[serde(default)]
    pub load: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatRequest {
    pub worker_id: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub load: Option<f64>,
}

/// The user-facing request at the orchestrator's `/query` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalQueryRequest {
    /// DB root path, e.g. `db/`.
    pub path: String,
    /// Raw SQL/DDL statement text.
    pub query: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExternalQueryResponse {
    pub ok: bool,
    pub kind: KindType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExternalQueryResponse {
    pub fn failed(kind: KindType, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            kind,
            worker_id: None,
            worker_url: None,
            result: None,
            error: Some(error.into()),
        }
    }
}
