use crate::catalog::ColumnInfo;
use serde::{Deserialize, Serialize};

/// Internal worker endpoint payload: a tagged union of the four statement
/// kinds the orchestrator can dispatch. Tagged on the wire via `kind`
/// rather than left to field-presence sniffing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskRequest {
    Create(CreateRequest),
    Drop(DropRequest),
    Insert(InsertRequest),
    Select(SelectRequest),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequest {
    pub db_path: String,
    pub table: String,
    pub table_schema: Vec<ColumnInfo>,
    #[serde(default)]
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropRequest {
    pub db_path: String,
    pub table: String,
    #[serde(default)]
    pub if_exists: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertRequest {
    pub db_path: String,
    pub table: String,
    pub src_path: String,
    pub rows_per_shard: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectRequest {
    pub db_path: String,
    pub raw_query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResponse {
    pub fn ok(result: impl Into<String>) -> Self {
        Self {
            ok: true,
            result: Some(result.into()),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(error.into()),
        }
    }
}
