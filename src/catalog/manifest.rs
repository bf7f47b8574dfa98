use crate::core::{DataType, DbError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// A single column's schema entry, shared between CREATE TABLE parsing and
/// the per-table manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

/// Per-table manifest: schema, shard list, and insert defaults.
///
/// `#[serde(deny_unknown_fields)]` realises the "unknown keys or wrong
/// version -> error" load discipline from the spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub manifest_version: u32,
    pub table_name: String,
    pub table_id: String,
    pub rows_per_shard: u64,
    pub created_at: DateTime<Utc>,
    pub schema: Vec<ColumnInfo>,
    pub shards: Vec<String>,
}

const DEFAULT_ROWS_PER_SHARD: u64 = 100_000;

impl Manifest {
    pub fn new(table_name: impl Into<String>, schema: Vec<ColumnInfo>) -> Self {
        Self {
            manifest_version: 1,
            table_name: table_name.into(),
            table_id: Uuid::new_v4().to_string(),
            rows_per_shard: DEFAULT_ROWS_PER_SHARD,
            created_at: Utc::now(),
            schema,
            shards: Vec::new(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| DbError::NotFound(format!("manifest {}: {e}", path.display())))?;
        let manifest: Manifest = serde_json::from_str(&text)
            .map_err(|e| DbError::InternalError(format!("malformed manifest {}: {e}", path.display())))?;
        if manifest.manifest_version != 1 {
            return Err(DbError::InternalError(format!(
                "unsupported manifest_version {}",
                manifest.manifest_version
            )));
        }
        Ok(manifest)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        super::atomic_write_json(path.as_ref(), self)
    }

    /// Highest shard index currently present, or `None` if the table is empty.
    pub fn max_shard_index(&self) -> Option<u64> {
        self.shards.iter().filter_map(|s| parse_shard_index(s)).max()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.schema.iter().find(|c| c.name == name)
    }
}

/// Extracts `N` from a `shard-N.parquet` filename.
pub fn parse_shard_index(filename: &str) -> Option<u64> {
    let stripped = filename.strip_prefix("shard-")?;
    let digits = stripped.strip_suffix(".parquet")?;
    digits.parse().ok()
}
