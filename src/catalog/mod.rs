mod conn;
pub mod manifest;

pub use conn::DbConn;
pub use manifest::{ColumnInfo, Manifest};

use crate::core::{DbError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Write-temp-then-rename: a process killed mid-write leaves the previous
/// contents of `path` untouched. Serializes through `serde_json::Value` (a
/// `BTreeMap` under the hood without the `preserve_order` feature) so keys
/// come out sorted regardless of the struct's field declaration order.
pub(crate) fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let as_value = serde_json::to_value(value)?;
    let mut text = serde_json::to_string_pretty(&as_value)?;
    text.push('\n');

    let tmp_path = path.with_extension("tmp");
    let mut tmp_file = fs::File::create(&tmp_path)?;
    tmp_file.write_all(text.as_bytes())?;
    tmp_file.sync_all()?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableEntry {
    pub table_id: String,
}

/// Per-database table registry, persisted as `catalog.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub tables: BTreeMap<String, TableEntry>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            version: 1,
            created_at: Utc::now(),
            tables: BTreeMap::new(),
        }
    }
}

impl Catalog {
    /// Missing catalog file means a fresh database: return an empty one.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        let catalog: Catalog = serde_json::from_str(&text)?;
        if catalog.version != 1 {
            return Err(DbError::InternalError(format!(
                "unsupported catalog version {}",
                catalog.version
            )));
        }
        Ok(catalog)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        atomic_write_json(path.as_ref(), self)
    }

    pub fn create_table(&mut self, name: &str, table_id: String) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(DbError::AlreadyExists(name.to_string()));
        }
        self.tables.insert(name.to_string(), TableEntry { table_id });
        Ok(())
    }

    pub fn drop_table(&mut self, name: &str, exist_ok: bool) -> Result<()> {
        if self.tables.remove(name).is_none() && !exist_ok {
            return Err(DbError::NotFound(name.to_string()));
        }
        Ok(())
    }

    pub fn table_id(&self, name: &str) -> Option<&str> {
        self.tables.get(name).map(|e| e.table_id.as_str())
    }
}
