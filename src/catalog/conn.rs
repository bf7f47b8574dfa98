use super::Catalog;
use crate::core::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// A handle onto one database root: its directory, its catalog file, and
/// the in-memory `Catalog` loaded from (or freshly written to) it.
pub struct DbConn {
    pub path: PathBuf,
    pub catalog_path: PathBuf,
    pub catalog: Catalog,
}

impl DbConn {
    /// Opens (creating if absent) the database rooted at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;
        let catalog_path = path.join("catalog.json");

        let catalog = if catalog_path.exists() {
            Catalog::load(&catalog_path)?
        } else {
            let catalog = Catalog::default();
            catalog.save(&catalog_path)?;
            catalog
        };

        Ok(Self {
            path,
            catalog_path,
            catalog,
        })
    }

    pub fn table_dir(&self, table: &str) -> PathBuf {
        self.path.join(table)
    }

    pub fn manifest_path(&self, table: &str) -> PathBuf {
        self.table_dir(table).join("manifest.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_on_fresh_directory_writes_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let db_root = dir.path().join("db");
        let conn = DbConn::open(&db_root).unwrap();
        assert!(conn.catalog_path.exists());
        assert!(conn.catalog.tables.is_empty());
    }

    #[test]
    fn reopening_loads_existing_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let db_root = dir.path().join("db");
        let mut first = DbConn::open(&db_root).unwrap();
        first.catalog.create_table("t", "id-1".into()).unwrap();
        first.catalog.save(&first.catalog_path).unwrap();

        let second = DbConn::open(&db_root).unwrap();
        assert_eq!(second.catalog.table_id("t"), Some("id-1"));
    }
}
