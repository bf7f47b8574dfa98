use super::engine::QueryExecutor;
use crate::catalog::{parse_shard_index, DbConn, Manifest};
use crate::core::{DataType, DbError, Result};
use crate::parser::{CreateQuery, DropQuery, InsertQuery};
use std::collections::HashSet;
use std::fs;

/// Byte width of an integer [`DataType`]'s physical representation, or
/// `None` for non-integer types. Used to detect a narrowing cast (source
/// column wider than the manifest's declared column) before committing it.
fn integer_width(dt: DataType) -> Option<u8> {
    match dt {
        DataType::TinyInt => Some(1),
        DataType::SmallInt => Some(2),
        DataType::Int => Some(4),
        DataType::BigInt => Some(8),
        _ => None,
    }
}

/// Inclusive value range representable by an integer [`DataType`].
fn integer_bounds(dt: DataType) -> Option<(i64, i64)> {
    match dt {
        DataType::TinyInt => Some((i8::MIN as i64, i8::MAX as i64)),
        DataType::SmallInt => Some((i16::MIN as i64, i16::MAX as i64)),
        DataType::Int => Some((i32::MIN as i64, i32::MAX as i64)),
        DataType::BigInt => Some((i64::MIN, i64::MAX)),
        _ => None,
    }
}

/// Byte width of a source column's integer type as DuckDB's `DESCRIBE`
/// reports it, covering the unsigned and oversized variants (`UINTEGER`,
/// `UBIGINT`, `HUGEINT`, ...) [`DataType::parse`] doesn't recognise, since
/// that vocabulary is also CREATE TABLE's user-facing type grammar and has
/// no unsigned members. Returns a width wider than any target so an
/// unsigned or 128-bit source always reads as narrowing, rather than
/// silently skipping the check.
fn source_integer_width(bare_type: &str) -> Option<u8> {
    match bare_type.to_ascii_uppercase().as_str() {
        "UTINYINT" => Some(2),
        "USMALLINT" => Some(4),
        "UINTEGER" => Some(8),
        "UBIGINT" | "HUGEINT" | "UHUGEINT" => Some(16),
        other => DataType::parse(other).ok().and_then(integer_width),
    }
}

/// Idempotent create: a table already present in the catalog is a no-op
/// when `if_not_exists` is set, an [`DbError::AlreadyExists`] otherwise.
/// Canonicalises the reference prototype's inconsistent behaviour (it
/// `mkdir`s unconditionally and would crash on a pre-existing directory).
pub fn worker_create(conn: &mut DbConn, query: &CreateQuery) -> Result<String> {
    if conn.catalog.table_id(&query.table).is_some() {
        if query.if_not_exists {
            return Ok(format!("Table '{}' already exists", query.table));
        }
        return Err(DbError::AlreadyExists(query.table.clone()));
    }

    let table_path = conn.table_dir(&query.table);
    fs::create_dir_all(&table_path)?;

    let manifest = Manifest::new(&query.table, query.schema.clone());
    manifest.save(conn.manifest_path(&query.table))?;

    conn.catalog.create_table(&query.table, manifest.table_id.clone())?;
    conn.catalog.save(&conn.catalog_path)?;

    Ok(format!("Successfully created table '{}'", query.table))
}

/// Drops the catalog entry first, then the on-disk directory, then
/// persists the catalog — so a crash between steps leaves, at worst, an
/// orphaned directory rather than a catalog entry pointing at nothing.
pub fn worker_drop(conn: &mut DbConn, query: &DropQuery) -> Result<String> {
    conn.catalog.drop_table(&query.table, query.if_exists)?;

    let table_path = conn.table_dir(&query.table);
    if table_path.exists() {
        fs::remove_dir_all(&table_path)?;
    }

    conn.catalog.save(&conn.catalog_path)?;

    Ok(format!("Successfully dropped table '{}'", query.table))
}

/// Inserts `src_path`'s rows into `query.table`, chunked into new shards
/// of `rows_per_shard` rows apiece (falling back to the manifest's
/// default). Validates the source's columns against the manifest schema
/// (missing/extra columns), rejects narrowing integer casts, and checks
/// NOT NULL columns before writing any shard, so a rejected insert leaves
/// the manifest's shard list untouched.
pub fn worker_insert(conn: &DbConn, query: &InsertQuery, engine: &dyn QueryExecutor) -> Result<String> {
    let table_path = conn.table_dir(&query.table);
    if !table_path.exists() {
        return Err(DbError::NotFound(format!("table '{}'", query.table)));
    }

    let manifest_path = conn.manifest_path(&query.table);
    let mut manifest = Manifest::load(&manifest_path)?;

    let source_columns = engine.describe_columns(&query.src_path)?;
    let source_names: HashSet<String> = source_columns.iter().map(|(n, _)| n.to_ascii_lowercase()).collect();
    let manifest_names: HashSet<String> = manifest.schema.iter().map(|c| c.name.to_ascii_lowercase()).collect();

    let missing: Vec<&str> = manifest
        .schema
        .iter()
        .filter(|c| !source_names.contains(&c.name.to_ascii_lowercase()))
        .map(|c| c.name.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(DbError::ValidationError(format!("source is missing column(s): {}", missing.join(", "))));
    }

    let extra: Vec<&str> = source_columns
        .iter()
        .filter(|(n, _)| !manifest_names.contains(&n.to_ascii_lowercase()))
        .map(|(n, _)| n.as_str())
        .collect();
    if !extra.is_empty() {
        return Err(DbError::ValidationError(format!(
            "source has column(s) not present in table schema: {}",
            extra.join(", ")
        )));
    }

    for col in manifest.schema.iter().filter(|c| !c.nullable) {
        let null_count = engine.scalar_i64(&format!(
            "SELECT count(*) FROM '{}' WHERE {} IS NULL",
            query.src_path, col.name
        ))?;
        if null_count > 0 {
            return Err(DbError::ValidationError(format!(
                "column '{}' is NOT NULL but source contains {null_count} null value(s)",
                col.name
            )));
        }
    }

    for col in &manifest.schema {
        let Some(target_width) = integer_width(col.data_type) else { continue };
        let Some((_, source_type)) = source_columns.iter().find(|(n, _)| n.eq_ignore_ascii_case(&col.name)) else {
            continue;
        };
        let bare_type = source_type.split('(').next().unwrap_or(source_type).trim();
        let Some(source_width) = source_integer_width(bare_type) else { continue };
        if source_width <= target_width {
            continue;
        }

        let (lo, hi) = integer_bounds(col.data_type).expect("integer_width implies integer_bounds");
        let violations = engine.scalar_i64(&format!(
            "SELECT count(*) FROM '{}' WHERE {} IS NOT NULL AND ({} < {lo} OR {} > {hi})",
            query.src_path, col.name, col.name, col.name
        ))?;
        if violations > 0 {
            return Err(DbError::ValidationError(format!(
                "column '{}' cannot be cast from {source_type} to {} without truncating {violations} value(s)",
                col.name,
                col.data_type.physical_type()
            )));
        }
    }

    let rows_per_shard = query.rows_per_shard.unwrap_or(manifest.rows_per_shard).max(1);
    let total_rows = engine.scalar_i64(&format!("SELECT count(*) FROM '{}'", query.src_path))?;
    let num_chunks = total_rows.div_ceil(rows_per_shard as i64).max(0) as u64;

    let projection = manifest
        .schema
        .iter()
        .map(|c| format!("CAST({} AS {}) AS {}", c.name, c.data_type.physical_type(), c.name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut next_shard = manifest.max_shard_index().map_or(0, |i| i + 1);

    for chunk in 0..num_chunks {
        let offset = chunk * rows_per_shard;
        let shard_name = format!("shard-{next_shard}.parquet");
        let tmp_path = table_path.join(format!("{shard_name}.tmp"));
        let final_path = table_path.join(&shard_name);

        let copy_sql = format!(
            "COPY (SELECT {projection} FROM '{}' LIMIT {rows_per_shard} OFFSET {offset}) TO '{}' (FORMAT PARQUET);",
            query.src_path,
            tmp_path.display()
        );
        engine.execute_statement(&copy_sql)?;
        fs::rename(&tmp_path, &final_path)?;

        manifest.shards.push(shard_name);
        next_shard += 1;
    }

    manifest.save(&manifest_path)?;

    Ok(format!("Successfully inserted data into table '{}'", query.table))
}

/// Re-derives a shard's numeric index from its filename, used when the
/// manifest's own bookkeeping needs cross-checking against what's on disk.
#[allow(dead_code)]
fn shard_index_of(shard_name: &str) -> Option<u64> {
    parse_shard_index(shard_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnInfo;
    use crate::core::DataType;
    use crate::worker::engine::ExecutionOutcome;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct FakeEngine {
        scalars: RefCell<HashMap<String, i64>>,
        columns: Vec<(String, String)>,
    }

    impl FakeEngine {
        fn new(scalars: HashMap<String, i64>) -> Self {
            Self {
                scalars: RefCell::new(scalars),
                columns: vec![("id".to_string(), "INTEGER".to_string()), ("label".to_string(), "VARCHAR".to_string())],
            }
        }

        fn with_columns(scalars: HashMap<String, i64>, columns: Vec<(&str, &str)>) -> Self {
            Self {
                scalars: RefCell::new(scalars),
                columns: columns.into_iter().map(|(n, t)| (n.to_string(), t.to_string())).collect(),
            }
        }
    }

    impl QueryExecutor for FakeEngine {
        fn execute_statement(&self, _sql: &str) -> Result<ExecutionOutcome> {
            Ok(ExecutionOutcome { rows_affected: 0 })
        }
        fn execute_select(&self, _sql: &str) -> Result<String> {
            Ok(String::new())
        }
        fn scalar_i64(&self, sql: &str) -> Result<i64> {
            Ok(self.scalars.borrow().get(sql).copied().unwrap_or(0))
        }
        fn describe_columns(&self, _source: &str) -> Result<Vec<(String, String)>> {
            Ok(self.columns.clone())
        }
    }

    fn schema() -> Vec<ColumnInfo> {
        vec![
            ColumnInfo {
                name: "id".into(),
                data_type: DataType::Int,
                nullable: false,
            },
            ColumnInfo {
                name: "label".into(),
                data_type: DataType::Varchar,
                nullable: true,
            },
        ]
    }

    #[test]
    fn create_is_idempotent_with_if_not_exists() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = DbConn::open(dir.path()).unwrap();
        let query = CreateQuery {
            table: "t".into(),
            schema: schema(),
            if_not_exists: true,
        };
        worker_create(&mut conn, &query).unwrap();
        let second = worker_create(&mut conn, &query);
        assert!(second.is_ok());
    }

    #[test]
    fn create_rejects_duplicate_without_if_not_exists() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = DbConn::open(dir.path()).unwrap();
        let query = CreateQuery {
            table: "t".into(),
            schema: schema(),
            if_not_exists: false,
        };
        worker_create(&mut conn, &query).unwrap();
        assert!(matches!(worker_create(&mut conn, &query), Err(DbError::AlreadyExists(_))));
    }

    #[test]
    fn drop_removes_directory_and_catalog_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = DbConn::open(dir.path()).unwrap();
        worker_create(
            &mut conn,
            &CreateQuery {
                table: "t".into(),
                schema: schema(),
                if_not_exists: false,
            },
        )
        .unwrap();
        assert!(conn.table_dir("t").exists());

        worker_drop(&mut conn, &DropQuery { table: "t".into(), if_exists: false }).unwrap();
        assert!(!conn.table_dir("t").exists());
        assert!(conn.catalog.table_id("t").is_none());
    }

    #[test]
    fn insert_rejects_nulls_in_not_null_column_and_leaves_shards_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = DbConn::open(dir.path()).unwrap();
        worker_create(
            &mut conn,
            &CreateQuery {
                table: "t".into(),
                schema: schema(),
                if_not_exists: false,
            },
        )
        .unwrap();

        let mut scalars = HashMap::new();
        scalars.insert("SELECT count(*) FROM 'data.csv' WHERE id IS NULL".to_string(), 1i64);
        let engine = FakeEngine::new(scalars);

        let query = InsertQuery {
            table: "t".into(),
            src_path: "data.csv".into(),
            rows_per_shard: None,
        };
        let result = worker_insert(&conn, &query, &engine);
        assert!(matches!(result, Err(DbError::ValidationError(_))));

        let manifest = Manifest::load(conn.manifest_path("t")).unwrap();
        assert!(manifest.shards.is_empty());
    }

    #[test]
    fn insert_rejects_source_missing_a_manifest_column() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = DbConn::open(dir.path()).unwrap();
        worker_create(&mut conn, &CreateQuery { table: "t".into(), schema: schema(), if_not_exists: false }).unwrap();

        let engine = FakeEngine::with_columns(HashMap::new(), vec![("id", "INTEGER")]);
        let query = InsertQuery { table: "t".into(), src_path: "data.csv".into(), rows_per_shard: None };
        let result = worker_insert(&conn, &query, &engine);
        assert!(matches!(result, Err(DbError::ValidationError(_))));

        let manifest = Manifest::load(conn.manifest_path("t")).unwrap();
        assert!(manifest.shards.is_empty());
    }

    #[test]
    fn insert_rejects_source_with_an_extra_column() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = DbConn::open(dir.path()).unwrap();
        worker_create(&mut conn, &CreateQuery { table: "t".into(), schema: schema(), if_not_exists: false }).unwrap();

        let engine = FakeEngine::with_columns(
            HashMap::new(),
            vec![("id", "INTEGER"), ("label", "VARCHAR"), ("extra", "VARCHAR")],
        );
        let query = InsertQuery { table: "t".into(), src_path: "data.csv".into(), rows_per_shard: None };
        let result = worker_insert(&conn, &query, &engine);
        assert!(matches!(result, Err(DbError::ValidationError(_))));

        let manifest = Manifest::load(conn.manifest_path("t")).unwrap();
        assert!(manifest.shards.is_empty());
    }

    #[test]
    fn insert_rejects_narrowing_cast_that_would_truncate_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = DbConn::open(dir.path()).unwrap();
        worker_create(&mut conn, &CreateQuery { table: "t".into(), schema: schema(), if_not_exists: false }).unwrap();

        // "id" is manifest type Int, but the source reports it as BIGINT
        // (wider) with at least one out-of-range value.
        let mut scalars = HashMap::new();
        scalars.insert(
            format!(
                "SELECT count(*) FROM 'data.csv' WHERE id IS NOT NULL AND (id < {} OR id > {})",
                i32::MIN,
                i32::MAX
            ),
            1i64,
        );
        let engine = FakeEngine::with_columns(scalars, vec![("id", "BIGINT"), ("label", "VARCHAR")]);

        let query = InsertQuery { table: "t".into(), src_path: "data.csv".into(), rows_per_shard: None };
        let result = worker_insert(&conn, &query, &engine);
        assert!(matches!(result, Err(DbError::ValidationError(_))));

        let manifest = Manifest::load(conn.manifest_path("t")).unwrap();
        assert!(manifest.shards.is_empty());
    }

    #[test]
    fn insert_rejects_narrowing_cast_from_an_unsigned_source_type() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = DbConn::open(dir.path()).unwrap();
        worker_create(&mut conn, &CreateQuery { table: "t".into(), schema: schema(), if_not_exists: false }).unwrap();

        // DuckDB reports an unsigned Parquet column as UINTEGER, which
        // `DataType::parse` doesn't recognise at all; it must still be
        // treated as wider than the manifest's signed `int` column.
        let mut scalars = HashMap::new();
        scalars.insert(
            format!(
                "SELECT count(*) FROM 'data.csv' WHERE id IS NOT NULL AND (id < {} OR id > {})",
                i32::MIN,
                i32::MAX
            ),
            1i64,
        );
        let engine = FakeEngine::with_columns(scalars, vec![("id", "UINTEGER"), ("label", "VARCHAR")]);

        let query = InsertQuery { table: "t".into(), src_path: "data.csv".into(), rows_per_shard: None };
        let result = worker_insert(&conn, &query, &engine);
        assert!(matches!(result, Err(DbError::ValidationError(_))));
    }

    #[test]
    fn insert_allows_widening_cast_with_matching_columns() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = DbConn::open(dir.path()).unwrap();
        worker_create(&mut conn, &CreateQuery { table: "t".into(), schema: schema(), if_not_exists: false }).unwrap();

        let mut scalars = HashMap::new();
        scalars.insert("SELECT count(*) FROM 'data.csv'".to_string(), 0i64);
        let engine = FakeEngine::with_columns(scalars, vec![("id", "TINYINT"), ("label", "VARCHAR")]);

        let query = InsertQuery { table: "t".into(), src_path: "data.csv".into(), rows_per_shard: None };
        assert!(worker_insert(&conn, &query, &engine).is_ok());
    }
}
