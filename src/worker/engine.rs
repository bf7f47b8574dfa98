use crate::core::{DbError, Result};
use duckdb::Connection;
use std::sync::Mutex;

/// Outcome of a materialising statement (a planner-emitted `COPY ... TO
/// ...`), as opposed to a passthrough `SELECT` whose rows are returned to
/// the caller as text.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub rows_affected: u64,
}

/// The narrow "run this statement" boundary the worker's task handlers
/// dispatch through. Kept as a trait so tests can swap in a fake without
/// an embedded DuckDB instance.
pub trait QueryExecutor: Send + Sync {
    fn execute_statement(&self, sql: &str) -> Result<ExecutionOutcome>;
    fn execute_select(&self, sql: &str) -> Result<String>;
    /// Runs a single-row, single-column aggregate query (row counts, null
    /// counts) used by insert-time validation and shard-chunk sizing.
    fn scalar_i64(&self, sql: &str) -> Result<i64>;
    /// Describes `source`'s actual columns as reported by the engine
    /// (name, declared type string), used to validate a source against a
    /// table's manifest schema before any cast or shard write.
    fn describe_columns(&self, source: &str) -> Result<Vec<(String, String)>>;
}

/// DuckDB-backed executor: one connection per worker process, reused for
/// every statement. Single-writer, so callers serialise through the same
/// `Mutex<Connection>` the teacher's storage layer uses around shared
/// mutable state.
pub struct DuckDbExecutor {
    conn: Mutex<Connection>,
}

impl DuckDbExecutor {
    pub fn open_in_memory(threads: Option<u32>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        if let Some(threads) = threads {
            conn.execute_batch(&format!("PRAGMA threads={threads};"))?;
        }
        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl QueryExecutor for DuckDbExecutor {
    fn execute_statement(&self, sql: &str) -> Result<ExecutionOutcome> {
        let conn = self.conn.lock().map_err(|_| DbError::InternalError("engine connection poisoned".to_string()))?;
        conn.execute_batch(sql)?;
        Ok(ExecutionOutcome { rows_affected: 0 })
    }

    fn execute_select(&self, sql: &str) -> Result<String> {
        let conn = self.conn.lock().map_err(|_| DbError::InternalError("engine connection poisoned".to_string()))?;
        let mut stmt = conn.prepare(sql)?;
        let column_count = stmt.column_count();
        let column_names: Vec<String> = (0..column_count).map(|i| stmt.column_name(i).unwrap_or_default().to_string()).collect();

        let mut rows = stmt.query([])?;
        let mut lines = vec![column_names.join(",")];
        while let Some(row) = rows.next()? {
            let mut fields = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value: duckdb::types::Value = row.get(i)?;
                fields.push(format!("{value:?}"));
            }
            lines.push(fields.join(","));
        }
        Ok(lines.join("\n"))
    }

    fn scalar_i64(&self, sql: &str) -> Result<i64> {
        let conn = self.conn.lock().map_err(|_| DbError::InternalError("engine connection poisoned".to_string()))?;
        Ok(conn.query_row(sql, [], |row| row.get(0))?)
    }

    fn describe_columns(&self, source: &str) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock().map_err(|_| DbError::InternalError("engine connection poisoned".to_string()))?;
        let mut stmt = conn.prepare(&format!("DESCRIBE SELECT * FROM '{source}'"))?;
        let mut rows = stmt.query([])?;
        let mut columns = Vec::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            let col_type: String = row.get(1)?;
            columns.push((name, col_type));
        }
        Ok(columns)
    }
}
