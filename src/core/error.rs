use thiserror::Error;

/// Error taxonomy observable at the `/query` and `/tasks/execute` boundaries.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Table '{0}' not found")]
    NotFound(String),

    #[error("Table '{0}' already exists")]
    AlreadyExists(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("No active workers")]
    NoWorkers,

    #[error("Timed out waiting for an active worker")]
    WorkerWaitTimeout,

    #[error("Worker error at level {level}, step {step}: {message}")]
    WorkerError {
        level: usize,
        step: usize,
        message: String,
    },

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        Self::InternalError(format!("I/O error: {err}"))
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        Self::InternalError(format!("JSON error: {err}"))
    }
}

impl From<reqwest::Error> for DbError {
    fn from(err: reqwest::Error) -> Self {
        Self::WorkerError {
            level: 0,
            step: 0,
            message: format!("transport failure: {err}"),
        }
    }
}

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        Self::InternalError(format!("engine error: {err}"))
    }
}
