//! Error types for the GrainDB engine

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Value;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Lexing
    #[error("lex error at {line}:{column}: unexpected input {text:?}")]
    Lex {
        line: usize,
        column: usize,
        text: String,
    },

    // Parsing
    #[error("parse error at {line}:{column}: {message} (near {token:?})")]
    Parse {
        message: String,
        token: String,
        line: usize,
        column: usize,
    },

    // Planning
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("type mismatch for column '{column}': {detail}")]
    TypeMismatch { column: String, detail: String },

    #[error("column count ({columns}) does not match value count ({values})")]
    ArityMismatch { columns: usize, values: usize },

    #[error("unsupported join condition: {0}")]
    UnsupportedJoinCondition(String),

    // Execution
    #[error("no database selected. Use 'USE <database_name>' to select one")]
    NoDatabaseSelected,

    #[error("ambiguous column reference: {0}")]
    AmbiguousColumn(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    // Constraints
    #[error("unique violation on {table}.{column}: value {value:?} already exists")]
    UniqueViolation {
        table: String,
        column: String,
        value: Value,
    },

    #[error("not-null violation on {table}.{column}")]
    NotNullViolation { table: String, column: String },

    #[error("invalid schema for table '{table}': {detail}")]
    InvalidSchema { table: String, detail: String },

    // Storage
    #[error("storage {op} failed for {path}: {source}")]
    Storage {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt document at {path}: {detail}")]
    Corrupt { path: PathBuf, detail: String },

    #[error("database '{0}' already exists")]
    DatabaseExists(String),

    #[error("database '{0}' does not exist")]
    DatabaseNotFound(String),
}

impl Error {
    /// Wrap an io error with the operation name and the path it touched.
    pub fn storage(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Storage {
            op,
            path: path.into(),
            source,
        }
    }

    /// True for errors caused by the statement rather than the engine.
    /// User errors are expected in normal operation and are not logged
    /// at error level.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Error::Storage { .. } | Error::Corrupt { .. })
    }
}
