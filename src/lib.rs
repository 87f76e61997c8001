//! GrainDB
//!
//! A small embeddable relational engine: SQL text in, rows or a row
//! count out, state persisted as a directory tree of human-readable
//! JSON documents.
//!
//! ## Architecture
//! - SQL layer: lexer -> recursive-descent parser -> AST
//! - Query layer: planner (validation, literal coercion, predicate
//!   compilation) -> plan tree -> tree-walking executor with hash joins
//! - Catalog: registry of lazily loaded databases; per-table
//!   reader-writer locks; unique indexes maintained on every write
//! - Storage: one directory per database, JSON manifests and row data,
//!   atomic file replacement
//!
//! ## Example
//! ```no_run
//! use graindb::Engine;
//!
//! # fn main() -> graindb::Result<()> {
//! let engine = Engine::open("databases")?;
//! let mut session = engine.session();
//! session.execute("CREATE DATABASE shop")?;
//! session.execute("USE shop")?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod database;
pub mod query;
pub mod sql;
pub mod storage;
pub mod types;

mod engine;
mod error;

pub use catalog::Registry;
pub use config::EngineConfig;
pub use database::{Database, Table};
pub use engine::{Engine, Session};
pub use error::{Error, Result};
pub use query::QueryOutput;
pub use types::{ColumnDef, ColumnType, TableSchema, Value};
