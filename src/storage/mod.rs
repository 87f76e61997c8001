//! Persistence: a directory tree of JSON documents
//!
//! Layout:
//!
//! ```text
//! <base>/
//!   <dbname>/
//!     meta.json            database manifest
//!     <tablename>/
//!       meta.json          table manifest (schema, last_insert_id)
//!       data.json          ordered row array
//! ```
//!
//! Every write goes through [`write_atomic`]: content lands in a sibling
//! `.tmp` file first and is renamed into place, so an interrupted save
//! never leaves a half-written document readable.

pub mod loader;
pub mod writer;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::ColumnDef;

pub const MANIFEST_FILE: &str = "meta.json";
pub const DATA_FILE: &str = "data.json";

const MANIFEST_VERSION: u32 = 1;

/// Database manifest (`<db>/meta.json`). The `tables` list is advisory;
/// the loader discovers tables by directory enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseManifest {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub tables: Vec<String>,
}

impl DatabaseManifest {
    pub fn new(name: impl Into<String>, tables: Vec<String>) -> Self {
        Self {
            name: name.into(),
            version: MANIFEST_VERSION,
            tables,
        }
    }
}

fn default_version() -> u32 {
    MANIFEST_VERSION
}

/// Table manifest (`<db>/<table>/meta.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableManifest {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub last_insert_id: i64,
    #[serde(default)]
    pub row_count: usize,
}

/// Write `bytes` to `path` through a sibling temporary file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, bytes).map_err(|e| Error::storage("write", &tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| Error::storage("rename", path, e))
}

/// Read and parse a JSON document.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| Error::storage("read", path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| Error::Corrupt {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Serialize a JSON document and write it atomically.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| Error::Corrupt {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    write_atomic(path, &bytes)
}
