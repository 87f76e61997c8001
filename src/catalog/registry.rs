//! Registry of loaded databases
//!
//! One mutex guards the name-to-database map. A database loads lazily on
//! first use and stays cached for the process lifetime; its internal
//! concurrency is the per-table reader-writer discipline. `save_all`
//! copies the handle list out of the lock before doing I/O.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;

use crate::database::Database;
use crate::error::{Error, Result};
use crate::storage::{loader, writer};

pub struct Registry {
    loaded: Mutex<HashMap<String, Arc<Database>>>,
    base: PathBuf,
}

impl Registry {
    /// Create a registry over a base directory, creating it if needed.
    pub fn new(base: impl Into<PathBuf>) -> Result<Self> {
        let base = base.into();
        fs::create_dir_all(&base).map_err(|e| Error::storage("create dir", &base, e))?;
        Ok(Self {
            loaded: Mutex::new(HashMap::new()),
            base,
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Get a database, loading it from disk on first use.
    pub fn get(&self, name: &str) -> Result<Arc<Database>> {
        let mut loaded = self.loaded.lock();
        if let Some(db) = loaded.get(name) {
            return Ok(Arc::clone(db));
        }

        let path = self.base.join(name);
        if !path.is_dir() {
            return Err(Error::DatabaseNotFound(name.to_string()));
        }
        let db = Arc::new(loader::load_database(&path)?);
        loaded.insert(name.to_string(), Arc::clone(&db));
        Ok(db)
    }

    /// Create a new, empty database on disk. The new database is not
    /// loaded.
    pub fn create(&self, name: &str) -> Result<()> {
        let loaded = self.loaded.lock();
        if loaded.contains_key(name) {
            return Err(Error::DatabaseExists(name.to_string()));
        }
        writer::create_database(name, &self.base)
    }

    /// Drop a database: evict it from the map and delete it on disk.
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut loaded = self.loaded.lock();
        loaded.remove(name);
        writer::drop_database(name, &self.base)
    }

    /// Rename a database. A loaded database is saved and evicted first;
    /// the new name is not preloaded.
    pub fn rename(&self, old: &str, new: &str) -> Result<()> {
        let mut loaded = self.loaded.lock();
        if let Some(db) = loaded.get(old) {
            writer::save_database(db)?;
            loaded.remove(old);
        }
        writer::rename_database(old, new, &self.base)
    }

    /// All databases present on disk.
    pub fn list(&self) -> Result<Vec<String>> {
        writer::list_databases(&self.base)
    }

    /// Save every loaded database. Failures are logged per database and
    /// do not stop the loop.
    pub fn save_all(&self) {
        let databases: Vec<Arc<Database>> = self.loaded.lock().values().cloned().collect();
        for db in databases {
            if let Err(e) = writer::save_database(&db) {
                error!(database = %db.name, error = %e, "failed to save database");
            }
        }
    }
}
