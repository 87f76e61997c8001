//! Saving databases to disk, plus database directory management

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::{DatabaseManifest, TableManifest, DATA_FILE, MANIFEST_FILE};
use crate::database::{Database, Table};
use crate::error::{Error, Result};
use crate::types::Row;

/// Save a database: manifest plus every table that is dirty or not yet
/// on disk. Clean tables are skipped.
pub fn save_database(db: &Database) -> Result<()> {
    fs::create_dir_all(&db.path).map_err(|e| Error::storage("create dir", &db.path, e))?;

    let mut table_names: Vec<String> = db.tables().map(|t| t.name().to_string()).collect();
    table_names.sort();
    write_db_manifest(&db.path, &DatabaseManifest::new(db.name.clone(), table_names))?;

    let mut saved = 0;
    for table in db.tables() {
        let table_dir = db.path.join(table.name());
        if !table.is_dirty() && table_dir.join(MANIFEST_FILE).is_file() {
            debug!(table = table.name(), "table clean, skipping save");
            continue;
        }
        save_table(&table_dir, table)?;
        table.mark_clean();
        saved += 1;
    }

    info!(database = %db.name, tables_written = saved, "database saved");
    Ok(())
}

/// Write one table directory: manifest then data, each atomically.
pub fn save_table(dir: &Path, table: &Table) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::storage("create dir", dir, e))?;

    let snapshot = table.snapshot();
    let manifest = TableManifest {
        name: table.name().to_string(),
        columns: table.schema().columns.clone(),
        last_insert_id: snapshot.last_insert_id,
        row_count: snapshot.rows.len(),
    };
    super::write_json(&dir.join(MANIFEST_FILE), &manifest)?;

    let data: Vec<serde_json::Value> = snapshot.rows.iter().map(row_to_json).collect();
    super::write_json(&dir.join(DATA_FILE), &data)
}

// Rows go through serde_json::Map so the key order is deterministic.
fn row_to_json(row: &Row) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (k, v) in row {
        map.insert(k.clone(), serde_json::to_value(v).unwrap_or(serde_json::Value::Null));
    }
    serde_json::Value::Object(map)
}

/// Create a new database directory with an empty manifest.
pub fn create_database(name: &str, base: &Path) -> Result<()> {
    let path = base.join(name);
    if path.exists() {
        return Err(Error::DatabaseExists(name.to_string()));
    }
    fs::create_dir_all(&path).map_err(|e| Error::storage("create dir", &path, e))?;
    write_db_manifest(&path, &DatabaseManifest::new(name, Vec::new()))?;
    info!(database = name, path = %path.display(), "database created");
    Ok(())
}

/// Remove a database directory.
pub fn drop_database(name: &str, base: &Path) -> Result<()> {
    let path = base.join(name);
    if !path.exists() {
        return Err(Error::DatabaseNotFound(name.to_string()));
    }
    fs::remove_dir_all(&path).map_err(|e| Error::storage("remove dir", &path, e))?;
    info!(database = name, "database dropped");
    Ok(())
}

/// Rename a database directory and rewrite its manifest to match.
pub fn rename_database(old: &str, new: &str, base: &Path) -> Result<()> {
    let old_path = base.join(old);
    let new_path = base.join(new);
    if !old_path.exists() {
        return Err(Error::DatabaseNotFound(old.to_string()));
    }
    if new_path.exists() {
        return Err(Error::DatabaseExists(new.to_string()));
    }
    fs::rename(&old_path, &new_path).map_err(|e| Error::storage("rename", &old_path, e))?;

    let manifest_path = new_path.join(MANIFEST_FILE);
    let mut manifest: DatabaseManifest = super::read_json(&manifest_path)?;
    manifest.name = new.to_string();
    super::write_json(&manifest_path, &manifest)?;

    info!(from = old, to = new, "database renamed");
    Ok(())
}

/// Every directory under `base` holding a readable database manifest.
pub fn list_databases(base: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(base).map_err(|e| Error::storage("read dir", base, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::storage("read dir", base, e))?;
        let path = entry.path();
        if path.is_dir() && path.join(MANIFEST_FILE).is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

fn write_db_manifest(path: &Path, manifest: &DatabaseManifest) -> Result<()> {
    super::write_json(&path.join(MANIFEST_FILE), manifest)
}
