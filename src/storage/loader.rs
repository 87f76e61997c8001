//! Loading databases and tables from disk

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use super::{DatabaseManifest, TableManifest, DATA_FILE, MANIFEST_FILE};
use crate::database::{Database, Table};
use crate::error::{Error, Result};
use crate::types::{coerce_value, Row, TableSchema};

/// Load a database from its directory. Tables are discovered by
/// enumeration: every subdirectory with a readable table manifest is a
/// table, anything else is ignored.
pub fn load_database(path: &Path) -> Result<Database> {
    let manifest: DatabaseManifest = super::read_json(&path.join(MANIFEST_FILE))?;

    // The directory name is authoritative; a stale manifest name can
    // survive a crash between rename and rewrite.
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| manifest.name.clone());
    if name != manifest.name {
        warn!(directory = %name, manifest = %manifest.name, "database manifest name differs from directory");
    }

    let mut db = Database::new(name, path);
    let entries = fs::read_dir(path).map_err(|e| Error::storage("read dir", path, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::storage("read dir", path, e))?;
        let table_path = entry.path();
        if !table_path.is_dir() || !table_path.join(MANIFEST_FILE).is_file() {
            continue;
        }
        db.add_table(load_table(&table_path)?)?;
    }

    info!(database = %db.name, tables = db.tables().count(), path = %path.display(), "database loaded");
    Ok(db)
}

/// Load one table directory: manifest plus optional row data. Every row
/// is validated against the schema, re-tagging semantic strings and
/// widening integers in FLOAT columns; the unique indexes are rebuilt
/// from scratch by the table constructor.
pub fn load_table(path: &Path) -> Result<Table> {
    let manifest_path = path.join(MANIFEST_FILE);
    let manifest: TableManifest = super::read_json(&manifest_path)?;

    let schema = TableSchema::new(manifest.name.clone(), manifest.columns);
    schema.validate().map_err(|detail| Error::Corrupt {
        path: manifest_path,
        detail,
    })?;

    let data_path = path.join(DATA_FILE);
    let mut rows: Vec<Row> = if data_path.is_file() {
        super::read_json(&data_path)?
    } else {
        Vec::new()
    };

    for (i, row) in rows.iter_mut().enumerate() {
        check_loaded_row(row, &schema, i).map_err(|detail| Error::Corrupt {
            path: data_path.clone(),
            detail,
        })?;
    }

    let table = Table::with_rows(schema, rows, manifest.last_insert_id)?;
    info!(table = table.name(), rows = table.row_count(), path = %path.display(), "table loaded");
    Ok(table)
}

fn check_loaded_row(row: &mut Row, schema: &TableSchema, position: usize) -> std::result::Result<(), String> {
    let unknown = row.keys().find(|k| schema.column(k.as_str()).is_none());
    if let Some(name) = unknown {
        return Err(format!("row {}: unknown column '{}'", position, name));
    }

    for col in &schema.columns {
        match row.remove(&col.name) {
            Some(value) if !value.is_null() => {
                let coerced = coerce_value(value, col.ty)
                    .map_err(|e| format!("row {} column '{}': {}", position, col.name, e))?;
                row.insert(col.name.clone(), coerced);
            }
            _ => {
                if col.is_required() {
                    return Err(format!(
                        "row {}: missing value for NOT NULL column '{}'",
                        position, col.name
                    ));
                }
            }
        }
    }
    Ok(())
}
