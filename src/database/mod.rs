//! Database: a named set of tables

mod table;

pub use table::{Table, TableSnapshot, UniqueIndex};

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// A database: a directory on disk, a set of tables in memory.
///
/// The table set is fixed once the database is loaded (table DDL happens
/// outside the engine); each `Table` handles its own interior mutability,
/// so a loaded `Database` is shared as `Arc<Database>` across sessions.
pub struct Database {
    pub name: String,
    pub path: PathBuf,
    tables: HashMap<String, Table>,
}

impl Database {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            tables: HashMap::new(),
        }
    }

    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Install a table. Used by the loader and by embedders building a
    /// catalog programmatically before the first save.
    pub fn add_table(&mut self, table: Table) -> Result<()> {
        let name = table.name().to_string();
        if self.tables.contains_key(&name) {
            return Err(Error::InvalidSchema {
                table: name.clone(),
                detail: format!("table '{}' already exists in database '{}'", name, self.name),
            });
        }
        self.tables.insert(name, table);
        Ok(())
    }

    /// Rebuild the unique indexes of every table. Run once after load.
    pub fn build_indexes(&self) -> Result<()> {
        for table in self.tables.values() {
            table.build_indexes()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnDef, ColumnType, TableSchema};

    #[test]
    fn test_table_lookup() {
        let mut db = Database::new("shop", "/tmp/shop");
        db.add_table(
            Table::new(TableSchema::new(
                "items",
                vec![ColumnDef::new("id", ColumnType::Int)],
            ))
            .unwrap(),
        )
        .unwrap();

        assert!(db.table("items").is_ok());
        assert!(matches!(db.table("ghosts"), Err(Error::TableNotFound(_))));
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let mut db = Database::new("shop", "/tmp/shop");
        let schema = TableSchema::new("items", vec![ColumnDef::new("id", ColumnType::Int)]);
        db.add_table(Table::new(schema.clone()).unwrap()).unwrap();
        assert!(db.add_table(Table::new(schema).unwrap()).is_err());
    }
}
