//! Table schema types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Column data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    #[serde(rename = "INT")]
    Int,
    #[serde(rename = "FLOAT")]
    Float,
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "BOOL")]
    Bool,
    #[serde(rename = "DATE")]
    Date,
    #[serde(rename = "TIME")]
    Time,
    #[serde(rename = "EMAIL")]
    Email,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Int => "INT",
            ColumnType::Float => "FLOAT",
            ColumnType::Text => "TEXT",
            ColumnType::Bool => "BOOL",
            ColumnType::Date => "DATE",
            ColumnType::Time => "TIME",
            ColumnType::Email => "EMAIL",
        };
        f.write_str(s)
    }
}

/// A column definition with its constraint flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub auto_increment: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            primary_key: false,
            unique: false,
            not_null: false,
            auto_increment: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// PRIMARY_KEY implies UNIQUE.
    pub fn is_unique(&self) -> bool {
        self.unique || self.primary_key
    }

    /// PRIMARY_KEY implies NOT_NULL.
    pub fn is_required(&self) -> bool {
        self.not_null || self.primary_key
    }
}

/// Ordered column definitions for one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key_column(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.primary_key)
    }

    /// Structural validation of the schema itself. Run after loading a
    /// manifest and before accepting a programmatically built table.
    pub fn validate(&self) -> Result<(), String> {
        let mut pk_count = 0;
        for (i, col) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name == col.name) {
                return Err(format!("duplicate column name '{}'", col.name));
            }
            if col.primary_key {
                pk_count += 1;
            }
            if col.auto_increment && col.ty != ColumnType::Int {
                return Err(format!(
                    "AUTO_INCREMENT column '{}' must be INT, found {}",
                    col.name, col.ty
                ));
            }
        }
        if pk_count > 1 {
            return Err(format!(
                "table '{}' has {} primary key columns, at most one is allowed",
                self.name, pk_count
            ));
        }
        Ok(())
    }
}
