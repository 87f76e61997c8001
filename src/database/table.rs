//! Table: row store, unique indexes, and constraint enforcement
//!
//! A table owns its rows, its unique-index maps, and the auto-increment
//! counter behind a single reader-writer lock. Readers clone row data
//! out; nothing borrowed escapes the lock. DML is all-or-nothing: every
//! check runs before the first mutation.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::types::{ColumnDef, IndexKey, Row, TableSchema, Value};

/// Unique-index map for one column: value key to row position.
pub type UniqueIndex = HashMap<IndexKey, usize>;

/// A copy of the table contents, taken under a short read lock for
/// persistence.
pub struct TableSnapshot {
    pub rows: Vec<Row>,
    pub last_insert_id: i64,
}

#[derive(Debug)]
struct TableState {
    rows: Vec<Row>,
    unique: HashMap<String, UniqueIndex>,
    last_insert_id: i64,
}

#[derive(Debug)]
pub struct Table {
    schema: TableSchema,
    state: RwLock<TableState>,
    dirty: AtomicBool,
}

impl Table {
    /// Create an empty table for the given schema.
    pub fn new(schema: TableSchema) -> Result<Self> {
        Self::with_rows(schema, Vec::new(), 0)
    }

    /// Create a table over pre-existing rows (loader path). Unique
    /// indexes are built from scratch and constraints re-checked, so a
    /// hand-edited data file cannot smuggle in a violation.
    pub fn with_rows(schema: TableSchema, rows: Vec<Row>, last_insert_id: i64) -> Result<Self> {
        schema.validate().map_err(|detail| Error::InvalidSchema {
            table: schema.name.clone(),
            detail,
        })?;

        let table = Self {
            schema,
            state: RwLock::new(TableState {
                rows,
                unique: HashMap::new(),
                last_insert_id,
            }),
            dirty: AtomicBool::new(false),
        };
        table.build_indexes()?;
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.state.read().rows.len()
    }

    pub fn last_insert_id(&self) -> i64 {
        self.state.read().last_insert_id
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    pub fn mark_clean(&self) {
        self.dirty.store(false, Ordering::Release);
    }

    /// Rebuild every unique index from row data and advance the
    /// auto-increment counter past every value already present.
    pub fn build_indexes(&self) -> Result<()> {
        let mut state = self.state.write();
        let mut unique: HashMap<String, UniqueIndex> = HashMap::new();

        for col in self.schema.columns.iter().filter(|c| c.is_unique()) {
            let mut index = UniqueIndex::new();
            for (pos, row) in state.rows.iter().enumerate() {
                let value = match row.get(&col.name) {
                    Some(v) if !v.is_null() => v,
                    _ => continue,
                };
                let key = match IndexKey::from_value(value) {
                    Some(k) => k,
                    None => continue,
                };
                if index.insert(key, pos).is_some() {
                    return Err(Error::UniqueViolation {
                        table: self.schema.name.clone(),
                        column: col.name.clone(),
                        value: value.clone(),
                    });
                }
            }
            unique.insert(col.name.clone(), index);
        }

        for col in self.schema.columns.iter().filter(|c| c.auto_increment) {
            let mut max_seen = state.last_insert_id;
            for row in &state.rows {
                if let Some(Value::Int(v)) = row.get(&col.name) {
                    if *v > max_seen {
                        max_seen = *v;
                    }
                }
            }
            state.last_insert_id = max_seen;
        }

        state.unique = unique;
        Ok(())
    }

    /// All rows in stored order.
    pub fn scan(&self) -> Vec<Row> {
        self.state.read().rows.clone()
    }

    /// Rows matching the predicate, in stored order.
    pub fn scan_filtered(&self, pred: impl Fn(&Row) -> bool) -> Vec<Row> {
        self.state
            .read()
            .rows
            .iter()
            .filter(|row| pred(row))
            .cloned()
            .collect()
    }

    /// Rows plus the unique index over `column`, taken under one lock
    /// acquisition so positions and rows agree. Used by the join
    /// executor to reuse an existing index as its build map.
    pub fn scan_with_index(&self, column: &str) -> Option<(Vec<Row>, UniqueIndex)> {
        let state = self.state.read();
        let index = state.unique.get(column)?.clone();
        Some((state.rows.clone(), index))
    }

    pub fn snapshot(&self) -> TableSnapshot {
        let state = self.state.read();
        TableSnapshot {
            rows: state.rows.clone(),
            last_insert_id: state.last_insert_id,
        }
    }

    /// Insert one row.
    pub fn insert(&self, mut row: Row) -> Result<()> {
        let mut state = self.state.write();

        // Assign auto-increment values for missing columns; an explicit
        // value still advances the counter so later assignments stay
        // strictly increasing. The counter is committed only after every
        // check has passed, so a rejected insert leaves no trace.
        let mut next_id = state.last_insert_id;
        for col in self.schema.columns.iter().filter(|c| c.auto_increment) {
            match row.get(&col.name) {
                None | Some(Value::Null) => {
                    next_id += 1;
                    row.insert(col.name.clone(), Value::Int(next_id));
                }
                Some(Value::Int(v)) => {
                    if *v > next_id {
                        next_id = *v;
                    }
                }
                Some(_) => {}
            }
        }

        self.check_row(&row)?;

        for col in self.schema.columns.iter().filter(|c| c.is_unique()) {
            if let Some(key) = row.get(&col.name).and_then(IndexKey::from_value) {
                if state.unique.get(&col.name).is_some_and(|ix| ix.contains_key(&key)) {
                    return Err(Error::UniqueViolation {
                        table: self.schema.name.clone(),
                        column: col.name.clone(),
                        value: row[&col.name].clone(),
                    });
                }
            }
        }

        state.last_insert_id = next_id;
        let pos = state.rows.len();
        for col in self.schema.columns.iter().filter(|c| c.is_unique()) {
            if let Some(key) = row.get(&col.name).and_then(IndexKey::from_value) {
                state.unique.entry(col.name.clone()).or_default().insert(key, pos);
            }
        }
        state.rows.push(row);
        drop(state);

        self.mark_dirty();
        Ok(())
    }

    /// Update every row matching the predicate by overlaying the
    /// assignments. Fails without touching anything when any assignment
    /// would break a constraint, including duplicates created within
    /// the batch itself.
    pub fn update(&self, pred: impl Fn(&Row) -> bool, assignments: &Row) -> Result<usize> {
        let mut state = self.state.write();

        for (name, value) in assignments {
            let col = self.column(name)?;
            if value.is_null() && col.is_required() {
                return Err(Error::NotNullViolation {
                    table: self.schema.name.clone(),
                    column: name.clone(),
                });
            }
            if !value.conforms_to(col.ty) {
                return Err(Error::TypeMismatch {
                    column: name.clone(),
                    detail: format!("expected {}, got {:?}", col.ty, value),
                });
            }
        }

        let selected: Vec<usize> = state
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| pred(row))
            .map(|(pos, _)| pos)
            .collect();
        if selected.is_empty() {
            return Ok(0);
        }

        // Uniqueness over the final state: assignments are constants, so
        // updating two rows to the same unique value is always a batch
        // duplicate, and a single update must not steal another row's key.
        for (name, value) in assignments {
            let col = self.column(name)?;
            if !col.is_unique() {
                continue;
            }
            let Some(key) = IndexKey::from_value(value) else {
                continue;
            };
            if selected.len() > 1 {
                return Err(Error::UniqueViolation {
                    table: self.schema.name.clone(),
                    column: name.clone(),
                    value: value.clone(),
                });
            }
            if let Some(&holder) = state.unique.get(name).and_then(|ix| ix.get(&key)) {
                if !selected.contains(&holder) {
                    return Err(Error::UniqueViolation {
                        table: self.schema.name.clone(),
                        column: name.clone(),
                        value: value.clone(),
                    });
                }
            }
        }

        for &pos in &selected {
            for (name, value) in assignments {
                let col = self.column(name)?;
                if col.is_unique() {
                    let old_key = state.rows[pos].get(name).and_then(IndexKey::from_value);
                    let index = state.unique.entry(name.clone()).or_default();
                    if let Some(old) = old_key {
                        index.remove(&old);
                    }
                    if let Some(new) = IndexKey::from_value(value) {
                        index.insert(new, pos);
                    }
                }
                if col.auto_increment {
                    if let Value::Int(v) = value {
                        if *v > state.last_insert_id {
                            state.last_insert_id = *v;
                        }
                    }
                }
                state.rows[pos].insert(name.clone(), value.clone());
            }
        }
        drop(state);

        self.mark_dirty();
        Ok(selected.len())
    }

    /// Delete every row matching the predicate. Positions shift, so the
    /// unique indexes are rebuilt wholesale afterwards.
    pub fn delete(&self, pred: impl Fn(&Row) -> bool) -> Result<usize> {
        let mut state = self.state.write();

        let doomed: HashSet<usize> = state
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| pred(row))
            .map(|(pos, _)| pos)
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        let mut pos = 0;
        state.rows.retain(|_| {
            let keep = !doomed.contains(&pos);
            pos += 1;
            keep
        });

        for col in self.schema.columns.iter().filter(|c| c.is_unique()) {
            let mut index = UniqueIndex::new();
            for (pos, row) in state.rows.iter().enumerate() {
                if let Some(key) = row.get(&col.name).and_then(IndexKey::from_value) {
                    index.insert(key, pos);
                }
            }
            state.unique.insert(col.name.clone(), index);
        }
        drop(state);

        self.mark_dirty();
        Ok(doomed.len())
    }

    fn column(&self, name: &str) -> Result<&ColumnDef> {
        self.schema
            .column(name)
            .ok_or_else(|| Error::ColumnNotFound(format!("{}.{}", self.schema.name, name)))
    }

    /// Shared row validation: known columns, types, and NOT_NULL.
    fn check_row(&self, row: &Row) -> Result<()> {
        for name in row.keys() {
            self.column(name)?;
        }
        for col in &self.schema.columns {
            let value = row.get(&col.name);
            let present = value.is_some_and(|v| !v.is_null());
            if col.is_required() && !present {
                return Err(Error::NotNullViolation {
                    table: self.schema.name.clone(),
                    column: col.name.clone(),
                });
            }
            if let Some(v) = value {
                if !v.conforms_to(col.ty) {
                    return Err(Error::TypeMismatch {
                        column: col.name.clone(),
                        detail: format!("expected {}, got {:?}", col.ty, v),
                    });
                }
            }
        }
        Ok(())
    }
}
