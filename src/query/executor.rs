//! Executor - walks a plan tree and produces results
//!
//! Each node yields an intermediate result (rows plus inferred schema);
//! the top-level call shapes the final `QueryOutput`. DML nodes
//! dispatch to the table operations, which enforce constraints under
//! the table's write lock.

use super::join::{self, BuildMap};
use super::{ColumnMeta, Intermediate, PlanNode};
use crate::database::{Database, Table};
use crate::error::{Error, Result};
use crate::sql::ast::{ColumnRef, FieldList};
use crate::types::Row;

/// User-facing result of one statement. Fields are present when they
/// apply: queries fill columns/metadata/rows, DML fills the affected
/// count, and everything carries a message.
#[derive(Debug, Clone, Default)]
pub struct QueryOutput {
    pub columns: Option<Vec<String>>,
    pub metadata: Option<Vec<ColumnMeta>>,
    pub rows: Option<Vec<Row>>,
    pub rows_affected: Option<usize>,
    pub message: Option<String>,
}

impl QueryOutput {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            message: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn affected(count: usize, text: impl Into<String>) -> Self {
        Self {
            rows_affected: Some(count),
            message: Some(text.into()),
            ..Default::default()
        }
    }

    fn from_intermediate(im: Intermediate) -> Self {
        Self {
            columns: Some(im.columns.iter().map(|c| c.name.clone()).collect()),
            metadata: Some(im.columns),
            message: Some(format!("Returned {} rows", im.rows.len())),
            rows: Some(im.rows),
            rows_affected: None,
        }
    }
}

pub struct Executor<'a> {
    db: &'a Database,
}

impl<'a> Executor<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn run(&self, node: &PlanNode) -> Result<QueryOutput> {
        match node {
            PlanNode::Insert { table, row } => {
                self.db.table(table)?.insert(row.clone())?;
                Ok(QueryOutput::affected(1, "INSERT 1"))
            }
            PlanNode::Update {
                table,
                filter,
                assignments,
            } => {
                let n = self
                    .db
                    .table(table)?
                    .update(|row| filter.matches(row), assignments)?;
                Ok(QueryOutput::affected(n, format!("UPDATE {}", n)))
            }
            PlanNode::Delete { table, filter } => {
                let n = self.db.table(table)?.delete(|row| filter.matches(row))?;
                Ok(QueryOutput::affected(n, format!("DELETE {}", n)))
            }
            _ => Ok(QueryOutput::from_intermediate(self.walk(node)?)),
        }
    }

    fn walk(&self, node: &PlanNode) -> Result<Intermediate> {
        match node {
            PlanNode::Scan { table, filter } => self.scan(table, filter.as_ref()),
            PlanNode::Join {
                left,
                right,
                join_type,
                left_key,
                right_key,
                filter,
            } => {
                let (left_im, prebuilt) = self.build_side(left, left_key)?;
                let right_im = self.qualified_child(right)?;
                let mut out = join::hash_join(
                    left_im,
                    right_im,
                    *join_type,
                    left_key,
                    right_key,
                    prebuilt,
                )?;
                if let Some(f) = filter {
                    out.rows.retain(|row| f.matches(row));
                }
                Ok(out)
            }
            PlanNode::Project { input, fields } => {
                let im = self.walk(input)?;
                project(im, fields)
            }
            PlanNode::Insert { .. } | PlanNode::Update { .. } | PlanNode::Delete { .. } => {
                Err(Error::UnsupportedOperation(
                    "DML node below the plan root".into(),
                ))
            }
        }
    }

    fn scan(&self, table: &str, filter: Option<&super::RowFilter>) -> Result<Intermediate> {
        let t = self.db.table(table)?;
        let rows = match filter {
            Some(f) => t.scan_filtered(|row| f.matches(row)),
            None => t.scan(),
        };
        Ok(Intermediate {
            columns: scan_columns(t),
            rows,
        })
    }

    /// Execute the build (left) child. A bare scan whose join column
    /// carries a unique index reuses that index as the build map; rows
    /// and index are taken under one lock so positions agree.
    fn build_side(
        &self,
        node: &PlanNode,
        left_key: &str,
    ) -> Result<(Intermediate, Option<BuildMap>)> {
        if let PlanNode::Scan {
            table,
            filter: None,
        } = node
        {
            let bare = left_key.rsplit('.').next().unwrap_or(left_key);
            let t = self.db.table(table)?;
            let indexed = t.schema().column(bare).is_some_and(|c| c.is_unique());
            if indexed {
                if let Some((rows, index)) = t.scan_with_index(bare) {
                    let im = join::qualify(
                        Intermediate {
                            columns: scan_columns(t),
                            rows,
                        },
                        table,
                    );
                    let map: BuildMap = index.into_iter().map(|(k, pos)| (k, vec![pos])).collect();
                    return Ok((im, Some(map)));
                }
            }
        }
        Ok((self.qualified_child(node)?, None))
    }

    /// Walk a join child and table-qualify its columns. Join children
    /// are already qualified; scan children get their table name.
    fn qualified_child(&self, node: &PlanNode) -> Result<Intermediate> {
        let im = self.walk(node)?;
        match node {
            PlanNode::Scan { table, .. } => Ok(join::qualify(im, table)),
            _ => Ok(im),
        }
    }
}

fn scan_columns(table: &Table) -> Vec<ColumnMeta> {
    table
        .schema()
        .columns
        .iter()
        .map(|c| ColumnMeta::new(c.name.clone(), c.ty))
        .collect()
}

/// Apply a projection to an intermediate result.
fn project(im: Intermediate, fields: &FieldList) -> Result<Intermediate> {
    let refs = match fields {
        FieldList::Star => return Ok(im),
        FieldList::Columns(refs) => refs,
    };

    // Resolve each field to a source column up front.
    let mut picks = Vec::with_capacity(refs.len());
    for r in refs {
        let idx = resolve_field(&im.columns, r)?;
        picks.push((r.to_string(), im.columns[idx].name.clone(), im.columns[idx].ty));
    }

    let rows = im
        .rows
        .into_iter()
        .map(|row| {
            let mut out = Row::with_capacity(picks.len());
            for (name, source, _) in &picks {
                if let Some(v) = row.get(source) {
                    if !v.is_null() {
                        out.insert(name.clone(), v.clone());
                    }
                }
            }
            out
        })
        .collect();

    Ok(Intermediate {
        columns: picks
            .into_iter()
            .map(|(name, _, ty)| ColumnMeta::new(name, ty))
            .collect(),
        rows,
    })
}

/// Find the source column for a projected field. Qualified names match
/// exactly (falling back to the bare form over a single-table result);
/// bare names match exactly first, then by trailing component, and are
/// ambiguous when several qualified columns share the component.
fn resolve_field(columns: &[ColumnMeta], field: &ColumnRef) -> Result<usize> {
    match &field.table {
        Some(table) => {
            let qualified = format!("{}.{}", table, field.column);
            if let Some(i) = columns.iter().position(|c| c.name == qualified) {
                return Ok(i);
            }
            columns
                .iter()
                .position(|c| c.name == field.column)
                .ok_or(Error::ColumnNotFound(qualified))
        }
        None => {
            if let Some(i) = columns.iter().position(|c| c.name == field.column) {
                return Ok(i);
            }
            let suffix = format!(".{}", field.column);
            let mut matches = columns
                .iter()
                .enumerate()
                .filter(|(_, c)| c.name.ends_with(&suffix));
            match (matches.next(), matches.next()) {
                (Some((i, _)), None) => Ok(i),
                (Some(_), Some(_)) => Err(Error::AmbiguousColumn(field.column.clone())),
                (None, _) => Err(Error::ColumnNotFound(field.column.clone())),
            }
        }
    }
}
