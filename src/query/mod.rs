//! Query planning and execution
//!
//! The planner lowers a validated AST into a `PlanNode` tree; the
//! executor walks it. Plan nodes are a closed sum: Scan, Join, Project
//! for queries, Insert/Update/Delete for DML.

pub mod executor;
pub mod join;
pub mod planner;

pub use executor::{Executor, QueryOutput};
pub use planner::plan;

use std::fmt;
use std::sync::Arc;

use crate::sql::ast::{FieldList, JoinType};
use crate::types::{ColumnType, Row};

/// A compiled WHERE predicate: a pure function from a row (bare or
/// joined) to a boolean. Built once at plan time; evaluation does not
/// walk the AST.
#[derive(Clone)]
pub struct RowFilter(Arc<dyn Fn(&Row) -> bool + Send + Sync>);

impl RowFilter {
    pub fn new(f: impl Fn(&Row) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// The predicate used when a statement has no WHERE clause.
    pub fn all() -> Self {
        Self::new(|_| true)
    }

    pub fn matches(&self, row: &Row) -> bool {
        (self.0)(row)
    }
}

impl fmt::Debug for RowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RowFilter")
    }
}

/// Executable plan tree.
#[derive(Debug)]
pub enum PlanNode {
    /// Read a table in stored order, optionally filtering during the walk
    Scan {
        table: String,
        filter: Option<RowFilter>,
    },

    /// Hash equi-join. `left_key`/`right_key` are table-qualified column
    /// names; `filter` is the post-join WHERE, present on the top node only
    Join {
        left: Box<PlanNode>,
        right: Box<PlanNode>,
        join_type: JoinType,
        left_key: String,
        right_key: String,
        filter: Option<RowFilter>,
    },

    /// Keep only the requested columns
    Project {
        input: Box<PlanNode>,
        fields: FieldList,
    },

    /// Append one fully coerced row
    Insert { table: String, row: Row },

    /// Overlay coerced assignments onto every matching row
    Update {
        table: String,
        filter: RowFilter,
        assignments: Row,
    },

    /// Remove every matching row
    Delete { table: String, filter: RowFilter },
}

/// Name and type tag of one result column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
    pub ty: ColumnType,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Result of executing one plan node: rows plus the schema inferred for
/// them. Join output keys are `table.column`-qualified.
#[derive(Debug, Clone)]
pub struct Intermediate {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Row>,
}
