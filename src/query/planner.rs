//! Planner - validates the AST against the catalog and lowers it into a
//! plan tree
//!
//! The planner is read-only with respect to the catalog. Literals are
//! coerced to their column types here, and WHERE expressions are
//! compiled into row-filter closures so the executor never walks an AST.

use std::cmp::Ordering;

use super::{PlanNode, RowFilter};
use crate::database::Database;
use crate::error::{Error, Result};
use crate::sql::ast::{
    CompareOp, DeleteStmt, Expr, FieldList, InsertStmt, LogicalOp, SelectStmt, Statement,
    UpdateStmt,
};
use crate::types::{coerce_value, compare_order, values_equal, ColumnType, Row, TableSchema, Value};

/// Lower one statement into an executable plan.
pub fn plan(stmt: &Statement, db: &Database) -> Result<PlanNode> {
    match stmt {
        Statement::Select(s) => plan_select(s, db),
        Statement::Insert(s) => plan_insert(s, db),
        Statement::Update(s) => plan_update(s, db),
        Statement::Delete(s) => plan_delete(s, db),
        _ => Err(Error::UnsupportedOperation(
            "database management statements are dispatched by the engine".into(),
        )),
    }
}

fn plan_select(stmt: &SelectStmt, db: &Database) -> Result<PlanNode> {
    let base = db.table(&stmt.table)?;
    let mut scope = Scope::new();
    scope.push(base.schema());

    if stmt.joins.is_empty() {
        let filter = match &stmt.where_clause {
            Some(expr) => Some(compile_filter(expr, &scope)?),
            None => None,
        };
        validate_fields(&stmt.fields, &scope)?;
        return Ok(PlanNode::Project {
            input: Box::new(PlanNode::Scan {
                table: stmt.table.clone(),
                filter,
            }),
            fields: stmt.fields.clone(),
        });
    }

    // Left-deep join tree: each clause joins the tree built so far with
    // a fresh scan of the right table.
    let mut node = PlanNode::Scan {
        table: stmt.table.clone(),
        filter: None,
    };
    let mut left_tables = vec![stmt.table.clone()];

    for join in &stmt.joins {
        let right = db.table(&join.table)?;
        let (left_key, right_key) = specialize_on(&join.on, &left_tables, &join.table, db)?;
        scope.push(right.schema());
        left_tables.push(join.table.clone());

        node = PlanNode::Join {
            left: Box::new(node),
            right: Box::new(PlanNode::Scan {
                table: join.table.clone(),
                filter: None,
            }),
            join_type: join.join_type,
            left_key,
            right_key,
            filter: None,
        };
    }

    // The WHERE predicate applies after the join, on the top node.
    if let Some(expr) = &stmt.where_clause {
        let compiled = compile_filter(expr, &scope)?;
        if let PlanNode::Join { filter, .. } = &mut node {
            *filter = Some(compiled);
        }
    }

    validate_fields(&stmt.fields, &scope)?;
    Ok(PlanNode::Project {
        input: Box::new(node),
        fields: stmt.fields.clone(),
    })
}

/// Assert the ON expression is a top-level equality of two qualified
/// identifiers, one naming a column of the left subtree and the other a
/// column of the newly joined table. Returns the pair oriented
/// (left subtree key, right table key), both in `table.column` form.
fn specialize_on(
    expr: &Expr,
    left_tables: &[String],
    right_table: &str,
    db: &Database,
) -> Result<(String, String)> {
    let Expr::Comparison {
        left,
        op: CompareOp::Eq,
        right,
    } = expr
    else {
        return Err(Error::UnsupportedJoinCondition(
            "ON condition must be an equality of two qualified columns".into(),
        ));
    };

    let (Expr::Ident {
        table: Some(t1),
        name: c1,
    }, Expr::Ident {
        table: Some(t2),
        name: c2,
    }) = (left.as_ref(), right.as_ref())
    else {
        return Err(Error::UnsupportedJoinCondition(
            "both sides of an ON condition must be table-qualified columns".into(),
        ));
    };

    check_join_column(db, t1, c1)?;
    check_join_column(db, t2, c2)?;

    let left_has_t1 = left_tables.iter().any(|t| t == t1);
    let left_has_t2 = left_tables.iter().any(|t| t == t2);
    if left_has_t1 && t2 == right_table {
        Ok((format!("{}.{}", t1, c1), format!("{}.{}", t2, c2)))
    } else if left_has_t2 && t1 == right_table {
        Ok((format!("{}.{}", t2, c2), format!("{}.{}", t1, c1)))
    } else {
        Err(Error::UnsupportedJoinCondition(format!(
            "ON condition must relate the joined tables, got {}.{} = {}.{}",
            t1, c1, t2, c2
        )))
    }
}

fn check_join_column(db: &Database, table: &str, column: &str) -> Result<()> {
    let t = db.table(table)?;
    if t.schema().column(column).is_none() {
        return Err(Error::ColumnNotFound(format!("{}.{}", table, column)));
    }
    Ok(())
}

fn plan_insert(stmt: &InsertStmt, db: &Database) -> Result<PlanNode> {
    let table = db.table(&stmt.table)?;
    let schema = table.schema();

    if stmt.columns.len() != stmt.values.len() {
        return Err(Error::ArityMismatch {
            columns: stmt.columns.len(),
            values: stmt.values.len(),
        });
    }

    let mut row = Row::new();
    for (name, expr) in stmt.columns.iter().zip(&stmt.values) {
        let col = schema
            .column(name)
            .ok_or_else(|| Error::ColumnNotFound(format!("{}.{}", stmt.table, name)))?;
        let Expr::Literal(value) = expr else {
            return Err(Error::UnsupportedOperation(
                "only literal values are supported in VALUES".into(),
            ));
        };
        let coerced = coerce_value(value.clone(), col.ty).map_err(|detail| Error::TypeMismatch {
            column: name.clone(),
            detail,
        })?;
        row.insert(name.clone(), coerced);
    }

    // Every required column must be covered, except AUTO_INCREMENT ones
    // which the executor fills in.
    for col in &schema.columns {
        if col.is_required() && !col.auto_increment {
            let present = row.get(&col.name).is_some_and(|v| !v.is_null());
            if !present {
                return Err(Error::NotNullViolation {
                    table: stmt.table.clone(),
                    column: col.name.clone(),
                });
            }
        }
    }

    Ok(PlanNode::Insert {
        table: stmt.table.clone(),
        row,
    })
}

fn plan_update(stmt: &UpdateStmt, db: &Database) -> Result<PlanNode> {
    let table = db.table(&stmt.table)?;
    let schema = table.schema();
    let mut scope = Scope::new();
    scope.push(schema);

    let mut assignments = Row::new();
    for (name, value) in &stmt.assignments {
        let col = schema
            .column(name)
            .ok_or_else(|| Error::ColumnNotFound(format!("{}.{}", stmt.table, name)))?;
        let coerced = coerce_value(value.clone(), col.ty).map_err(|detail| Error::TypeMismatch {
            column: name.clone(),
            detail,
        })?;
        assignments.insert(name.clone(), coerced);
    }

    let filter = match &stmt.where_clause {
        Some(expr) => compile_filter(expr, &scope)?,
        None => RowFilter::all(),
    };

    Ok(PlanNode::Update {
        table: stmt.table.clone(),
        filter,
        assignments,
    })
}

fn plan_delete(stmt: &DeleteStmt, db: &Database) -> Result<PlanNode> {
    let table = db.table(&stmt.table)?;
    let mut scope = Scope::new();
    scope.push(table.schema());

    let filter = match &stmt.where_clause {
        Some(expr) => compile_filter(expr, &scope)?,
        None => RowFilter::all(),
    };

    Ok(PlanNode::Delete {
        table: stmt.table.clone(),
        filter,
    })
}

/// The schemas visible to an expression, in join order.
struct Scope<'a> {
    tables: Vec<&'a TableSchema>,
}

impl<'a> Scope<'a> {
    fn new() -> Self {
        Self { tables: Vec::new() }
    }

    fn push(&mut self, schema: &'a TableSchema) {
        self.tables.push(schema);
    }

    /// Resolve an identifier to its column type. Bare names take the
    /// first table that has them; qualified names must name a table in
    /// scope.
    fn resolve(&self, table: &Option<String>, name: &str) -> Result<ColumnType> {
        match table {
            Some(t) => {
                let schema = self
                    .tables
                    .iter()
                    .find(|s| s.name == *t)
                    .ok_or_else(|| Error::ColumnNotFound(format!("{}.{}", t, name)))?;
                schema
                    .column(name)
                    .map(|c| c.ty)
                    .ok_or_else(|| Error::ColumnNotFound(format!("{}.{}", t, name)))
            }
            None => self
                .tables
                .iter()
                .find_map(|s| s.column(name))
                .map(|c| c.ty)
                .ok_or_else(|| Error::ColumnNotFound(name.to_string())),
        }
    }
}

/// One side of a compiled comparison.
enum Operand {
    /// Column lookup: qualified key (when the identifier was qualified),
    /// bare name, and the precomputed `.name` suffix for the fallback
    /// search over joined rows.
    Column {
        qualified: Option<String>,
        name: String,
        suffix: String,
    },
    Const(Value),
}

impl Operand {
    fn value<'r>(&'r self, row: &'r Row) -> Option<&'r Value> {
        let value = match self {
            Operand::Const(v) => Some(v),
            Operand::Column {
                qualified,
                name,
                suffix,
            } => match qualified {
                Some(q) => row.get(q).or_else(|| row.get(name)),
                None => row
                    .get(name)
                    .or_else(|| row.iter().find(|(k, _)| k.ends_with(suffix)).map(|(_, v)| v)),
            },
        }?;
        if value.is_null() {
            None
        } else {
            Some(value)
        }
    }
}

/// Compile a WHERE expression into a row filter.
fn compile_filter(expr: &Expr, scope: &Scope<'_>) -> Result<RowFilter> {
    match expr {
        Expr::Logical { left, op, right } => {
            let l = compile_filter(left, scope)?;
            let r = compile_filter(right, scope)?;
            Ok(match op {
                LogicalOp::And => RowFilter::new(move |row| l.matches(row) && r.matches(row)),
                LogicalOp::Or => RowFilter::new(move |row| l.matches(row) || r.matches(row)),
            })
        }
        Expr::Comparison { left, op, right } => compile_comparison(left, *op, right, scope),
        _ => Err(Error::UnsupportedOperation(
            "WHERE must be a comparison or a logical combination of comparisons".into(),
        )),
    }
}

fn compile_comparison(
    left: &Expr,
    op: CompareOp,
    right: &Expr,
    scope: &Scope<'_>,
) -> Result<RowFilter> {
    let left_ty = operand_type(left, scope)?;
    let right_ty = operand_type(right, scope)?;

    let l = build_operand(left, right_ty.as_ref())?;
    let r = build_operand(right, left_ty.as_ref())?;

    Ok(RowFilter::new(move |row| {
        let (Some(a), Some(b)) = (l.value(row), r.value(row)) else {
            // Absent values never satisfy a comparison.
            return false;
        };
        eval_compare(a, op, b)
    }))
}

/// Column type and display name of an identifier operand, `None` for
/// literals.
fn operand_type(expr: &Expr, scope: &Scope<'_>) -> Result<Option<(ColumnType, String)>> {
    match expr {
        Expr::Ident { table, name } => {
            let ty = scope.resolve(table, name)?;
            let display = match table {
                Some(t) => format!("{}.{}", t, name),
                None => name.clone(),
            };
            Ok(Some((ty, display)))
        }
        Expr::Literal(_) => Ok(None),
        _ => Err(Error::UnsupportedOperation(
            "comparison operands must be columns or literals".into(),
        )),
    }
}

/// Build an operand, coercing a literal to the column type of the other
/// side when that side is a column.
fn build_operand(expr: &Expr, other: Option<&(ColumnType, String)>) -> Result<Operand> {
    match expr {
        Expr::Ident { table, name } => Ok(Operand::Column {
            qualified: table.as_ref().map(|t| format!("{}.{}", t, name)),
            name: name.clone(),
            suffix: format!(".{}", name),
        }),
        Expr::Literal(value) => {
            let value = match other {
                Some((ty, column)) => {
                    coerce_value(value.clone(), *ty).map_err(|detail| Error::TypeMismatch {
                        column: column.clone(),
                        detail,
                    })?
                }
                None => value.clone(),
            };
            Ok(Operand::Const(value))
        }
        _ => Err(Error::UnsupportedOperation(
            "comparison operands must be columns or literals".into(),
        )),
    }
}

fn eval_compare(a: &Value, op: CompareOp, b: &Value) -> bool {
    match op {
        CompareOp::Eq => values_equal(a, b),
        CompareOp::Ne => !values_equal(a, b),
        CompareOp::Lt => compare_order(a, b) == Some(Ordering::Less),
        CompareOp::Gt => compare_order(a, b) == Some(Ordering::Greater),
        CompareOp::Le => matches!(compare_order(a, b), Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Ge => matches!(
            compare_order(a, b),
            Some(Ordering::Greater | Ordering::Equal)
        ),
    }
}

/// Check every projected column resolves somewhere in scope. Ambiguity
/// of bare names over joins is reported by the executor, which sees the
/// actual result schema.
fn validate_fields(fields: &FieldList, scope: &Scope<'_>) -> Result<()> {
    if let FieldList::Columns(cols) = fields {
        for col in cols {
            scope.resolve(&col.table, &col.column)?;
        }
    }
    Ok(())
}
