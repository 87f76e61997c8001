//! Abstract syntax tree for SQL statements
//!
//! Nodes are immutable once built. `Display` renders canonical SQL that
//! lexes and parses back to an equal tree, which the round-trip tests
//! rely on.

use std::fmt;

use crate::types::Value;

/// Top-level SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStmt),
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
    CreateDatabase(String),
    DropDatabase(String),
    AlterDatabaseRename { name: String, new_name: String },
    UseDatabase(String),
}

/// SELECT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStmt {
    pub fields: FieldList,
    pub table: String,
    pub joins: Vec<JoinClause>,
    pub where_clause: Option<Expr>,
}

/// Projected fields: `*` or an explicit column list.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldList {
    Star,
    Columns(Vec<ColumnRef>),
}

/// A qualified or bare column reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn bare(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(t) => write!(f, "{}.{}", t, self.column),
            None => f.write_str(&self.column),
        }
    }
}

/// One JOIN clause: `<type> JOIN <table> ON <expr>`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub on: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
        };
        f.write_str(s)
    }
}

/// INSERT statement. The column list is required by the grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStmt {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Expr>,
}

/// UPDATE statement. Assignment values are literals by the grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStmt {
    pub table: String,
    pub assignments: Vec<(String, Value)>,
    pub where_clause: Option<Expr>,
}

/// DELETE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStmt {
    pub table: String,
    pub where_clause: Option<Expr>,
}

/// Expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference, possibly table-qualified
    Ident { table: Option<String>, name: String },

    /// Literal value; the `Value` tag doubles as the literal kind
    Literal(Value),

    /// Comparison of two atoms
    Comparison {
        left: Box<Expr>,
        op: CompareOp,
        right: Box<Expr>,
    },

    /// AND / OR combination
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        })
    }
}

fn fmt_literal(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Null => f.write_str("NULL"),
        Value::Int(i) => write!(f, "{}", i),
        // Always keep a decimal point so the text re-lexes as a decimal.
        Value::Float(x) if x.fract() == 0.0 && x.is_finite() => write!(f, "{:.1}", x),
        Value::Float(x) => write!(f, "{}", x),
        Value::Bool(true) => f.write_str("TRUE"),
        Value::Bool(false) => f.write_str("FALSE"),
        Value::Text(s) => write!(f, "'{}'", s),
        Value::Date(s) => write!(f, "DATE '{}'", s),
        Value::Time(s) => write!(f, "TIME '{}'", s),
        Value::Email(s) => write!(f, "EMAIL '{}'", s),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident { table: Some(t), name } => write!(f, "{}.{}", t, name),
            Expr::Ident { table: None, name } => f.write_str(name),
            Expr::Literal(v) => fmt_literal(v, f),
            Expr::Comparison { left, op, right } => write!(f, "{} {} {}", left, op, right),
            Expr::Logical { left, op, right } => {
                // Logical operands print parenthesized so mixed AND/OR
                // trees survive the round trip.
                fmt_logical_operand(left, f)?;
                write!(f, " {} ", op)?;
                fmt_logical_operand(right, f)
            }
        }
    }
}

fn fmt_logical_operand(expr: &Expr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if matches!(expr, Expr::Logical { .. }) {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Select(s) => {
                f.write_str("SELECT ")?;
                match &s.fields {
                    FieldList::Star => f.write_str("*")?,
                    FieldList::Columns(cols) => {
                        for (i, col) in cols.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            write!(f, "{}", col)?;
                        }
                    }
                }
                write!(f, " FROM {}", s.table)?;
                for join in &s.joins {
                    write!(f, " {} JOIN {} ON {}", join.join_type, join.table, join.on)?;
                }
                if let Some(expr) = &s.where_clause {
                    write!(f, " WHERE {}", expr)?;
                }
                Ok(())
            }
            Statement::Insert(s) => {
                write!(f, "INSERT INTO {} (", s.table)?;
                for (i, col) in s.columns.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(col)?;
                }
                f.write_str(") VALUES (")?;
                for (i, value) in s.values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str(")")
            }
            Statement::Update(s) => {
                write!(f, "UPDATE {} SET ", s.table)?;
                for (i, (col, value)) in s.assignments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} = ", col)?;
                    fmt_literal(value, f)?;
                }
                if let Some(expr) = &s.where_clause {
                    write!(f, " WHERE {}", expr)?;
                }
                Ok(())
            }
            Statement::Delete(s) => {
                write!(f, "DELETE FROM {}", s.table)?;
                if let Some(expr) = &s.where_clause {
                    write!(f, " WHERE {}", expr)?;
                }
                Ok(())
            }
            Statement::CreateDatabase(name) => write!(f, "CREATE DATABASE {}", name),
            Statement::DropDatabase(name) => write!(f, "DROP DATABASE {}", name),
            Statement::AlterDatabaseRename { name, new_name } => {
                write!(f, "ALTER DATABASE {} RENAME TO {}", name, new_name)
            }
            Statement::UseDatabase(name) => write!(f, "USE {}", name),
        }
    }
}
