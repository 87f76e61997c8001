//! Core value and row types for GrainDB

mod table;
pub mod validate;

pub use table::{ColumnDef, ColumnType, TableSchema};

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single cell value.
///
/// The engine is dynamically typed at the row level: each cell carries its
/// own tag and the schema constrains what tags a column may hold. The
/// serde representation is untagged so data files contain plain JSON
/// scalars; semantic string types (DATE/TIME/EMAIL) deserialize as `Text`
/// and are re-tagged against the schema by the storage loader.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    /// Null / absent value
    Null,

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit float
    Float(f64),

    /// Boolean
    Bool(bool),

    /// UTF-8 text
    Text(String),

    /// Calendar date, `YYYY-MM-DD`
    Date(String),

    /// 24-hour time, `HH:MM` or `HH:MM:SS`
    Time(String),

    /// Email address
    Email(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// String view over every string-formed variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Date(s) | Value::Time(s) | Value::Email(s) => Some(s),
            _ => None,
        }
    }

    /// True when this value may be stored in a column of the given type.
    pub fn conforms_to(&self, ty: ColumnType) -> bool {
        match (self, ty) {
            (Value::Null, _) => true,
            (Value::Int(_), ColumnType::Int) => true,
            (Value::Int(_) | Value::Float(_), ColumnType::Float) => true,
            (Value::Text(_), ColumnType::Text) => true,
            (Value::Bool(_), ColumnType::Bool) => true,
            (Value::Date(_), ColumnType::Date) => true,
            (Value::Time(_), ColumnType::Time) => true,
            (Value::Email(_), ColumnType::Email) => true,
            _ => false,
        }
    }
}

/// A row: column name (bare, or `table.column` after a join) to value.
pub type Row = HashMap<String, Value>;

/// Convert a literal value to the form a column of `ty` stores.
///
/// Matching tags pass through, integers widen into FLOAT columns, and
/// strings bound to DATE/TIME/EMAIL columns are format-validated and
/// re-tagged. Anything else is a mismatch; the error text names the
/// expected type.
pub fn coerce_value(value: Value, ty: ColumnType) -> Result<Value, String> {
    match (value, ty) {
        (v @ Value::Null, _) => Ok(v),
        (v @ Value::Int(_), ColumnType::Int) => Ok(v),
        (Value::Int(i), ColumnType::Float) => Ok(Value::Float(i as f64)),
        (v @ Value::Float(_), ColumnType::Float) => Ok(v),
        (v @ Value::Text(_), ColumnType::Text) => Ok(v),
        (v @ Value::Bool(_), ColumnType::Bool) => Ok(v),
        (v @ Value::Date(_), ColumnType::Date) => Ok(v),
        (v @ Value::Time(_), ColumnType::Time) => Ok(v),
        (v @ Value::Email(_), ColumnType::Email) => Ok(v),
        (Value::Text(s), ColumnType::Date) => {
            validate::validate_date(&s)?;
            Ok(Value::Date(s))
        }
        (Value::Text(s), ColumnType::Time) => {
            validate::validate_time(&s)?;
            Ok(Value::Time(s))
        }
        (Value::Text(s), ColumnType::Email) => {
            validate::validate_email(&s)?;
            Ok(Value::Email(s))
        }
        (v, ty) => Err(format!("expected {}, got {:?}", ty, v)),
    }
}

/// Ordering between two values, defined only for numeric pairs (as f64)
/// and string pairs (lexicographic). Everything else is incomparable.
pub fn compare_order(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) {
        return a.partial_cmp(&b);
    }
    if let (Some(a), Some(b)) = (left.as_str(), right.as_str()) {
        return Some(a.cmp(b));
    }
    None
}

/// Equality between two values: numeric pairs compare as f64, string
/// pairs by content, everything else structurally. Null equals nothing,
/// not even another null.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    if left.is_null() || right.is_null() {
        return false;
    }
    match compare_order(left, right) {
        Some(ord) => ord == Ordering::Equal,
        None => left == right,
    }
}

/// Hashable key over values, used for unique indexes and join maps.
///
/// Numerics normalize to f64 bit patterns so `1` and `1.0` land on the
/// same key, mirroring the comparison rules. String-formed values key by
/// their string content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Num(u64),
    Str(String),
    Bool(bool),
}

impl IndexKey {
    fn num(f: f64) -> Self {
        // Collapse -0.0 onto 0.0 so the two hash identically.
        let canonical = if f == 0.0 { 0.0 } else { f };
        IndexKey::Num(canonical.to_bits())
    }

    /// Key for unique-index maintenance. `None` for null values, which
    /// are not indexed.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Int(i) => Some(Self::num(*i as f64)),
            Value::Float(f) => Some(Self::num(*f)),
            Value::Bool(b) => Some(IndexKey::Bool(*b)),
            Value::Text(s) | Value::Date(s) | Value::Time(s) | Value::Email(s) => {
                Some(IndexKey::Str(s.clone()))
            }
        }
    }

    /// Key for join probing. Join equality is defined for numeric and
    /// string operands only; null and boolean keys match nothing.
    pub fn join_key(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(_) => None,
            other => Self::from_value(other),
        }
    }
}
