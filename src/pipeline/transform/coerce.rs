//! Numeric coercions and the gender remap.

use crate::error::{EtlError, Result};
use crate::table::{Table, Value};

fn coercion_error(column: &str, row: usize, value: &Value, expected: &'static str) -> EtlError {
    EtlError::TypeCoercion {
        column: column.to_string(),
        row,
        value: match value {
            Value::Null => "<null>".to_string(),
            other => other.to_string(),
        },
        expected,
    }
}

/// Coerce each listed column to `Float`. Missing cells stay missing.
pub fn to_float(table: Table, columns: &[&str]) -> Result<Table> {
    columns.iter().try_fold(table, |table, &name| {
        table.map_column(name, |row, value| match value {
            Value::Null => Ok(Value::Null),
            Value::Float(_) => Ok(value),
            Value::Int(v) => Ok(Value::Float(v as f64)),
            Value::Text(ref s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| coercion_error(name, row, &value, "float")),
            other => Err(coercion_error(name, row, &other, "float")),
        })
    })
}

/// Coerce each listed column to `Int`, truncating integral floats toward zero.
pub fn to_integer(table: Table, columns: &[&str]) -> Result<Table> {
    columns.iter().try_fold(table, |table, &name| {
        table.map_column(name, |row, value| {
            parse_integer(&value)
                .map(Value::Int)
                .ok_or_else(|| coercion_error(name, row, &value, "integer"))
        })
    })
}

fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Int(v) => Some(*v),
        Value::Float(v) => truncate(*v),
        Value::Text(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    }
}

fn truncate(v: f64) -> Option<i64> {
    if v.is_finite() && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        Some(v.trunc() as i64)
    } else {
        None
    }
}

/// Remap `M` to 0 and `F` to 1. Anything else fails the batch.
pub fn remap_gender(table: Table, column: &str) -> Result<Table> {
    table.map_column(column, |row, value| match value.as_text() {
        Some("M") => Ok(Value::Int(0)),
        Some("F") => Ok(Value::Int(1)),
        _ => Err(coercion_error(column, row, &value, "gender code (M or F)")),
    })
}
