//! In-memory tabular data shared by every stage.
//!
//! A [`Table`] is a list of equally long named columns. Operations take the
//! table by value and hand back a new one, so each transform step states its
//! schema effect in its signature instead of mutating shared state.

use crate::error::{EtlError, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::fmt;

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Build a table from columns, rejecting ragged or duplicated columns.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
        for (i, column) in columns.iter().enumerate() {
            if column.values.len() != rows {
                return Err(EtlError::SchemaMismatch(format!(
                    "column '{}' has {} values, expected {}",
                    column.name,
                    column.values.len(),
                    rows
                )));
            }
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(EtlError::SchemaMismatch(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Like [`Table::column`] but a missing column is a schema error.
    pub fn require(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| EtlError::SchemaMismatch(format!("missing column '{name}'")))
    }

    /// Values of one row in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        if index >= self.rows {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[index]).collect())
    }

    pub fn rename(mut self, from: &str, to: &str) -> Result<Self> {
        if from != to && self.has_column(to) {
            return Err(EtlError::SchemaMismatch(format!(
                "cannot rename '{from}' to existing column '{to}'"
            )));
        }
        let pos = self.position_or_err(from)?;
        self.columns[pos].name = to.to_string();
        Ok(self)
    }

    /// Rewrite every value of one column. The closure gets the row index and
    /// the owned value; the first error aborts the whole rewrite.
    pub fn map_column<F>(mut self, name: &str, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, Value) -> Result<Value>,
    {
        let pos = self.position_or_err(name)?;
        let values = std::mem::take(&mut self.columns[pos].values);
        self.columns[pos].values = values
            .into_iter()
            .enumerate()
            .map(|(row, v)| f(row, v))
            .collect::<Result<Vec<_>>>()?;
        Ok(self)
    }

    /// Swap a column's values wholesale. The replacement must keep the row count.
    pub fn replace_column<F>(mut self, name: &str, f: F) -> Result<Self>
    where
        F: FnOnce(Vec<Value>) -> Result<Vec<Value>>,
    {
        let pos = self.position_or_err(name)?;
        let values = f(std::mem::take(&mut self.columns[pos].values))?;
        if values.len() != self.rows {
            return Err(EtlError::SchemaMismatch(format!(
                "column '{name}' replaced with {} values, expected {}",
                values.len(),
                self.rows
            )));
        }
        self.columns[pos].values = values;
        Ok(self)
    }

    /// Append a column at the end of the schema.
    pub fn with_column(mut self, column: Column) -> Result<Self> {
        if self.has_column(&column.name) {
            return Err(EtlError::SchemaMismatch(format!(
                "column '{}' already exists",
                column.name
            )));
        }
        if self.columns.is_empty() {
            self.rows = column.values.len();
        } else if column.values.len() != self.rows {
            return Err(EtlError::SchemaMismatch(format!(
                "column '{}' has {} values, expected {}",
                column.name,
                column.values.len(),
                self.rows
            )));
        }
        self.columns.push(column);
        Ok(self)
    }

    /// Remove the named columns; names that are not present are ignored.
    pub fn without_columns(mut self, names: &[&str]) -> Self {
        self.columns.retain(|c| !names.contains(&c.name.as_str()));
        self
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    fn position_or_err(&self, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| EtlError::SchemaMismatch(format!("missing column '{name}'")))
    }
}
