//! Timestamp parsing and decomposition.

use crate::constants::{DOB_DATETIME_FORMATS, DOB_DATE_FORMATS};
use crate::error::{EtlError, Result};
use crate::table::{Column, Table, Value};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, warn};

/// Parse a column with one fixed format. Cells that do not parse become
/// `Null`; the number of such cells is returned with the table.
pub fn parse_lenient(table: Table, column: &str, format: &str) -> Result<(Table, usize)> {
    let mut failed = 0usize;
    let table = table.map_column(column, |row, value| {
        let parsed = match &value {
            Value::Text(s) => NaiveDateTime::parse_from_str(s.trim(), format).ok(),
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        };
        Ok(match parsed {
            Some(dt) => Value::DateTime(dt),
            None => {
                failed += 1;
                warn!(column, row, value = %value, "Unparseable timestamp, leaving it empty");
                Value::Null
            }
        })
    })?;
    Ok((table, failed))
}

/// Parse a column whose layout is inferred from its first non-empty cell.
/// Every other cell must match that layout; a value that does not fails the
/// batch. Missing and blank cells become `Null`.
pub fn parse_permissive(table: Table, column: &str) -> Result<Table> {
    let first = table
        .require(column)?
        .values
        .iter()
        .enumerate()
        .find_map(|(row, v)| {
            v.as_text()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| (row, s.to_string()))
        });
    let layout = match first {
        Some((row, s)) => Some(DateLayout::infer(&s).ok_or_else(|| EtlError::TypeCoercion {
            column: column.to_string(),
            row,
            value: s.clone(),
            expected: "date",
        })?),
        None => None,
    };
    if let Some(layout) = layout {
        debug!(column, ?layout, "Inferred date layout");
    }

    table.map_column(column, |row, value| match value {
        Value::Null => Ok(Value::Null),
        Value::DateTime(dt) => Ok(Value::DateTime(dt)),
        Value::Date(d) => Ok(Value::DateTime(d.and_time(NaiveTime::MIN))),
        Value::Text(s) if s.trim().is_empty() => Ok(Value::Null),
        Value::Text(s) => layout
            .and_then(|l| l.parse(s.trim()))
            .map(Value::DateTime)
            .ok_or_else(|| EtlError::TypeCoercion {
                column: column.to_string(),
                row,
                value: s.to_string(),
                expected: "date",
            }),
        other => Err(EtlError::TypeCoercion {
            column: column.to_string(),
            row,
            value: other.to_string(),
            expected: "date",
        }),
    })
}

/// One textual date layout, applied to a whole column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateLayout {
    DateTime(&'static str),
    Date(&'static str),
    Rfc3339,
}

impl DateLayout {
    fn infer(s: &str) -> Option<Self> {
        DOB_DATETIME_FORMATS
            .iter()
            .map(|&f| DateLayout::DateTime(f))
            .chain(DOB_DATE_FORMATS.iter().map(|&f| DateLayout::Date(f)))
            .chain(std::iter::once(DateLayout::Rfc3339))
            .find(|layout| layout.parse(s).is_some())
    }

    fn parse(self, s: &str) -> Option<NaiveDateTime> {
        match self {
            DateLayout::DateTime(f) => NaiveDateTime::parse_from_str(s, f).ok(),
            DateLayout::Date(f) => NaiveDate::parse_from_str(s, f)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN)),
            DateLayout::Rfc3339 => chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.naive_utc()),
        }
    }
}

/// Append date and time-of-day columns taken from a parsed timestamp column.
pub fn split_datetime(table: Table, source: &str, date_col: &str, time_col: &str) -> Result<Table> {
    let (dates, times): (Vec<Value>, Vec<Value>) = table
        .require(source)?
        .values
        .iter()
        .map(|v| match v {
            Value::DateTime(dt) => (Value::Date(dt.date()), Value::Time(dt.time())),
            _ => (Value::Null, Value::Null),
        })
        .unzip();
    table
        .with_column(Column::new(date_col, dates))?
        .with_column(Column::new(time_col, times))
}
