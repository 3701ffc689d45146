//! Cleaning and encoding of raw transactions.
//!
//! [`transform`] runs a fixed sequence of `Table -> Table` steps. The order
//! matters: gender must be numeric before the integer coercion, and the
//! timestamp, city and state columns are read before they are dropped.

pub mod coerce;
pub mod datetime;
pub mod encode;

use crate::constants::*;
use crate::error::Result;
use crate::table::{Column, Table, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

pub use encode::{EncoderState, LabelEncoder};

/// Output of a transform run: the cleaned table and the encoders that produced its codes.
#[derive(Debug, Clone)]
pub struct Transformed {
    pub table: Table,
    pub encoders: EncoderState,
    pub report: TransformReport,
}

/// Summary of one transform run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransformReport {
    pub rows: usize,
    pub columns: usize,
    pub unparseable_timestamps: usize,
    pub vocabulary_sizes: BTreeMap<String, usize>,
}

#[instrument(skip_all, fields(rows = table.row_count()))]
pub fn transform(table: Table) -> Result<Transformed> {
    let rows_in = table.row_count();

    let table = table.rename(IS_FRAUD, TARGET)?;
    debug!("Renamed {} to {}", IS_FRAUD, TARGET);

    let table = coerce::to_float(table, &FLOAT_COLUMNS)?;
    debug!("Coerced {:?} to float", FLOAT_COLUMNS);

    let table = coerce::remap_gender(table, GENDER)?;
    let table = coerce::to_integer(table, &INTEGER_COLUMNS)?;
    debug!("Coerced {:?} to integer", INTEGER_COLUMNS);

    let (table, unparseable_timestamps) =
        datetime::parse_lenient(table, TRANS_DATE_TRANS_TIME, TRANSACTION_TIMESTAMP_FORMAT)?;
    if unparseable_timestamps > 0 {
        warn!(
            "{} of {} transaction timestamps could not be parsed",
            unparseable_timestamps, rows_in
        );
        metrics::counter!("fraud_etl_unparseable_timestamps_total")
            .increment(unparseable_timestamps as u64);
    }
    let table = datetime::parse_permissive(table, DOB)?;

    let table = datetime::split_datetime(table, TRANS_DATE_TRANS_TIME, TRANS_DATE, TRANS_TIME)?;
    let table = add_location(table)?;
    let table = drop_consumed_columns(table);
    debug!("Schema after drop: {:?}", table.column_names());

    let (table, encoders) = encode::encode_columns(table, &ENCODED_COLUMNS)?;

    let report = TransformReport {
        rows: table.row_count(),
        columns: table.column_count(),
        unparseable_timestamps,
        vocabulary_sizes: encoders.vocabulary_sizes(),
    };
    info!(
        "Transformed {} rows into {} columns ({} unparseable timestamps)",
        report.rows, report.columns, report.unparseable_timestamps
    );

    Ok(Transformed {
        table,
        encoders,
        report,
    })
}

/// Append `location` as `"{city}, {state}"`; missing either part leaves it empty.
fn add_location(table: Table) -> Result<Table> {
    let city = &table.require(CITY)?.values;
    let state = &table.require(STATE)?.values;
    let location: Vec<Value> = city
        .iter()
        .zip(state)
        .map(|(c, s)| {
            if c.is_null() || s.is_null() {
                Value::Null
            } else {
                Value::Text(format!("{c}, {s}"))
            }
        })
        .collect();
    table.with_column(Column::new(LOCATION, location))
}

fn drop_consumed_columns(table: Table) -> Table {
    let mut names: Vec<&str> = DROPPED_COLUMNS.to_vec();
    names.extend(INDEX_ARTIFACT_COLUMNS);
    table.without_columns(&names)
}
