use crate::constants::REQUIRED_RAW_COLUMNS;
use crate::error::{EtlError, Result};
use crate::table::{Column, Table, Value};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Raw table plus the fingerprint of the bytes it came from.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub table: Table,
    pub source_sha256: String,
}

/// Read the source file into a raw table of text cells.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn extract(path: &Path) -> Result<Extracted> {
    let bytes = std::fs::read(path).map_err(|source| EtlError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let source_sha256 = hex::encode(Sha256::digest(&bytes));
    debug!("Read {} bytes (sha256 {})", bytes.len(), source_sha256);

    let table = read_table(bytes.as_slice())?;
    info!(
        "Extracted {} rows x {} columns",
        table.row_count(),
        table.column_count()
    );
    metrics::counter!("fraud_etl_rows_extracted_total").increment(table.row_count() as u64);

    Ok(Extracted {
        table,
        source_sha256,
    })
}

/// Parse CSV with a header row and check the raw schema. Cells are kept
/// verbatim; only empty cells become `Null`.
pub fn read_table<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    check_schema(&headers)?;

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for record in rdr.records() {
        let record = record?;
        for (values, cell) in columns.iter_mut().zip(record.iter()) {
            values.push(if cell.is_empty() {
                Value::Null
            } else {
                Value::Text(cell.to_string())
            });
        }
    }

    Table::from_columns(
        headers
            .into_iter()
            .zip(columns)
            .map(|(name, values)| Column::new(name, values))
            .collect(),
    )
}

fn check_schema(headers: &[String]) -> Result<()> {
    for (i, name) in headers.iter().enumerate() {
        if headers[..i].contains(name) {
            return Err(EtlError::SchemaMismatch(format!("duplicate column '{name}'")));
        }
    }

    let missing: Vec<&str> = REQUIRED_RAW_COLUMNS
        .iter()
        .copied()
        .filter(|required| !headers.iter().any(|h| h == required))
        .collect();
    if !missing.is_empty() {
        return Err(EtlError::SchemaMismatch(format!(
            "missing required columns: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}
