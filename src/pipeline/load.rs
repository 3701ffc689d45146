use crate::config::validate_table_name;
use crate::constants::RUN_LEDGER_TABLE;
use crate::error::{EtlError, Result};
use crate::notify::{Notification, Notifier};
use crate::table::{Table, Value};
use chrono::{DateTime, Utc};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// Metadata about the run, recorded next to the data.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub source: String,
    pub source_sha256: String,
}

/// Where transformed tables end up.
pub trait Destination {
    /// Replace the named table with `table`, returning the number of rows written.
    fn replace_table(&mut self, name: &str, table: &Table, run: &RunRecord) -> Result<usize>;

    fn describe(&self) -> String;
}

/// SQLite database file. Each write drops and recreates the target table
/// inside one transaction, so a failed write leaves the old contents in place.
pub struct SqliteDestination {
    path: PathBuf,
}

impl SqliteDestination {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                EtlError::Persistence(format!("cannot create '{}': {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {RUN_LEDGER_TABLE} (
                run_id        TEXT PRIMARY KEY,
                started_at    TEXT NOT NULL,
                finished_at   TEXT NOT NULL,
                source        TEXT NOT NULL,
                source_sha256 TEXT NOT NULL,
                rows          INTEGER NOT NULL,
                columns       INTEGER NOT NULL,
                target_table  TEXT NOT NULL
            );
            "#
        ))?;
        Ok(conn)
    }
}

impl Destination for SqliteDestination {
    fn replace_table(&mut self, name: &str, table: &Table, run: &RunRecord) -> Result<usize> {
        validate_table_name(name).map_err(|e| EtlError::Persistence(e.to_string()))?;
        if name == RUN_LEDGER_TABLE {
            return Err(EtlError::Persistence(format!(
                "'{name}' is reserved for the run ledger"
            )));
        }

        let mut conn = self.open()?;
        let tx = conn.transaction()?;

        let mut column_defs = vec!["\"index\" INTEGER".to_string()];
        column_defs.extend(
            table
                .columns()
                .iter()
                .map(|c| format!("{} {}", quote_ident(&c.name), sql_type(&c.values))),
        );
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {name}; CREATE TABLE {name} ({});",
            column_defs.join(", ")
        ))?;

        let placeholders = vec!["?"; table.column_count() + 1].join(", ");
        {
            let mut stmt = tx.prepare(&format!("INSERT INTO {name} VALUES ({placeholders})"))?;
            for row in 0..table.row_count() {
                let index = row as i64;
                let mut cells: Vec<&dyn ToSql> = Vec::with_capacity(table.column_count() + 1);
                cells.push(&index);
                for column in table.columns() {
                    cells.push(&column.values[row]);
                }
                stmt.execute(cells.as_slice())?;
            }
        }

        tx.execute(
            &format!(
                "INSERT INTO {RUN_LEDGER_TABLE}
                 (run_id, started_at, finished_at, source, source_sha256, rows, columns, target_table)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ),
            params![
                run.run_id,
                run.started_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
                run.source,
                run.source_sha256,
                table.row_count() as i64,
                table.column_count() as i64,
                name,
            ],
        )?;
        tx.commit()?;
        Ok(table.row_count())
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Column affinity from the first non-null value.
fn sql_type(values: &[Value]) -> &'static str {
    match values.iter().find(|v| !v.is_null()) {
        Some(Value::Int(_)) => "INTEGER",
        Some(Value::Float(_)) => "REAL",
        _ => "TEXT",
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Int(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::Float(v) if v.is_nan() => ToSqlOutput::Owned(SqlValue::Null),
            Value::Float(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            other => ToSqlOutput::Owned(SqlValue::Text(other.to_string())),
        })
    }
}

/// Outcome of the load stage.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub destination: String,
    pub table: String,
    pub rows_written: usize,
    pub notification_error: Option<String>,
}

/// Persists a transformed table then announces completion.
pub struct Loader<'a> {
    destination: &'a mut dyn Destination,
    notifier: &'a dyn Notifier,
}

impl<'a> Loader<'a> {
    pub fn new(destination: &'a mut dyn Destination, notifier: &'a dyn Notifier) -> Self {
        Self {
            destination,
            notifier,
        }
    }

    /// Write `table` as a full replace of `table_name`. The notification is
    /// only sent after the write succeeded, and its failure is reported in
    /// the [`LoadReport`] without failing the load.
    #[instrument(skip_all, fields(table = %table_name, rows = table.row_count()))]
    pub fn load(
        &mut self,
        table: Table,
        table_name: &str,
        run: &RunRecord,
        notification: &Notification,
    ) -> Result<LoadReport> {
        let destination = self.destination.describe();
        info!("💾 Writing {} rows to {} ({})", table.row_count(), table_name, destination);
        let rows_written = self.destination.replace_table(table_name, &table, run)?;
        drop(table);
        metrics::counter!("fraud_etl_rows_loaded_total").increment(rows_written as u64);
        info!("✅ Wrote {} rows", rows_written);

        let notification_error = match self.notifier.notify(notification) {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    "Notification via {} failed, data stays committed: {}",
                    self.notifier.transport_name(),
                    e
                );
                metrics::counter!("fraud_etl_notifications_failed_total").increment(1);
                Some(e.to_string())
            }
        };

        Ok(LoadReport {
            destination,
            table: table_name.to_string(),
            rows_written,
            notification_error,
        })
    }
}
