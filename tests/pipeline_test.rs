use anyhow::Result;
use fraud_etl::config::{Config, Transport};
use fraud_etl::{EtlError, Pipeline};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const HEADER: &str = ",trans_date_trans_time,cc_num,merchant,category,amt,first,last,gender,street,city,state,zip,lat,long,city_pop,job,dob,trans_num,unix_time,merch_lat,merch_long,is_fraud";

const EXAMPLE_ROW: &str = "0,20/03/2024 14:30,123,Acme,retail,12.50,Jane,Doe,F,Main St,Philadelphia,PA,19019,40.0,-75.0,5000,Engineer,1990-01-01,t-001,1700000000,40.1,-75.2,0";
const SECOND_ROW: &str = "1,21/03/2024 09:05,99,Bolt,travel,300.00,Joe,Roe,M,Oak Ave,Austin,TX,73301,30.2,-97.7,900000,Baker,1975-06-30,t-002,1700001000,30.3,-97.8,1";
const THIRD_ROW: &str = "2,22/03/2024 23:59,123,Acme,retail,5.25,Jane,Doe,F,Main St,Philadelphia,PA,19019,40.0,-75.0,5000,Engineer,1990-01-01,t-003,1700002000,40.1,-75.2,0";

struct Fixture {
    dir: TempDir,
    config: Config,
}

impl Fixture {
    fn new(rows: &[&str]) -> Result<Self> {
        let dir = tempdir()?;
        let source = dir.path().join("fraud test.csv");
        let mut body = String::from(HEADER);
        for row in rows {
            body.push('\n');
            body.push_str(row);
        }
        body.push('\n');
        fs::write(&source, body)?;

        let mut config = Config::default();
        config.source.path = source;
        config.destination.database = dir.path().join("db").join("fraud.db");
        config.destination.table = "transactions".to_string();
        config.notification.transport = Transport::Outbox;
        config.notification.outbox_dir = dir.path().join("outbox");
        config.logging.dir = dir.path().join("logs");
        Ok(Self { dir, config })
    }

    fn db(&self) -> &Path {
        &self.config.destination.database
    }

    fn outbox_files(&self) -> Vec<PathBuf> {
        fs::read_dir(&self.config.notification.outbox_dir)
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default()
    }
}

fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

fn encoded_rows(db: &Path) -> Result<Vec<(i64, i64, i64, i64, i64, i64)>> {
    let conn = Connection::open(db)?;
    let mut stmt = conn.prepare(
        "SELECT job, cc_num, merchant, street, category, location FROM transactions ORDER BY \"index\"",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[test]
fn test_end_to_end_example_row() -> Result<()> {
    let fx = Fixture::new(&[EXAMPLE_ROW, SECOND_ROW])?;
    let result = Pipeline::run(&fx.config)?;

    assert_eq!(result.rows_extracted, 2);
    assert_eq!(result.load.rows_written, 2);
    assert!(result.load.notification_error.is_none());

    let conn = Connection::open(fx.db())?;
    let columns = column_names(&conn, "transactions")?;
    for gone in ["", "trans_date_trans_time", "city_pop", "city", "state", "is_fraud"] {
        assert!(!columns.iter().any(|c| c == gone), "{gone:?} should be dropped");
    }
    let tail: Vec<&str> = columns.iter().rev().take(3).rev().map(String::as_str).collect();
    assert_eq!(tail, vec!["trans_date", "trans_time", "location"]);
    assert!(columns.iter().any(|c| c == "Target"));
    assert!(columns.iter().any(|c| c == "trans_num"));

    let (target, gender, amt, trans_date, trans_time, location, dob): (
        i64,
        i64,
        f64,
        String,
        String,
        i64,
        String,
    ) = conn.query_row(
        "SELECT Target, gender, amt, trans_date, trans_time, location, dob FROM transactions WHERE \"index\" = 0",
        [],
        |r| {
            Ok((
                r.get(0)?,
                r.get(1)?,
                r.get(2)?,
                r.get(3)?,
                r.get(4)?,
                r.get(5)?,
                r.get(6)?,
            ))
        },
    )?;
    assert_eq!(target, 0);
    assert_eq!(gender, 1);
    assert_eq!(amt, 12.5);
    assert_eq!(trans_date, "2024-03-20");
    assert_eq!(trans_time, "14:30:00");
    // "Austin, TX" sorts before "Philadelphia, PA"
    assert_eq!(location, 1);
    assert_eq!(dob, "1990-01-01 00:00:00");

    let second_target: i64 = conn.query_row(
        "SELECT Target FROM transactions WHERE \"index\" = 1",
        [],
        |r| r.get(0),
    )?;
    assert_eq!(second_target, 1);

    let (runs, sha): (i64, String) = conn.query_row(
        "SELECT COUNT(*), MAX(source_sha256) FROM etl_runs",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    assert_eq!(runs, 1);
    assert_eq!(sha.len(), 64);

    assert_eq!(fx.outbox_files().len(), 1);
    Ok(())
}

#[test]
fn test_non_numeric_amount_aborts_without_write() -> Result<()> {
    let bad = SECOND_ROW.replace("300.00", "three hundred");
    let fx = Fixture::new(&[EXAMPLE_ROW, bad.as_str()])?;

    let err = Pipeline::run(&fx.config).unwrap_err();
    assert!(matches!(err, EtlError::TypeCoercion { ref column, row: 1, .. } if column == "amt"));
    assert!(!fx.db().exists(), "destination must not be created");
    assert!(fx.outbox_files().is_empty(), "no completion notice on failure");
    Ok(())
}

#[test]
fn test_unparseable_timestamp_degrades_only_its_row() -> Result<()> {
    let bad = SECOND_ROW.replace("21/03/2024 09:05", "31/02/2024 99:99");
    let fx = Fixture::new(&[EXAMPLE_ROW, bad.as_str(), THIRD_ROW])?;

    let result = Pipeline::run(&fx.config)?;
    assert_eq!(result.load.rows_written, 3);
    assert_eq!(result.transform.unparseable_timestamps, 1);

    let conn = Connection::open(fx.db())?;
    let mut stmt =
        conn.prepare("SELECT trans_date, trans_time FROM transactions ORDER BY \"index\"")?;
    let rows = stmt
        .query_map([], |r| {
            Ok((r.get::<_, Option<String>>(0)?, r.get::<_, Option<String>>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    assert_eq!(rows[0], (Some("2024-03-20".into()), Some("14:30:00".into())));
    assert_eq!(rows[1], (None, None));
    assert_eq!(rows[2], (Some("2024-03-22".into()), Some("23:59:00".into())));
    Ok(())
}

#[test]
fn test_same_batch_twice_gives_identical_codes() -> Result<()> {
    let fx = Fixture::new(&[SECOND_ROW, EXAMPLE_ROW, THIRD_ROW])?;

    Pipeline::run(&fx.config)?;
    let first = encoded_rows(fx.db())?;
    Pipeline::run(&fx.config)?;
    let second = encoded_rows(fx.db())?;

    assert_eq!(first, second);
    // rows 1 and 2 share every categorical value
    assert_eq!(first[1], first[2]);
    assert_ne!(first[0], first[1]);
    Ok(())
}

#[test]
fn test_rerun_replaces_instead_of_appending() -> Result<()> {
    let fx = Fixture::new(&[EXAMPLE_ROW, SECOND_ROW, THIRD_ROW])?;
    Pipeline::run(&fx.config)?;
    Pipeline::run(&fx.config)?;

    let conn = Connection::open(fx.db())?;
    let rows: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))?;
    let runs: i64 = conn.query_row("SELECT COUNT(*) FROM etl_runs", [], |r| r.get(0))?;
    assert_eq!(rows, 3);
    assert_eq!(runs, 2);
    assert_eq!(fx.outbox_files().len(), 2);
    Ok(())
}

#[test]
fn test_padded_cells_load_as_their_own_categories() -> Result<()> {
    let padded = THIRD_ROW
        .replace(",Acme,", ",Acme ,")
        .replace(",Engineer,", ", ,");
    let fx = Fixture::new(&[EXAMPLE_ROW, padded.as_str()])?;
    Pipeline::run(&fx.config)?;

    let rows = encoded_rows(fx.db())?;
    assert_eq!(rows.len(), 2);
    // merchant: "Acme" < "Acme "
    assert_eq!((rows[0].2, rows[1].2), (0, 1));
    // job: " " < "Engineer"
    assert_eq!((rows[0].0, rows[1].0), (1, 0));
    Ok(())
}

#[test]
fn test_missing_source_is_source_unavailable() -> Result<()> {
    let mut fx = Fixture::new(&[EXAMPLE_ROW])?;
    fx.config.source.path = fx.dir.path().join("missing.csv");

    let err = Pipeline::run(&fx.config).unwrap_err();
    assert!(matches!(err, EtlError::SourceUnavailable { .. }));
    assert!(err.is_pre_load());
    assert!(!fx.db().exists());
    Ok(())
}

#[test]
fn test_missing_required_column_is_schema_mismatch() -> Result<()> {
    let fx = Fixture::new(&[])?;
    let trimmed = HEADER.replace(",is_fraud", "");
    fs::write(&fx.config.source.path, format!("{trimmed}\n"))?;

    let err = Pipeline::run(&fx.config).unwrap_err();
    match err {
        EtlError::SchemaMismatch(msg) => assert!(msg.contains("is_fraud")),
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[test]
fn test_notification_failure_keeps_committed_data() -> Result<()> {
    let mut fx = Fixture::new(&[EXAMPLE_ROW])?;
    let blocker = fx.dir.path().join("blocker");
    fs::write(&blocker, "a file, not a directory")?;
    fx.config.notification.outbox_dir = blocker.join("outbox");

    let result = Pipeline::run(&fx.config)?;
    assert!(result.load.notification_error.is_some());

    let conn = Connection::open(fx.db())?;
    let rows: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))?;
    assert_eq!(rows, 1);
    Ok(())
}

#[test]
fn test_preview_does_not_touch_destination() -> Result<()> {
    let fx = Fixture::new(&[EXAMPLE_ROW, SECOND_ROW])?;
    let (table, report) = Pipeline::preview(&fx.config)?;

    assert_eq!(table.row_count(), 2);
    assert_eq!(report.rows, 2);
    assert_eq!(report.vocabulary_sizes.get("location"), Some(&2));
    assert!(!fx.db().exists());
    assert!(fx.outbox_files().is_empty());
    Ok(())
}
