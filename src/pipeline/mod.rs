// Fraud ETL pipeline: extract, transform, load

pub mod extract;
pub mod load;
pub mod transform;

use self::load::{Destination, LoadReport, Loader, RunRecord, SqliteDestination};
use self::transform::{TransformReport, Transformed};
use crate::config::Config;
use crate::error::Result;
use crate::notify::{notifier_from_config, Notification, Notifier};
use crate::table::Table;
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::{error, info, instrument};

/// The three stages, always run in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Transform,
    Load,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Transform => "transform",
            Stage::Load => "load",
        }
    }

}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub run_id: String,
    pub source: String,
    pub rows_extracted: usize,
    pub transform: TransformReport,
    pub load: LoadReport,
}

pub struct Pipeline;

impl Pipeline {
    /// Run extract → transform → load with the destination and notifier
    /// described by `config`.
    pub fn run(config: &Config) -> Result<PipelineResult> {
        let notifier = notifier_from_config(&config.notification)?;
        let mut destination = SqliteDestination::new(&config.destination.database);
        Self::run_with(config, &mut destination, notifier.as_ref())
    }

    /// Same as [`Pipeline::run`] with explicit collaborators.
    #[instrument(skip_all, fields(source = %config.source.path.display()))]
    pub fn run_with(
        config: &Config,
        destination: &mut dyn Destination,
        notifier: &dyn Notifier,
    ) -> Result<PipelineResult> {
        metrics::counter!("fraud_etl_runs_total").increment(1);
        let run = RunRecord {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            source: config.source.path.display().to_string(),
            source_sha256: String::new(),
        };
        info!("🚀 Starting run {} for {}", run.run_id, run.source);

        let extracted = timed(Stage::Extract, || extract::extract(&config.source.path))?;
        let rows_extracted = extracted.table.row_count();
        let run = RunRecord {
            source_sha256: extracted.source_sha256,
            ..run
        };

        let Transformed { table, report, .. } =
            timed(Stage::Transform, || transform::transform(extracted.table))?;

        let notification = Notification::completed(&config.notification);
        let load = timed(Stage::Load, || {
            Loader::new(destination, notifier).load(
                table,
                &config.destination.table,
                &run,
                &notification,
            )
        })?;

        info!("🎉 Run {} completed: {} rows loaded", run.run_id, load.rows_written);
        Ok(PipelineResult {
            run_id: run.run_id,
            source: run.source,
            rows_extracted,
            transform: report,
            load,
        })
    }

    /// Extract and transform without touching the destination.
    pub fn preview(config: &Config) -> Result<(Table, TransformReport)> {
        let extracted = timed(Stage::Extract, || extract::extract(&config.source.path))?;
        let transformed = timed(Stage::Transform, || transform::transform(extracted.table))?;
        Ok((transformed.table, transformed.report))
    }
}

fn timed<T, F>(stage: Stage, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    info!("🔄 Stage {}", stage);
    let started = Instant::now();
    let result = f();
    let secs = started.elapsed().as_secs_f64();
    metrics::histogram!("fraud_etl_stage_duration_seconds", "stage" => stage.name()).record(secs);
    match &result {
        Ok(_) => info!("✅ Stage {} finished in {:.3}s", stage, secs),
        Err(e) => error!("❌ Stage {} failed after {:.3}s: {}", stage, secs, e),
    }
    result
}
