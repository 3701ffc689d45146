use anyhow::Context;
use clap::{Parser, Subcommand};
use fraud_etl::config::Config;
use fraud_etl::pipeline::Pipeline;
use fraud_etl::{logging, Value};
use std::path::PathBuf;
use tracing::{error, warn};

#[derive(Parser)]
#[command(name = "fraud_etl")]
#[command(about = "Clean and label-encode card transactions for fraud modeling")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run extract, transform and load once
    Run {
        /// Config file (defaults to ./config.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Source CSV file
        #[arg(long)]
        source: Option<PathBuf>,
        /// SQLite database file
        #[arg(long)]
        database: Option<PathBuf>,
        /// Destination table name
        #[arg(long)]
        table: Option<String>,
    },
    /// Extract and transform, then print the first rows as JSON without writing
    Preview {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        source: Option<PathBuf>,
        /// Number of rows to print
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },
}

fn load_config(path: Option<PathBuf>, source: Option<PathBuf>) -> anyhow::Result<Config> {
    let mut config = Config::load(path.as_deref()).context("loading configuration")?;
    if let Some(source) = source {
        config.source.path = source;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            source,
            database,
            table,
        } => {
            let mut config = load_config(config, source)?;
            if let Some(database) = database {
                config.destination.database = database;
            }
            if let Some(table) = table {
                config.destination.table = table;
            }
            config.validate().context("validating configuration")?;
            let _guard = logging::init_logging(&config.logging.dir);

            let result = match Pipeline::run(&config) {
                Ok(result) => result,
                Err(e) => {
                    if e.is_pre_load() {
                        error!("Run aborted before load, destination untouched: {}", e);
                    } else {
                        error!("Run failed: {}", e);
                    }
                    return Err(e).context("ETL run failed");
                }
            };

            println!("\n📊 Run {}:", result.run_id);
            println!("   Source: {}", result.source);
            println!("   Rows extracted: {}", result.rows_extracted);
            println!("   Rows loaded: {}", result.load.rows_written);
            println!(
                "   Unparseable timestamps: {}",
                result.transform.unparseable_timestamps
            );
            println!("   Destination: {} / {}", result.load.destination, result.load.table);
            if let Some(err) = &result.load.notification_error {
                warn!("Completion notification failed: {}", err);
                println!("⚠️  Notification failed: {}", err);
            }
        }
        Commands::Preview {
            config,
            source,
            rows,
        } => {
            let config = load_config(config, source)?;
            config.validate().context("validating configuration")?;
            let _guard = logging::init_logging(&config.logging.dir);

            let (table, report) = Pipeline::preview(&config).context("preview failed")?;
            let names = table.column_names();
            let shown = rows.min(table.row_count());
            let sample: Vec<serde_json::Map<String, serde_json::Value>> = (0..shown)
                .filter_map(|i| table.row(i))
                .map(|row| {
                    names
                        .iter()
                        .zip(row)
                        .map(|(name, value): (&&str, &Value)| {
                            Ok((name.to_string(), serde_json::to_value(value)?))
                        })
                        .collect::<serde_json::Result<_>>()
                })
                .collect::<serde_json::Result<_>>()?;
            let output = serde_json::json!({ "report": report, "rows": sample });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}
