use crate::constants::{DEFAULT_DATABASE_PATH, DEFAULT_SOURCE_PATH, DEFAULT_TABLE};
use crate::error::{EtlError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub destination: DestinationConfig,
    pub notification: NotificationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
    pub database: PathBuf,
    pub table: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Log,
    Outbox,
    Webhook,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub transport: Transport,
    pub recipient: String,
    pub outbox_dir: PathBuf,
    pub webhook_url: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SOURCE_PATH),
        }
    }
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE_PATH),
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Log,
            recipient: "etl-operators@localhost".to_string(),
            outbox_dir: PathBuf::from("outbox"),
            webhook_url: None,
            timeout_seconds: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from `config.toml` when present,
    /// then apply environment overrides. Callers validate once their own
    /// overrides are in place.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&config_content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Overlay `FRAUD_ETL_*` variables. `lookup` is injectable for tests.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("FRAUD_ETL_SOURCE") {
            self.source.path = PathBuf::from(v);
        }
        if let Some(v) = get("FRAUD_ETL_DATABASE") {
            self.destination.database = PathBuf::from(v);
        }
        if let Some(v) = get("FRAUD_ETL_TABLE") {
            self.destination.table = v;
        }
        if let Some(v) = get("FRAUD_ETL_NOTIFY_TRANSPORT") {
            self.notification.transport = match v.trim().to_ascii_lowercase().as_str() {
                "log" => Transport::Log,
                "outbox" => Transport::Outbox,
                "webhook" => Transport::Webhook,
                other => {
                    return Err(EtlError::Config(format!(
                        "unknown notification transport '{other}' in FRAUD_ETL_NOTIFY_TRANSPORT"
                    )))
                }
            };
        }
        if let Some(v) = get("FRAUD_ETL_NOTIFY_RECIPIENT") {
            self.notification.recipient = v;
        }
        if let Some(v) = get("FRAUD_ETL_WEBHOOK_URL") {
            self.notification.webhook_url = Some(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        validate_table_name(&self.destination.table)?;
        if self.notification.recipient.trim().is_empty() {
            return Err(EtlError::Config("notification recipient is empty".into()));
        }
        if self.notification.transport == Transport::Webhook
            && self
                .notification
                .webhook_url
                .as_deref()
                .map_or(true, |u| u.trim().is_empty())
        {
            return Err(EtlError::Config(
                "webhook transport requires notification.webhook_url".into(),
            ));
        }
        Ok(())
    }
}

/// Table names are spliced into SQL, so only `[A-Za-z0-9_]` is allowed.
pub fn validate_table_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(EtlError::Config(format!("invalid table name '{name}'")));
    }
    Ok(())
}
