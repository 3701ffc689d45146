use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Source unavailable '{}': {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("CSV parse failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Type coercion failed for column '{column}' at row {row}: cannot read {value:?} as {expected}")]
    TypeCoercion {
        column: String,
        row: usize,
        value: String,
        expected: &'static str,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<rusqlite::Error> for EtlError {
    fn from(err: rusqlite::Error) -> Self {
        EtlError::Persistence(err.to_string())
    }
}

impl From<reqwest::Error> for EtlError {
    fn from(err: reqwest::Error) -> Self {
        EtlError::Notification(err.to_string())
    }
}

impl EtlError {
    /// Fatal errors raised before anything reaches the destination.
    pub fn is_pre_load(&self) -> bool {
        matches!(
            self,
            EtlError::SourceUnavailable { .. }
                | EtlError::SchemaMismatch(_)
                | EtlError::Csv(_)
                | EtlError::TypeCoercion { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
