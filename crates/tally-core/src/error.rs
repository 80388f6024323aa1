//! Error types for Tally

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Unsupported granularity: {0} (valid: month, quarter, year)")]
    UnsupportedGranularity(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A ledger or workspace metadata read failed
    #[error("Upstream read failed: {0}")]
    UpstreamRead(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Whether this error is a caller-side precondition violation
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidRange(_) | Error::UnsupportedGranularity(_) | Error::InvalidData(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
