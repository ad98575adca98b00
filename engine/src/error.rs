use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Ordering violation at sample {index}: {current} precedes previous timestamp {previous}")]
    OrderingViolation {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    // Every retained history record is older than the cutoff, so there is no
    // record to age out. Only malformed input gets here.
    #[error("Volume window search out of bounds: cutoff {cutoff} is past the retained history {first}..={last} ({len} records)")]
    WindowSearch {
        cutoff: DateTime<Utc>,
        first: DateTime<Utc>,
        last: DateTime<Utc>,
        len: usize,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("CSV parsing system error: {source}")]
    CsvSystemError {
        #[from]
        source: csv::Error,
    },

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("JSON error: {source}")]
    JsonError {
        #[from]
        source: serde_json::Error,
    },

    #[error("CSV data format error: {0}")]
    CsvDataFormatError(String),

    #[error(transparent)]
    AnyhowError(#[from] anyhow::Error),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
