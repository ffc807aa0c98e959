// Error taxonomy for statistic computation.
//
// Range errors are raised before any I/O. Provisioning and store failures
// wrap their underlying cause untouched so callers can inspect it.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Failure of a statistic query. A query that finds no qualifying events is
/// not an error; it yields `Ok(None)`.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("date range {start}..={end} spans more than one season")]
    CrossYearRange { start: NaiveDate, end: NaiveDate },

    #[error("failed to provision season data: {0}")]
    Provisioning(#[from] ProvisionError),

    #[error("analytical store failure: {0}")]
    Store(#[from] StoreError),
}

/// Failure while fetching or unpacking a season archive.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("failed to download {url}: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to unpack archive {path}: {source}")]
    Archive {
        path: PathBuf,
        source: zip::result::ZipError,
    },
}

/// Failure inside the analytical store: opening, loading a season table, or
/// running an aggregate query.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}
