use crate::reconcile::error::ReconcileError;
use crate::scrape::error::FetchError;
use crate::stations::error::StationError;
use crate::types::station_class::ClassificationError;
use chrono::NaiveDate;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SenamhiError {
    #[error(transparent)]
    Station(#[from] StationError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to resolve the altitude of station '{station}'")]
    Altitude {
        station: String,
        #[source]
        source: FetchError,
    },

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Failed to write output file '{0}'")]
    OutputWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to write CSV to '{0}'")]
    OutputCsv(PathBuf, #[source] PolarsError),

    #[error("Failed building data frame: {0}")]
    Frame(#[from] PolarsError),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution(#[source] std::io::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
