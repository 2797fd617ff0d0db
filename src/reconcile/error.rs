use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Unrecognized station class: {0}")]
    UnrecognizedStationClass(String),

    #[error("Archive has no entries")]
    EmptySpan,

    #[error("Year {year} has {entries} archive entries but only {days} days")]
    YearOverflow { year: i32, entries: usize, days: u32 },

    #[error("Archive span from {first_year} to {last_year} covers {expected} days but has {found} entries")]
    SpanLengthMismatch {
        first_year: i32,
        last_year: i32,
        expected: usize,
        found: usize,
    },

    #[error("Year {0} is outside the supported calendar")]
    InvalidYear(i32),

    #[error("Failed building reconciled frame: {0}")]
    Frame(#[from] PolarsError),
}
