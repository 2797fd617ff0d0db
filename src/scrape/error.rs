use crate::types::station_class::StationClass;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid request URL built from '{base}': {reason}")]
    InvalidUrl { base: String, reason: String },

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Expected a data table at index {index} but the page has {found} table(s)")]
    MissingTable { index: usize, found: usize },

    #[error("Row {row} has {found} cells but the {class} layout has {expected} columns")]
    SchemaMismatch {
        class: StationClass,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Could not parse date '{0}'")]
    UnparsableDate(String),

    #[error("Could not parse hour '{0}'")]
    UnparsableHour(String),

    #[error("No altitude (msnm) cell found on the metadata page of station {station}")]
    AltitudeNotFound { station: String },

    #[error("Altitude cell '{cell}' of station {station} does not start with a number")]
    UnparsableAltitude { station: String, cell: String },

    #[error("No chart script found on the archive page")]
    ChartScriptMissing,

    #[error("Chart array '{name}' not found (found {found} of {expected} expected)")]
    ChartArrayMissing {
        name: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Unterminated chart array '{0}'")]
    ChartArrayUnterminated(&'static str),

    #[error("Could not parse value '{value}' in chart array '{name}'")]
    ChartValue { name: &'static str, value: String },

    #[error("Chart array '{name}' has {found} values but categories has {expected}")]
    ChartLengthMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },
}
