use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StationError {
    #[error("Station code '{0}' is not in the metadata list")]
    NotFound(String),

    #[error("Station code '{code}' appears {count} times in the metadata list")]
    Duplicate { code: String, count: usize },

    #[error("Failed to read metadata file '{0}'")]
    MetadataRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to read cache file '{0}'")]
    CacheRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to write cache file '{0}'")]
    CacheWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to decode cache data from '{0}'")]
    CacheDecode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Failed to encode cache data")]
    CacheEncode(#[source] Box<bincode::error::EncodeError>),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse station metadata JSON")]
    JsonParse(#[from] serde_json::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
