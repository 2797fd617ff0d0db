use crate::stations::error::StationError;
use crate::types::station::StationRecord;
use bincode::config::{Configuration, Fixint, LittleEndian};
use log::{debug, info, warn};
use reqwest::Client;
use std::collections::HashMap;
use std::path::Path;

const METADATA_URL: &str = "https://raw.githubusercontent.com/PeHMeteoN/ScrappingToolKit/master/PE_SENAMHI_HIDROMETEOROLOGY/senh_hist.json";
const BINCODE_CACHE_FILE_NAME: &str = "senamhi_stations.bin";
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// The station metadata list, indexed by station code.
///
/// Built once and handed to the client; lookups never touch the disk or network.
#[derive(Debug, Clone, Default)]
pub struct StationRegistry {
    stations: Vec<StationRecord>,
    by_code: HashMap<String, Vec<usize>>,
}

impl StationRegistry {
    /// Loads the metadata list from the bincode cache in `cache_dir`, downloading and
    /// caching the published list first if the cache file does not exist.
    pub async fn new(cache_dir: &Path) -> Result<Self, StationError> {
        let cache_file = cache_dir.join(BINCODE_CACHE_FILE_NAME);

        let stations = if cache_file.exists() {
            let path_clone = cache_file.clone();
            tokio::task::spawn_blocking(move || Self::get_cached_stations(&path_clone)).await??
        } else {
            info!("Station cache not found. Fetching from URL: {}", METADATA_URL);
            let stations = Self::fetch_stations().await?;
            Self::cache_stations(stations.clone(), &cache_file).await?;
            stations
        };

        Ok(Self::from_records(stations))
    }

    /// Loads a metadata list saved as JSON (an array of station objects).
    pub async fn from_json_file(path: &Path) -> Result<Self, StationError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| StationError::MetadataRead(path.to_path_buf(), e))?;
        let stations = tokio::task::spawn_blocking(move || {
            serde_json::from_slice::<Vec<StationRecord>>(&bytes).map_err(StationError::from)
        })
        .await??;
        Ok(Self::from_records(stations))
    }

    pub fn from_records(stations: Vec<StationRecord>) -> Self {
        let mut by_code: HashMap<String, Vec<usize>> = HashMap::with_capacity(stations.len());
        for (idx, station) in stations.iter().enumerate() {
            by_code.entry(station.code.clone()).or_default().push(idx);
        }
        Self { stations, by_code }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StationRecord> {
        self.stations.iter()
    }

    /// Exact-match lookup. A code listed more than once is an error, not a choice.
    pub fn lookup(&self, code: &str) -> Result<Option<&StationRecord>, StationError> {
        match self.by_code.get(code).map(Vec::as_slice) {
            None | Some([]) => Ok(None),
            Some([idx]) => Ok(self.stations.get(*idx)),
            Some(indices) => Err(StationError::Duplicate {
                code: code.to_string(),
                count: indices.len(),
            }),
        }
    }

    /// Like [`lookup`](Self::lookup), but a missing code is an error too.
    pub fn get(&self, code: &str) -> Result<&StationRecord, StationError> {
        self.lookup(code)?
            .ok_or_else(|| StationError::NotFound(code.to_string()))
    }

    fn get_cached_stations(cache_path: &Path) -> Result<Vec<StationRecord>, StationError> {
        let bytes = std::fs::read(cache_path)
            .map_err(|e| StationError::CacheRead(cache_path.to_path_buf(), e))?;
        let (decoded, _) =
            bincode::serde::decode_from_slice::<Vec<StationRecord>, _>(&bytes, BINCODE_CONFIG)
                .map_err(|e| StationError::CacheDecode(cache_path.to_path_buf(), Box::new(e)))?;
        debug!("Loaded {} stations from {}", decoded.len(), cache_path.display());
        Ok(decoded)
    }

    async fn fetch_stations() -> Result<Vec<StationRecord>, StationError> {
        let client = Client::new();
        let response = client
            .get(METADATA_URL)
            .send()
            .await
            .map_err(|e| StationError::NetworkRequest(METADATA_URL.to_string(), e))?;
        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                if let Some(status) = e.status() {
                    return Err(StationError::HttpStatus {
                        url: METADATA_URL.to_string(),
                        status,
                        source: e,
                    });
                } else {
                    return Err(StationError::NetworkRequest(METADATA_URL.to_string(), e));
                }
            }
        };
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StationError::NetworkRequest(METADATA_URL.to_string(), e))?;

        let stations = tokio::task::spawn_blocking(move || {
            serde_json::from_slice::<Vec<StationRecord>>(&bytes).map_err(StationError::from)
        })
        .await??;
        info!("Parsed {} stations from the metadata list", stations.len());
        Ok(stations)
    }

    async fn cache_stations(
        stations: Vec<StationRecord>,
        cache_path: &Path,
    ) -> Result<(), StationError> {
        let bincode_data = tokio::task::spawn_blocking(move || {
            bincode::serde::encode_to_vec(stations, BINCODE_CONFIG)
                .map_err(|e| StationError::CacheEncode(Box::new(e)))
        })
        .await??;
        if let Err(e) = tokio::fs::write(cache_path, &bincode_data).await {
            warn!("Could not write station cache to {}", cache_path.display());
            return Err(StationError::CacheWrite(cache_path.to_path_buf(), e));
        }
        debug!(
            "Wrote station cache ({} bytes) to {}",
            bincode_data.len(),
            cache_path.display()
        );
        Ok(())
    }
}
