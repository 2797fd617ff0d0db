//! The main entry point: a client that resolves stations from the metadata list and
//! downloads their tables from the near-real-time network or the historic archive.

use crate::error::SenamhiError;
use crate::reconcile::month::reconcile_month;
use crate::reconcile::span::historic_frame;
use crate::scrape::altitude::fetch_altitude;
use crate::scrape::historic::fetch_archive;
use crate::scrape::realtime::fetch_month;
use crate::scrape::source::{HttpSource, PageSource};
use crate::stations::registry::StationRegistry;
use crate::types::observation::{MonthReport, ObservationTable, Provenance, DATE_FORMAT};
use crate::types::period::Month;
use crate::types::station::StationRecord;
use crate::types::station_class::StationClass;
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use bon::bon;
use chrono::NaiveDate;
use futures_util::{stream, StreamExt};
use log::{info, warn};
use polars::prelude::*;
use std::path::{Path, PathBuf};

const DEFAULT_CONCURRENCY: usize = 4;

/// The result of a range download.
#[derive(Debug, Clone)]
pub struct StationFrame {
    /// The composite table, columns named after the station class.
    pub frame: DataFrame,
    /// The station as queried, altitude included.
    pub station: StationRecord,
    pub class: StationClass,
    /// One entry per month requested, in chronological order.
    pub months: Vec<MonthReport>,
}

impl StationFrame {
    /// Months whose rows are absent-filled because their table could not be retrieved.
    pub fn fallback_months(&self) -> impl Iterator<Item = &MonthReport> {
        self.months.iter().filter(|m| m.provenance.is_fallback())
    }
}

/// Client for SENAMHI station data.
///
/// Create one with [`Senamhi::new()`] (default cache directory), [`Senamhi::with_cache_folder()`],
/// or [`Senamhi::with_registry()`] when the station metadata is already at hand.
///
/// # Examples
///
/// ```rust,no_run
/// # use senamhi::{Senamhi, SenamhiError};
/// # use chrono::NaiveDate;
/// # #[tokio::main]
/// # async fn main() -> Result<(), SenamhiError> {
/// let client = Senamhi::new().await?;
/// let result = client
///     .range()
///     .station("100090")
///     .start(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap())
///     .end(NaiveDate::from_ymd_opt(2019, 3, 31).unwrap())
///     .call()
///     .await?;
/// println!("{}", result.frame);
/// # Ok(())
/// # }
/// ```
pub struct Senamhi<S: PageSource = HttpSource> {
    registry: StationRegistry,
    source: S,
}

impl Senamhi<HttpSource> {
    /// Creates a client using `cache_folder` for the station metadata cache.
    /// The directory is created if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`SenamhiError::CacheDirCreation`] if the directory cannot be created, and
    /// [`SenamhiError::Station`] if the metadata list cannot be loaded or downloaded.
    pub async fn with_cache_folder(cache_folder: PathBuf) -> Result<Self, SenamhiError> {
        ensure_cache_dir_exists(&cache_folder)
            .await
            .map_err(|e| SenamhiError::CacheDirCreation(cache_folder.clone(), e))?;
        let registry = StationRegistry::new(&cache_folder).await?;
        Ok(Self::with_registry(registry))
    }

    /// Creates a client using the default cache directory
    /// (e.g. `~/.cache/senamhi_rs_cache` on Linux).
    ///
    /// # Errors
    ///
    /// Returns [`SenamhiError::CacheDirResolution`] if no cache directory exists for this
    /// platform, plus the errors of [`Senamhi::with_cache_folder()`].
    pub async fn new() -> Result<Self, SenamhiError> {
        let cache_folder = get_cache_dir().map_err(SenamhiError::CacheDirResolution)?;
        Self::with_cache_folder(cache_folder).await
    }

    pub fn with_registry(registry: StationRegistry) -> Self {
        Self::with_source(registry, HttpSource::new())
    }
}

#[bon]
impl<S: PageSource> Senamhi<S> {
    /// Creates a client that reads pages through `source` instead of the live site.
    pub fn with_source(registry: StationRegistry, source: S) -> Self {
        Self { registry, source }
    }

    pub fn registry(&self) -> &StationRegistry {
        &self.registry
    }

    /// Looks up a station by code and logs its metadata.
    ///
    /// # Errors
    ///
    /// [`SenamhiError::Station`] when the code is missing or listed more than once.
    pub fn station(&self, code: &str) -> Result<&StationRecord, SenamhiError> {
        let station = self.registry.get(code)?;
        info!("Station {}", station);
        Ok(station)
    }

    /// Fetches the altitude of a station, in meters above sea level.
    pub async fn altitude(&self, code: &str) -> Result<f64, SenamhiError> {
        let station = self.registry.get(code)?;
        fetch_altitude(&self.source, station)
            .await
            .map_err(|source| SenamhiError::Altitude {
                station: code.to_string(),
                source,
            })
    }

    /// Downloads a station's tables for every month starting within `start..=end`.
    ///
    /// Each month is fetched, normalized to the station class's columns, and (unless
    /// `complete` is `false`) reindexed onto the full calendar of that month, hourly for
    /// hourly classes and daily otherwise. A month whose page cannot be fetched or
    /// parsed is logged and replaced by a month of absent values; the
    /// [`StationFrame::months`] report tells the two apart.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.station(&str)`: **Required.** The station code.
    /// * `.start(NaiveDate)` / `.end(NaiveDate)`: **Required.** The inclusive date range.
    ///   Only months whose first day falls within the range are requested.
    /// * `.specific(bool)`: Optional. Only return the single day `start`. Defaults to `false`.
    /// * `.complete(bool)`: Optional. Reindex each month onto its full calendar. Defaults to `true`.
    /// * `.concurrency(usize)`: Optional. Months fetched at once. Defaults to `4`.
    /// * `.output(&Path)`: Optional. Also write the frame to this CSV file.
    ///
    /// # Errors
    ///
    /// - [`SenamhiError::InvalidRange`] if `start` is after `end`, unless `specific` is set.
    /// - [`SenamhiError::Station`] if the code is missing or duplicated. No request is made.
    /// - [`SenamhiError::Classification`] if the station's flags match no station class.
    /// - [`SenamhiError::Altitude`] if the station's altitude cannot be resolved.
    /// - [`SenamhiError::Frame`], [`SenamhiError::OutputWrite`] or [`SenamhiError::OutputCsv`]
    ///   when building or writing the output fails.
    #[builder]
    #[allow(clippy::too_many_arguments)]
    pub async fn range(
        &self,
        station: &str,
        start: NaiveDate,
        end: NaiveDate,
        specific: Option<bool>,
        complete: Option<bool>,
        concurrency: Option<usize>,
        output: Option<&Path>,
    ) -> Result<StationFrame, SenamhiError> {
        let specific = specific.unwrap_or(false);
        let complete = complete.unwrap_or(true);
        let concurrency = concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1);
        if !specific && start > end {
            return Err(SenamhiError::InvalidRange { start, end });
        }

        let mut record = self.registry.get(station)?.clone();
        let class = StationClass::classify(&record)?;
        if record.altitude.is_none() {
            let altitude = fetch_altitude(&self.source, &record).await.map_err(|source| {
                SenamhiError::Altitude {
                    station: station.to_string(),
                    source,
                }
            })?;
            record.altitude = Some(altitude);
        }
        info!("Station {} classified as {}", record, class);

        let months = if specific {
            vec![Month::of(start)]
        } else {
            Month::starting_between(start, end)
        };
        if months.is_empty() {
            warn!(
                "No month starts between {} and {}, nothing to download",
                start, end
            );
        }

        let record_ref = &record;
        let outcomes: Vec<(Month, ObservationTable, Provenance)> = stream::iter(months)
            .map(|month| async move {
                info!("Processing {}", month);
                match fetch_month(&self.source, record_ref, class, month).await {
                    Ok(table) => {
                        let table = if complete {
                            reconcile_month(table, month)
                        } else {
                            table
                        };
                        (month, table, Provenance::Observed)
                    }
                    Err(e) => {
                        warn!(
                            "No data for station {} in {}, filling with absent values: {}",
                            record_ref.code, month, e
                        );
                        (
                            month,
                            ObservationTable::absent(class, month),
                            Provenance::Fallback(e.to_string()),
                        )
                    }
                }
            })
            .buffered(concurrency)
            .collect()
            .await;

        let mut composite = ObservationTable::new(class);
        let mut reports = Vec::with_capacity(outcomes.len());
        for (month, table, provenance) in outcomes {
            reports.push(MonthReport {
                month,
                rows: table.len(),
                provenance,
            });
            composite.append(table);
        }

        let mut frame = composite.to_frame()?;
        if specific {
            let day = start.format(DATE_FORMAT).to_string();
            frame = frame.lazy().filter(col("DATE").eq(lit(day))).collect()?;
        }

        if let Some(path) = output {
            write_csv(frame.clone(), path).await?;
        }

        Ok(StationFrame {
            frame,
            station: record,
            class,
            months: reports,
        })
    }

    /// Downloads a station's full historic archive as a daily
    /// `[DATE, PRECIP, MAX_TEMP, MIN_TEMP]` frame.
    ///
    /// The archive is keyed by station code only, so the station does not need to be in
    /// the metadata list. Unlike [`range`](Self::range), a failed download is an error.
    ///
    /// # Arguments
    ///
    /// * `.station(&str)`: **Required.** The station code.
    /// * `.output(&Path)`: Optional. Also write the frame to this CSV file.
    #[builder]
    pub async fn historic(
        &self,
        station: &str,
        output: Option<&Path>,
    ) -> Result<DataFrame, SenamhiError> {
        if let Some(record) = self.registry.lookup(station)? {
            info!("Station {}", record);
        }
        let chart = fetch_archive(&self.source, station).await?;
        let frame = historic_frame(&chart)?;
        info!(
            "Historic archive of {} has {} daily rows",
            station,
            frame.height()
        );

        if let Some(path) = output {
            write_csv(frame.clone(), path).await?;
        }
        Ok(frame)
    }
}

async fn write_csv(mut frame: DataFrame, path: &Path) -> Result<(), SenamhiError> {
    let path_buf = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut file = std::fs::File::create(&path_buf)
            .map_err(|e| SenamhiError::OutputWrite(path_buf.clone(), e))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut frame)
            .map_err(|e| SenamhiError::OutputCsv(path_buf.clone(), e))?;
        info!("Wrote {} rows to {}", frame.height(), path_buf.display());
        Ok::<(), SenamhiError>(())
    })
    .await??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::error::FetchError;
    use crate::stations::error::StationError;
    use crate::types::station::{NetworkKind, OperatingMode};
    use crate::types::station_class::ClassificationError;
    use reqwest::Url;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    const ALTITUDE_PAGE: &str =
        "<html><table><tr><td>Altitud : 2442 msnm.</td></tr></table></html>";

    /// Serves canned pages by endpoint; month pages are keyed by their `YYYYMM` token.
    /// Months without a page fail like a page without a data table.
    #[derive(Default)]
    struct FakeSource {
        altitude: Option<String>,
        months: HashMap<String, String>,
        archive: Option<String>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn with_altitude() -> Self {
            Self {
                altitude: Some(ALTITUDE_PAGE.to_string()),
                ..Self::default()
            }
        }

        fn month(mut self, token: &str, page: String) -> Self {
            self.months.insert(token.to_string(), page);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PageSource for FakeSource {
        async fn fetch_page(&self, url: &Url) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let missing = FetchError::MissingTable { index: 1, found: 0 };
            let path = url.path();
            if path.ends_with("map_red_graf.php") {
                self.altitude.clone().ok_or(FetchError::AltitudeNotFound {
                    station: "fake".to_string(),
                })
            } else if path.ends_with("_dato_esta_tipo02.php") {
                let token = url
                    .query_pairs()
                    .find(|(k, _)| k == "CBOFiltro")
                    .map(|(_, v)| v.into_owned())
                    .unwrap_or_default();
                self.months.get(&token).cloned().ok_or(missing)
            } else {
                self.archive.clone().ok_or(missing)
            }
        }
    }

    fn month_page(header_rows: usize, rows: &[&[&str]]) -> String {
        let mut html = String::from("<html><table><tr><td>Estación</td></tr></table><table>");
        for _ in 0..header_rows {
            html.push_str("<tr><td>header</td></tr>");
        }
        for row in rows {
            html.push_str("<tr>");
            for cell in *row {
                html.push_str(&format!("<td>{cell}</td>"));
            }
            html.push_str("</tr>");
        }
        html.push_str("</table></html>");
        html
    }

    fn manual() -> StationRecord {
        StationRecord::new("100090", NetworkKind::Meteorological, OperatingMode::RealTime, "CO")
            .with_legacy_code("000256")
    }

    fn automatic() -> StationRecord {
        StationRecord::new("472A1A3E", NetworkKind::Meteorological, OperatingMode::Automatic, "EMA")
    }

    fn client(source: FakeSource) -> Senamhi<FakeSource> {
        let registry = StationRegistry::from_records(vec![
            manual(),
            automatic(),
            StationRecord::new("230715", NetworkKind::Hydrological, OperatingMode::Deferred, "HLM"),
            StationRecord::new("230715", NetworkKind::Hydrological, OperatingMode::RealTime, "HLM"),
            StationRecord::new("4727A0AE", NetworkKind::Hydrological, OperatingMode::Automatic, "EHA"),
        ]);
        Senamhi::with_source(registry, source)
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_failed_months_fall_back_to_absent_values() {
        let senamhi = client(FakeSource::with_altitude());
        let result = senamhi
            .range()
            .station("100090")
            .start(ymd(2019, 1, 1))
            .end(ymd(2019, 2, 20))
            .call()
            .await
            .unwrap();

        assert_eq!(result.frame.height(), 31 + 28);
        for name in ["MAX_TEMP", "MIN_TEMP", "HUMIDITY", "PRECIP_DAILY"] {
            assert_eq!(result.frame.column(name).unwrap().null_count(), 59);
        }
        assert_eq!(result.frame.column("DATE").unwrap().null_count(), 0);
        assert_eq!(result.fallback_months().count(), 2);
        assert_eq!(result.station.altitude, Some(2442.0));
        // One altitude lookup, then one request per month.
        assert_eq!(senamhi.source.calls(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_station_makes_no_requests() {
        let senamhi = client(FakeSource::with_altitude());
        let err = senamhi
            .range()
            .station("230715")
            .start(ymd(2019, 1, 1))
            .end(ymd(2019, 2, 1))
            .call()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SenamhiError::Station(StationError::Duplicate { count: 2, .. })
        ));
        assert_eq!(senamhi.source.calls(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_class_makes_no_requests() {
        let senamhi = client(FakeSource::with_altitude());
        let err = senamhi
            .range()
            .station("4727A0AE")
            .start(ymd(2019, 1, 1))
            .end(ymd(2019, 1, 1))
            .call()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SenamhiError::Classification(ClassificationError::UnsupportedCombination { .. })
        ));
        assert_eq!(senamhi.source.calls(), 0);
    }

    #[tokio::test]
    async fn test_months_are_reconciled_in_order() {
        let source = FakeSource::with_altitude()
            .month(
                "201903",
                month_page(2, &[&["2019-03-02", "22.0", "11.0", "80", "0.0"]]),
            )
            .month(
                "201904",
                month_page(2, &[&["2019-04-30", "20.5", "10.5", "S/D", "1.1"]]),
            );
        let senamhi = client(source);
        let result = senamhi
            .range()
            .station("100090")
            .start(ymd(2019, 3, 1))
            .end(ymd(2019, 5, 1))
            .concurrency(3)
            .call()
            .await
            .unwrap();

        let frame = &result.frame;
        assert_eq!(frame.height(), 31 + 30 + 31);
        let dates = frame.column("DATE").unwrap().str().unwrap();
        assert_eq!(dates.get(0), Some("2019-03-01"));
        assert_eq!(dates.get(61), Some("2019-05-01"));
        assert_eq!(dates.get(91), Some("2019-05-31"));

        let max_temp = frame.column("MAX_TEMP").unwrap().str().unwrap();
        assert_eq!(max_temp.get(1), Some("22.0"));
        assert_eq!(max_temp.get(60), Some("20.5"));
        let humidity = frame.column("HUMIDITY").unwrap().str().unwrap();
        assert_eq!(humidity.get(60), None);

        let provenance: Vec<bool> = result
            .months
            .iter()
            .map(|m| m.provenance.is_fallback())
            .collect();
        assert_eq!(provenance, vec![false, false, true]);
        assert_eq!(result.months[0].rows, 31);
    }

    #[tokio::test]
    async fn test_automatic_station_is_hourly() {
        let source = FakeSource::with_altitude().month(
            "202002",
            month_page(
                1,
                &[
                    &["2020/02/01", "00:00", "12.1", "0", "90", "180", "1.2"],
                    &["2020/02/01", "01:00", "11.8", "0", "91", "175", "0.9"],
                ],
            ),
        );
        let senamhi = client(source);
        let result = senamhi
            .range()
            .station("472A1A3E")
            .start(ymd(2020, 2, 1))
            .end(ymd(2020, 2, 29))
            .call()
            .await
            .unwrap();

        let frame = &result.frame;
        assert_eq!(frame.height(), 29 * 24);
        let hours = frame.column("HOUR").unwrap().str().unwrap();
        assert_eq!(hours.get(0), Some("00:00"));
        assert_eq!(hours.get(23), Some("23:00"));
        let temp = frame.column("TEMP").unwrap().str().unwrap();
        assert_eq!(temp.get(1), Some("11.8"));
        assert_eq!(temp.get(2), None);
    }

    #[tokio::test]
    async fn test_specific_day_and_csv_output() {
        let source = FakeSource::with_altitude().month(
            "201901",
            month_page(
                2,
                &[
                    &["2019-01-14", "21.0", "10.0", "70", "0.0"],
                    &["2019-01-15", "23.5", "12.0", "75", "4.2"],
                ],
            ),
        );
        let senamhi = client(source);
        let dir = tempdir().unwrap();
        let path = dir.path().join("day.csv");

        let result = senamhi
            .range()
            .station("100090")
            .start(ymd(2019, 1, 15))
            .end(ymd(2019, 1, 15))
            .specific(true)
            .output(&path)
            .call()
            .await
            .unwrap();

        assert_eq!(result.frame.height(), 1);
        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "DATE,MAX_TEMP,MIN_TEMP,HUMIDITY,PRECIP_DAILY");
        assert_eq!(lines[1], "2019-01-15,23.5,12.0,75,4.2");
        assert_eq!(lines.len(), 2);
    }

    #[tokio::test]
    async fn test_incomplete_keeps_published_rows() {
        let source = FakeSource::with_altitude().month(
            "201901",
            month_page(2, &[&["2019-01-14", "21.0", "10.0", "70", "0.0"]]),
        );
        let senamhi = client(source);
        let result = senamhi
            .range()
            .station("100090")
            .start(ymd(2019, 1, 1))
            .end(ymd(2019, 1, 31))
            .complete(false)
            .call()
            .await
            .unwrap();
        assert_eq!(result.frame.height(), 1);
    }

    #[tokio::test]
    async fn test_altitude_failure_is_fatal() {
        let senamhi = client(FakeSource::default());
        let err = senamhi
            .range()
            .station("100090")
            .start(ymd(2019, 1, 1))
            .end(ymd(2019, 1, 31))
            .call()
            .await
            .unwrap_err();
        assert!(matches!(err, SenamhiError::Altitude { ref station, .. } if station == "100090"));
        assert_eq!(senamhi.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_range() {
        let senamhi = client(FakeSource::with_altitude());
        let err = senamhi
            .range()
            .station("100090")
            .start(ymd(2019, 2, 1))
            .end(ymd(2019, 1, 1))
            .call()
            .await
            .unwrap_err();
        assert!(matches!(err, SenamhiError::InvalidRange { .. }));
    }

    #[tokio::test]
    async fn test_specific_day_ignores_end() {
        let source = FakeSource::with_altitude().month(
            "201903",
            month_page(2, &[&["2019-03-10", "19.0", "9.0", "65", "0.3"]]),
        );
        let senamhi = client(source);
        let result = senamhi
            .range()
            .station("100090")
            .start(ymd(2019, 3, 10))
            .end(ymd(2019, 1, 1))
            .specific(true)
            .call()
            .await
            .unwrap();

        assert_eq!(result.frame.height(), 1);
        let max_temp = result.frame.column("MAX_TEMP").unwrap().str().unwrap();
        assert_eq!(max_temp.get(0), Some("19.0"));
    }

    #[tokio::test]
    async fn test_station_and_altitude() {
        let senamhi = client(FakeSource::with_altitude());
        assert_eq!(senamhi.station("100090").unwrap().category, "CO");
        assert!(matches!(
            senamhi.station("000000"),
            Err(SenamhiError::Station(StationError::NotFound(_)))
        ));
        assert_eq!(senamhi.altitude("472A1A3E").await.unwrap(), 2442.0);
    }

    #[tokio::test]
    async fn test_historic_archive() {
        let source = FakeSource {
            archive: Some(
                "<html><script>chart({ xAxis: { categories: ['2010','2010','2011'] }, \
                 series: [{ data: [1.0,null,0.5] }, { data: [20,21,22] }, { data: [9,10,null] }] });\
                 </script></html>"
                    .to_string(),
            ),
            ..FakeSource::default()
        };
        let senamhi = client(source);
        let dir = tempdir().unwrap();
        let path = dir.path().join("historic.csv");

        let frame = senamhi
            .historic()
            .station("157317")
            .output(&path)
            .call()
            .await
            .unwrap();

        assert_eq!(frame.height(), 3);
        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "DATE,PRECIP,MAX_TEMP,MIN_TEMP");
        assert_eq!(lines[2], "2010-12-31,,21.0,10.0");
        assert_eq!(lines[3], "2011-01-01,0.5,22.0,");
    }

    #[tokio::test]
    #[ignore = "queries the live SENAMHI site"]
    async fn test_live_range() {
        let registry = StationRegistry::from_records(vec![manual()]);
        let senamhi = Senamhi::with_registry(registry);
        let result = senamhi
            .range()
            .station("100090")
            .start(ymd(2019, 1, 1))
            .end(ymd(2019, 1, 31))
            .call()
            .await
            .unwrap();
        assert_eq!(result.frame.height(), 31);
    }
}
