//! Monthly tables of the near-real-time network.
//!
//! The data query returns an HTML page whose second `<table>` holds the month's rows.
//! Cells are kept as text; the site's `S/D` marker and blank cells become absent values.

use crate::scrape::error::FetchError;
use crate::scrape::source::{build_url, PageSource};
use crate::types::observation::{Observation, ObservationTable};
use crate::types::period::Month;
use crate::types::station::StationRecord;
use crate::types::station_class::{Resolution, StationClass};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, info};
use reqwest::Url;
use scraper::{Html, Selector};

const DATA_URL: &str = "https://www.senamhi.gob.pe/mapas/mapa-estaciones-2/_dato_esta_tipo02.php";
const DATA_TABLE_INDEX: usize = 1;
const NO_DATA: &str = "S/D";
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];
const HOUR_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

/// Cell text of one HTML table, row by row.
pub type RawTable = Vec<Vec<String>>;

/// The data query URL for one station and month. `station.altitude` must already be resolved.
pub fn month_url(station: &StationRecord, month: Month) -> Result<Url, FetchError> {
    let altitude = station
        .altitude
        .map(|alt| alt.to_string())
        .unwrap_or_default();
    let period = month.token();
    build_url(
        DATA_URL,
        &[
            ("estaciones", station.code.as_str()),
            ("CBOFiltro", period.as_str()),
            ("t_e", station.network_kind.flag()),
            ("estado", station.operating_mode.flag()),
            ("cod_old", station.legacy_code.as_deref().unwrap_or("")),
            ("cate_esta", station.category.as_str()),
            ("alt", altitude.as_str()),
        ],
    )
}

/// Fetches and parses one month of a station's table. Rows are returned as published,
/// without gap filling.
pub async fn fetch_month<S: PageSource>(
    source: &S,
    station: &StationRecord,
    class: StationClass,
    month: Month,
) -> Result<ObservationTable, FetchError> {
    let url = month_url(station, month)?;
    info!("Querying {} ({}) for {}: {}", station.code, class, month, url);
    let html = source.fetch_page(&url).await?;
    let table = select_data_table(parse_tables(&html))?;
    normalize(&table, class)
}

/// Extracts every `<table>` of the page as rows of trimmed `<td>` texts.
pub fn parse_tables(html: &str) -> Vec<RawTable> {
    let document = Html::parse_document(html);
    let (Ok(table_sel), Ok(tr_sel), Ok(td_sel)) = (
        Selector::parse("table"),
        Selector::parse("tr"),
        Selector::parse("td"),
    ) else {
        return Vec::new();
    };

    document
        .select(&table_sel)
        .map(|table| {
            table
                .select(&tr_sel)
                .map(|tr| {
                    tr.select(&td_sel)
                        .map(|td| td.text().collect::<String>().trim().to_string())
                        .collect()
                })
                .collect()
        })
        .collect()
}

pub fn select_data_table(mut tables: Vec<RawTable>) -> Result<RawTable, FetchError> {
    if tables.len() <= DATA_TABLE_INDEX {
        return Err(FetchError::MissingTable {
            index: DATA_TABLE_INDEX,
            found: tables.len(),
        });
    }
    Ok(tables.swap_remove(DATA_TABLE_INDEX))
}

/// Skips the class's header rows, checks the cell count against its layout, and
/// converts each row into an [`Observation`] keyed by date (and hour).
pub fn normalize(table: &RawTable, class: StationClass) -> Result<ObservationTable, FetchError> {
    let layout = class.raw_layout();
    let key_width = class.key_width();
    let mut rows = Vec::with_capacity(table.len().saturating_sub(layout.header_rows));

    for (idx, cells) in table.iter().enumerate().skip(layout.header_rows) {
        if cells.iter().all(|cell| cell.is_empty()) {
            debug!("Skipping empty row {} of {} table", idx, class);
            continue;
        }
        if cells.len() != layout.columns.len() {
            return Err(FetchError::SchemaMismatch {
                class,
                row: idx,
                expected: layout.columns.len(),
                found: cells.len(),
            });
        }

        let date = parse_date(&cells[0])?;
        let time = match class.resolution() {
            Resolution::Daily => NaiveTime::MIN,
            Resolution::Hourly => parse_hour(&cells[1])?,
        };
        rows.push(Observation {
            timestamp: NaiveDateTime::new(date, time),
            values: cells[key_width..].iter().map(|cell| clean_cell(cell)).collect(),
        });
    }

    Ok(ObservationTable::with_rows(class, rows))
}

fn clean_cell(cell: &str) -> Option<String> {
    let cell = cell.trim();
    (!cell.is_empty() && cell != NO_DATA).then(|| cell.to_string())
}

pub(crate) fn parse_date(text: &str) -> Result<NaiveDate, FetchError> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .ok_or_else(|| FetchError::UnparsableDate(text.to_string()))
}

fn parse_hour(text: &str) -> Result<NaiveTime, FetchError> {
    let text = text.trim();
    HOUR_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
        .ok_or_else(|| FetchError::UnparsableHour(text.to_string()))
}
