//! Station elevation lookup. The data query needs the altitude as a parameter, and the
//! metadata list does not carry it, so it is read from the station's map popup page.

use crate::scrape::error::FetchError;
use crate::scrape::source::{build_url, PageSource};
use crate::types::station::StationRecord;
use log::info;
use reqwest::Url;
use scraper::{Html, Selector};

const STATION_PAGE_URL: &str = "https://www.senamhi.gob.pe/mapas/mapa-estaciones-2/map_red_graf.php";
const ALTITUDE_UNIT: &str = "msnm";

/// The metadata page URL. Automatic stations are addressed without the legacy code.
pub fn altitude_url(station: &StationRecord) -> Result<Url, FetchError> {
    let mut params = vec![
        ("cod", station.code.as_str()),
        ("estado", station.operating_mode.flag()),
        ("tipo_esta", station.network_kind.flag()),
        ("cate", station.category.as_str()),
    ];
    if !station.operating_mode.is_automatic() {
        params.push(("cod_old", station.legacy_code.as_deref().unwrap_or("")));
    }
    build_url(STATION_PAGE_URL, &params)
}

/// Fetches the metadata page of `station` and returns its altitude in meters.
pub async fn fetch_altitude<S: PageSource>(
    source: &S,
    station: &StationRecord,
) -> Result<f64, FetchError> {
    let url = altitude_url(station)?;
    info!("Resolving altitude of station {} from {}", station.code, url);
    let html = source.fetch_page(&url).await?;
    parse_altitude(&html, &station.code)
}

/// Returns the numeric prefix of the first `<td>` mentioning the elevation unit,
/// e.g. `2442` for `<td>2442 msnm.</td>`.
pub fn parse_altitude(html: &str, station: &str) -> Result<f64, FetchError> {
    let document = Html::parse_document(html);
    let td = Selector::parse("td").map_err(|_| FetchError::AltitudeNotFound {
        station: station.to_string(),
    })?;

    let cell = document
        .select(&td)
        .map(|element| element.text().collect::<String>())
        .find(|text| text.contains(ALTITUDE_UNIT))
        .ok_or_else(|| FetchError::AltitudeNotFound {
            station: station.to_string(),
        })?;

    let prefix = cell
        .split(ALTITUDE_UNIT)
        .next()
        .unwrap_or_default()
        .trim()
        .split_whitespace()
        .last()
        .unwrap_or_default();

    prefix
        .replace(',', "")
        .parse::<f64>()
        .map_err(|_| FetchError::UnparsableAltitude {
            station: station.to_string(),
            cell: cell.trim().to_string(),
        })
}
