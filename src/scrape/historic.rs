//! Historic archive pages.
//!
//! The archive page renders a station's full record as a chart, so the data only
//! exists as array literals inside the page's chart script:
//!
//! ```text
//! xAxis: { categories: ['2010','2010', ... ,'2019'] },
//! series: [{ name: 'Precipitación', data: [0.0,null,1.2, ...] },
//!          { name: 'T. Máxima', data: [...] },
//!          { name: 'T. Mínima', data: [...] }]
//! ```
//!
//! The categories hold the year of each daily entry; the three `data` arrays are
//! precipitation, maximum and minimum temperature, in that order.

use crate::scrape::error::FetchError;
use crate::scrape::source::{build_url, PageSource};
use log::{info, warn};
use reqwest::Url;
use scraper::{Html, Selector};

const ARCHIVE_URL: &str = "https://web2.senamhi.gob.pe/descarga/";
const CATEGORIES: &str = "categories";
const DATA: &str = "data";
const NO_DATA: &str = "null";
const SERIES_NAMES: [&str; 3] = ["precipitation", "max_temp", "min_temp"];

/// The arrays of an archive chart, all of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricChart {
    /// Year of each entry.
    pub categories: Vec<i32>,
    pub precipitation: Vec<Option<f64>>,
    pub max_temp: Vec<Option<f64>>,
    pub min_temp: Vec<Option<f64>>,
}

impl HistoricChart {
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

pub fn archive_url(code: &str) -> Result<Url, FetchError> {
    build_url(ARCHIVE_URL, &[("cod", code)])
}

pub async fn fetch_archive<S: PageSource>(source: &S, code: &str) -> Result<HistoricChart, FetchError> {
    let url = archive_url(code)?;
    info!("Downloading historic archive of station {} from {}", code, url);
    let html = source.fetch_page(&url).await?;
    let script = chart_script(&html)?;
    parse_chart(&script)
}

/// Returns the text of the first `<script>` that declares chart categories.
pub fn chart_script(html: &str) -> Result<String, FetchError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script").map_err(|_| FetchError::ChartScriptMissing)?;
    document
        .select(&selector)
        .map(|script| script.text().collect::<String>())
        .find(|text| text.contains(CATEGORIES))
        .ok_or(FetchError::ChartScriptMissing)
}

/// Parses the `categories` array and the first three `data` arrays of a chart script.
pub fn parse_chart(script: &str) -> Result<HistoricChart, FetchError> {
    let categories_body = *labelled_arrays(script, CATEGORIES)?
        .first()
        .ok_or(FetchError::ChartArrayMissing {
            name: CATEGORIES,
            expected: 1,
            found: 0,
        })?;
    let categories = split_items(categories_body)
        .map(|item| {
            item.parse::<i32>().map_err(|_| FetchError::ChartValue {
                name: CATEGORIES,
                value: item.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let data_bodies = labelled_arrays(script, DATA)?;
    if data_bodies.len() < SERIES_NAMES.len() {
        return Err(FetchError::ChartArrayMissing {
            name: DATA,
            expected: SERIES_NAMES.len(),
            found: data_bodies.len(),
        });
    }
    if data_bodies.len() > SERIES_NAMES.len() {
        warn!(
            "Chart declares {} data arrays, using the first {} as precipitation, max and min temperature",
            data_bodies.len(),
            SERIES_NAMES.len()
        );
    }

    let mut series = SERIES_NAMES
        .into_iter()
        .zip(data_bodies)
        .map(|(name, body)| {
            let values = parse_values(name, body)?;
            if values.len() != categories.len() {
                return Err(FetchError::ChartLengthMismatch {
                    name,
                    expected: categories.len(),
                    found: values.len(),
                });
            }
            Ok(values)
        })
        .collect::<Result<Vec<_>, _>>()?
        .into_iter();

    let (Some(precipitation), Some(max_temp), Some(min_temp)) =
        (series.next(), series.next(), series.next())
    else {
        return Err(FetchError::ChartArrayMissing {
            name: DATA,
            expected: SERIES_NAMES.len(),
            found: 0,
        });
    };

    Ok(HistoricChart {
        categories,
        precipitation,
        max_temp,
        min_temp,
    })
}

/// Bodies (text between the brackets) of every `label: [ ... ]` literal, in order.
/// The label may be quoted; it must not be the tail of a longer identifier.
fn labelled_arrays<'a>(script: &'a str, label: &'static str) -> Result<Vec<&'a str>, FetchError> {
    let mut arrays = Vec::new();
    let mut rest = script;

    while let Some(pos) = rest.find(label) {
        let standalone = rest[..pos]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'));
        let after = &rest[pos + label.len()..];
        rest = after;
        if !standalone {
            continue;
        }

        let Some(value) = after
            .trim_start_matches(|c: char| c == '"' || c == '\'')
            .trim_start()
            .strip_prefix(':')
        else {
            continue;
        };
        let Some(body) = value.trim_start().strip_prefix('[') else {
            continue;
        };
        let end = body
            .find(']')
            .ok_or(FetchError::ChartArrayUnterminated(label))?;
        arrays.push(&body[..end]);
        rest = &body[end + 1..];
    }

    Ok(arrays)
}

fn split_items(body: &str) -> impl Iterator<Item = &str> {
    body.split(',')
        .map(|item| item.trim().trim_matches(|c: char| c == '\'' || c == '"').trim())
        .filter(|item| !item.is_empty())
}

fn parse_values(name: &'static str, body: &str) -> Result<Vec<Option<f64>>, FetchError> {
    split_items(body)
        .map(|item| {
            if item == NO_DATA {
                return Ok(None);
            }
            item.parse::<f64>()
                .map(Some)
                .map_err(|_| FetchError::ChartValue {
                    name,
                    value: item.to_string(),
                })
        })
        .collect()
}
