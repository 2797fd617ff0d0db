use crate::reconcile::error::ReconcileError;
use crate::types::observation::{Observation, ObservationTable};
use crate::types::period::Month;
use crate::types::station_class::StationClass;
use chrono::{Datelike, NaiveDateTime};
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// Calendar instants of `month` for the class named by `identifier`
/// (e.g. `meteo_automatic`).
///
/// String-keyed counterpart of [`Month::instants`] for callers holding a class
/// identifier rather than a [`StationClass`], such as a name read from a file.
pub fn calendar_grid(identifier: &str, month: Month) -> Result<Vec<NaiveDateTime>, ReconcileError> {
    let class = identifier
        .parse::<StationClass>()
        .map_err(|_| ReconcileError::UnrecognizedStationClass(identifier.to_string()))?;
    Ok(month.instants(class.resolution()))
}

/// The month most rows of `table` fall in. Ties go to the earlier month.
pub fn dominant_month(table: &ObservationTable) -> Option<Month> {
    let mut counts: BTreeMap<Month, usize> = BTreeMap::new();
    for row in table.rows() {
        *counts.entry(Month::of(row.timestamp.date())).or_default() += 1;
    }

    let mut best: Option<(Month, usize)> = None;
    for (month, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((month, count));
        }
    }
    best.map(|(month, _)| month)
}

/// Reindexes one month of rows onto the complete calendar grid of that month.
///
/// The month is taken from the rows themselves (the most frequent month), so a table
/// that spills over a month boundary is still reconciled against the right calendar;
/// `requested` is only used when the table is empty. Rows outside the month are
/// dropped, and when two rows share an instant the first one wins. Every grid instant
/// without a row gets absent values.
pub fn reconcile_month(table: ObservationTable, requested: Month) -> ObservationTable {
    let class = table.class();
    let month = dominant_month(&table).unwrap_or(requested);
    if month != requested {
        debug!(
            "Table requested for {} is dominated by rows of {}",
            requested, month
        );
    }

    let width = class.value_columns().len();
    let source_rows = table.len();
    let mut by_instant: HashMap<NaiveDateTime, Vec<Option<String>>> =
        HashMap::with_capacity(source_rows);
    for row in table.into_rows() {
        if row.timestamp.year() != month.year() || row.timestamp.month() != month.month() {
            debug!("Dropping row at {} outside {}", row.timestamp, month);
            continue;
        }
        if by_instant.contains_key(&row.timestamp) {
            debug!("Dropping duplicate row at {}", row.timestamp);
            continue;
        }
        by_instant.insert(row.timestamp, row.values);
    }

    let rows: Vec<Observation> = month
        .instants(class.resolution())
        .into_iter()
        .map(|timestamp| match by_instant.remove(&timestamp) {
            Some(values) => Observation { timestamp, values },
            None => Observation::absent(timestamp, width),
        })
        .collect();

    debug!(
        "Reconciled {} {} rows onto {} {} instants of {}",
        source_rows,
        class,
        rows.len(),
        class.resolution(),
        month
    );
    ObservationTable::with_rows(class, rows)
}
