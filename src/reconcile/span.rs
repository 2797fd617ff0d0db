//! Calendar reconstruction for the historic archive.
//!
//! The archive chart only labels each daily entry with its year. The first year of the
//! record is usually partial and ends on Dec 31; the last year is usually partial and
//! starts on Jan 1. Entries in between are one per day, without gaps.

use crate::reconcile::error::ReconcileError;
use crate::scrape::historic::HistoricChart;
use crate::types::observation::DATE_FORMAT;
use chrono::{NaiveDate, TimeDelta};
use log::debug;
use polars::prelude::*;

/// Output columns of an archive frame.
pub const HISTORIC_COLUMNS: [&str; 4] = ["DATE", "PRECIP", "MAX_TEMP", "MIN_TEMP"];

fn days_in_year(year: i32) -> Result<u32, ReconcileError> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(ReconcileError::InvalidYear(year))?;
    let next = NaiveDate::from_ymd_opt(year + 1, 1, 1).ok_or(ReconcileError::InvalidYear(year))?;
    Ok((next - first).num_days() as u32)
}

/// Rebuilds the calendar date of every archive entry from its year label.
///
/// The entries of the first year are anchored to the tail of that year and the
/// entries of the last year to its head, so 6 entries labelled `2010` followed by
/// entries labelled `2011` start on 2010-12-26. A record that covers a single year
/// starts on Jan 1.
///
/// # Errors
///
/// - [`ReconcileError::EmptySpan`] when there are no entries.
/// - [`ReconcileError::YearOverflow`] when a year has more entries than days.
/// - [`ReconcileError::SpanLengthMismatch`] when the entries do not fill a
///   contiguous daily sequence between the anchored ends.
pub fn span_dates(categories: &[i32]) -> Result<Vec<NaiveDate>, ReconcileError> {
    let (Some(&first_year), Some(&last_year)) = (categories.first(), categories.last()) else {
        return Err(ReconcileError::EmptySpan);
    };

    let first_entries = categories.iter().filter(|&&y| y == first_year).count();
    let last_entries = categories.iter().filter(|&&y| y == last_year).count();
    for (year, entries) in [(first_year, first_entries), (last_year, last_entries)] {
        let days = days_in_year(year)?;
        if entries > days as usize {
            return Err(ReconcileError::YearOverflow { year, entries, days });
        }
    }

    let start = if first_year == last_year {
        NaiveDate::from_ymd_opt(first_year, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first_year, 12, 31)
            .and_then(|dec31| dec31.checked_sub_signed(TimeDelta::days(first_entries as i64 - 1)))
    }
    .ok_or(ReconcileError::InvalidYear(first_year))?;
    let end = NaiveDate::from_ymd_opt(last_year, 1, 1)
        .and_then(|jan1| jan1.checked_add_signed(TimeDelta::days(last_entries as i64 - 1)))
        .ok_or(ReconcileError::InvalidYear(last_year))?;

    let expected = (end - start).num_days() + 1;
    if expected < 0 || expected as usize != categories.len() {
        return Err(ReconcileError::SpanLengthMismatch {
            first_year,
            last_year,
            expected: expected.max(0) as usize,
            found: categories.len(),
        });
    }

    debug!(
        "Archive of {} entries spans {} to {}",
        categories.len(),
        start,
        end
    );
    Ok(start.iter_days().take(categories.len()).collect())
}

/// Builds the daily `[DATE, PRECIP, MAX_TEMP, MIN_TEMP]` frame of an archive chart.
pub fn historic_frame(chart: &HistoricChart) -> Result<DataFrame, ReconcileError> {
    let dates: Vec<String> = span_dates(&chart.categories)?
        .into_iter()
        .map(|date| date.format(DATE_FORMAT).to_string())
        .collect();

    let frame = DataFrame::new(vec![
        Column::new(HISTORIC_COLUMNS[0].into(), dates),
        Column::new(HISTORIC_COLUMNS[1].into(), chart.precipitation.clone()),
        Column::new(HISTORIC_COLUMNS[2].into(), chart.max_temp.clone()),
        Column::new(HISTORIC_COLUMNS[3].into(), chart.min_temp.clone()),
    ])?;
    Ok(frame)
}
