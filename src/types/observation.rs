//! In-memory station tables: rows keyed by their calendar instant, with untyped cells
//! in the station class's column order.

use crate::types::period::Month;
use crate::types::station_class::{Resolution, StationClass};
use chrono::NaiveDateTime;
use polars::prelude::*;
use std::fmt;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const HOUR_FORMAT: &str = "%H:%M";

/// One row of a station table.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// The calendar instant of the row. Daily rows sit at midnight.
    pub timestamp: NaiveDateTime,
    /// Non-key cells, in [`StationClass::value_columns`] order. `None` is an absent value.
    pub values: Vec<Option<String>>,
}

impl Observation {
    pub fn absent(timestamp: NaiveDateTime, width: usize) -> Self {
        Self {
            timestamp,
            values: vec![None; width],
        }
    }
}

/// Rows of one station class, renamed to the class schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationTable {
    class: StationClass,
    rows: Vec<Observation>,
}

impl ObservationTable {
    pub fn new(class: StationClass) -> Self {
        Self {
            class,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(class: StationClass, rows: Vec<Observation>) -> Self {
        Self { class, rows }
    }

    /// A table covering every instant of `month` at the class resolution, all values absent.
    pub fn absent(class: StationClass, month: Month) -> Self {
        let width = class.value_columns().len();
        let rows = month
            .instants(class.resolution())
            .into_iter()
            .map(|timestamp| Observation::absent(timestamp, width))
            .collect();
        Self { class, rows }
    }

    pub fn class(&self) -> StationClass {
        self.class
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Observation> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends the rows of `other`, keeping their order.
    pub fn append(&mut self, other: ObservationTable) {
        self.rows.extend(other.rows);
    }

    /// Converts the table into a polars `DataFrame` with the class's column names.
    /// `DATE` is rendered `YYYY-MM-DD` and `HOUR` as `HH:MM`; absent cells become nulls.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let columns = self.class.columns();
        let mut frame_columns = Vec::with_capacity(columns.len());

        let dates: Vec<String> = self
            .rows
            .iter()
            .map(|row| row.timestamp.format(DATE_FORMAT).to_string())
            .collect();
        frame_columns.push(Column::new(columns[0].into(), dates));

        if self.class.resolution() == Resolution::Hourly {
            let hours: Vec<String> = self
                .rows
                .iter()
                .map(|row| row.timestamp.format(HOUR_FORMAT).to_string())
                .collect();
            frame_columns.push(Column::new(columns[1].into(), hours));
        }

        for (idx, name) in self.class.value_columns().iter().enumerate() {
            let cells: Vec<Option<String>> = self
                .rows
                .iter()
                .map(|row| row.values.get(idx).cloned().flatten())
                .collect();
            frame_columns.push(Column::new((*name).into(), cells));
        }

        DataFrame::new(frame_columns)
    }
}

/// Where the rows of a month came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// Parsed from the published table.
    Observed,
    /// The month could not be fetched or parsed; every value is absent.
    Fallback(String),
}

impl Provenance {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Provenance::Fallback(_))
    }
}

/// Per-month outcome of a range download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthReport {
    pub month: Month,
    pub rows: usize,
    pub provenance: Provenance,
}

impl fmt::Display for MonthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.provenance {
            Provenance::Observed => write!(f, "{}: {} rows observed", self.month, self.rows),
            Provenance::Fallback(reason) => {
                write!(f, "{}: {} rows absent-filled ({})", self.month, self.rows, reason)
            }
        }
    }
}
