mod error;
mod reconcile;
mod scrape;
mod senamhi;
mod stations;
mod types;
mod utils;

pub use error::SenamhiError;
pub use senamhi::*;

pub use stations::error::StationError;
pub use stations::registry::StationRegistry;

pub use types::observation::{MonthReport, Observation, ObservationTable, Provenance};
pub use types::period::Month;
pub use types::station::{NetworkKind, OperatingMode, StationRecord};
pub use types::station_class::{ClassificationError, RawLayout, Resolution, StationClass};

pub use scrape::error::FetchError;
pub use scrape::historic::HistoricChart;
pub use scrape::source::{HttpSource, PageSource};

pub use reconcile::error::ReconcileError;
pub use reconcile::month::{calendar_grid, reconcile_month};
pub use reconcile::span::{historic_frame, span_dates, HISTORIC_COLUMNS};
