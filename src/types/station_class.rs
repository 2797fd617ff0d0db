//! Station classes and their fixed column schemas.
//!
//! SENAMHI publishes five kinds of station tables. Which one a station uses is fully
//! determined by its network and operating mode, see [`StationClass::classify`].

use crate::types::station::{NetworkKind, OperatingMode, StationRecord};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("Unknown network kind '{0}' (expected 'M' or 'H')")]
    UnknownNetworkKind(String),

    #[error("Unknown operating mode '{0}' (expected 'DIFERIDO', 'REAL' or 'AUTOMATICA')")]
    UnknownOperatingMode(String),

    #[error("Unsupported station class: network '{network_kind}' with operating mode '{operating_mode}'")]
    UnsupportedCombination {
        network_kind: NetworkKind,
        operating_mode: OperatingMode,
    },

    #[error("Unknown station class identifier '{0}'")]
    UnknownIdentifier(String),
}

/// The time step of a station's observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// One row per calendar day.
    Daily,
    /// One row per hour, 00:00 to 23:00.
    Hourly,
}

impl Resolution {
    pub fn units_per_day(&self) -> u32 {
        match self {
            Resolution::Daily => 1,
            Resolution::Hourly => 24,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Daily => write!(f, "daily"),
            Resolution::Hourly => write!(f, "hourly"),
        }
    }
}

/// How a station class is laid out in the site's HTML data table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLayout {
    /// Site-language column names, in table order.
    pub columns: &'static [&'static str],
    /// Number of header rows preceding the data rows.
    pub header_rows: usize,
}

const RAW_METEO_MANUAL: RawLayout = RawLayout {
    columns: &["fecha", "temp_max", "temp_min", "hum_relativa", "pp"],
    header_rows: 2,
};
const RAW_METEO_AUTOMATIC: RawLayout = RawLayout {
    columns: &[
        "fecha",
        "hora",
        "temp",
        "pp",
        "humedad",
        "dir_viento",
        "vel_viento",
    ],
    header_rows: 1,
};
const RAW_HIDRO_REALTIME: RawLayout = RawLayout {
    columns: &["fecha", "nivel_06", "nivel_10", "nivel_14", "nivel_18"],
    header_rows: 2,
};
const RAW_HIDRO_HOURLY: RawLayout = RawLayout {
    columns: &["fecha", "hora", "nivel", "pp"],
    header_rows: 1,
};

/// One of the five fixed SENAMHI station classes.
///
/// # Examples
///
/// ```
/// use senamhi::{NetworkKind, OperatingMode, StationClass, StationRecord};
///
/// let station = StationRecord::new("100090", NetworkKind::Meteorological, OperatingMode::Automatic, "EMA");
/// let class = StationClass::classify(&station).unwrap();
/// assert_eq!(class.identifier(), "meteo_automatic");
/// assert_eq!(class.columns()[..2], ["DATE", "HOUR"]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationClass {
    MeteoManualRealtime,
    MeteoManualDeferred,
    MeteoAutomatic,
    HidroManualRealtime,
    HidroManualDeferred,
}

impl StationClass {
    pub const ALL: [StationClass; 5] = [
        StationClass::MeteoManualRealtime,
        StationClass::MeteoManualDeferred,
        StationClass::MeteoAutomatic,
        StationClass::HidroManualRealtime,
        StationClass::HidroManualDeferred,
    ];

    /// Resolves the class of a station from its network and operating mode flags.
    ///
    /// # Errors
    ///
    /// Returns [`ClassificationError::UnknownNetworkKind`] or
    /// [`ClassificationError::UnknownOperatingMode`] for unrecognized flags, and
    /// [`ClassificationError::UnsupportedCombination`] for hydrological automatic
    /// stations, which have no published table schema.
    pub fn classify(station: &StationRecord) -> Result<StationClass, ClassificationError> {
        let network = match &station.network_kind {
            NetworkKind::Meteorological => "meteo",
            NetworkKind::Hydrological => "hidro",
            NetworkKind::Other(flag) => {
                return Err(ClassificationError::UnknownNetworkKind(flag.clone()))
            }
        };
        let mode = match &station.operating_mode {
            OperatingMode::Deferred => "manual_deferred",
            OperatingMode::RealTime => "manual_realtime",
            OperatingMode::Automatic => "automatic",
            OperatingMode::Other(flag) => {
                return Err(ClassificationError::UnknownOperatingMode(flag.clone()))
            }
        };

        format!("{network}_{mode}")
            .parse::<StationClass>()
            .map_err(|_| ClassificationError::UnsupportedCombination {
                network_kind: station.network_kind.clone(),
                operating_mode: station.operating_mode.clone(),
            })
    }

    pub fn identifier(&self) -> &'static str {
        match self {
            StationClass::MeteoManualRealtime => "meteo_manual_realtime",
            StationClass::MeteoManualDeferred => "meteo_manual_deferred",
            StationClass::MeteoAutomatic => "meteo_automatic",
            StationClass::HidroManualRealtime => "hidro_manual_realtime",
            StationClass::HidroManualDeferred => "hidro_manual_deferred",
        }
    }

    /// Output column names, key columns first.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            StationClass::MeteoManualRealtime | StationClass::MeteoManualDeferred => {
                &["DATE", "MAX_TEMP", "MIN_TEMP", "HUMIDITY", "PRECIP_DAILY"]
            }
            StationClass::MeteoAutomatic => &[
                "DATE",
                "HOUR",
                "TEMP",
                "PRECIP_HOURLY",
                "HUMIDITY",
                "WIND_DIR",
                "WIND_SPEED",
            ],
            StationClass::HidroManualRealtime => {
                &["DATE", "LEVEL_06H", "LEVEL_10H", "LEVEL_14H", "LEVEL_18H"]
            }
            StationClass::HidroManualDeferred => &["DATE", "HOUR", "LEVEL", "PRECIP_HOURLY"],
        }
    }

    /// Number of leading key columns (`DATE`, plus `HOUR` for hourly classes).
    pub fn key_width(&self) -> usize {
        match self.resolution() {
            Resolution::Daily => 1,
            Resolution::Hourly => 2,
        }
    }

    /// The non-key columns.
    pub fn value_columns(&self) -> &'static [&'static str] {
        &self.columns()[self.key_width()..]
    }

    /// Classes whose schema carries an `HOUR` key are reindexed hourly.
    pub fn resolution(&self) -> Resolution {
        match self {
            StationClass::MeteoAutomatic | StationClass::HidroManualDeferred => Resolution::Hourly,
            _ => Resolution::Daily,
        }
    }

    /// The HTML table layout of the class. Both manual meteorological classes share one layout.
    pub fn raw_layout(&self) -> RawLayout {
        match self {
            StationClass::MeteoManualRealtime | StationClass::MeteoManualDeferred => {
                RAW_METEO_MANUAL
            }
            StationClass::MeteoAutomatic => RAW_METEO_AUTOMATIC,
            StationClass::HidroManualRealtime => RAW_HIDRO_REALTIME,
            StationClass::HidroManualDeferred => RAW_HIDRO_HOURLY,
        }
    }
}

impl FromStr for StationClass {
    type Err = ClassificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StationClass::ALL
            .into_iter()
            .find(|class| class.identifier() == s)
            .ok_or_else(|| ClassificationError::UnknownIdentifier(s.to_string()))
    }
}

/// Formats a `StationClass` using its identifier.
///
/// ```
/// use senamhi::StationClass;
///
/// assert_eq!(StationClass::HidroManualDeferred.to_string(), "hidro_manual_deferred");
/// ```
impl fmt::Display for StationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(kind: NetworkKind, mode: OperatingMode) -> StationRecord {
        StationRecord::new("000000", kind, mode, "CO")
    }

    #[test]
    fn test_classify_valid_pairs() {
        let cases = [
            (
                NetworkKind::Meteorological,
                OperatingMode::RealTime,
                StationClass::MeteoManualRealtime,
            ),
            (
                NetworkKind::Meteorological,
                OperatingMode::Deferred,
                StationClass::MeteoManualDeferred,
            ),
            (
                NetworkKind::Meteorological,
                OperatingMode::Automatic,
                StationClass::MeteoAutomatic,
            ),
            (
                NetworkKind::Hydrological,
                OperatingMode::RealTime,
                StationClass::HidroManualRealtime,
            ),
            (
                NetworkKind::Hydrological,
                OperatingMode::Deferred,
                StationClass::HidroManualDeferred,
            ),
        ];
        for (kind, mode, expected) in cases {
            let class = StationClass::classify(&station(kind, mode)).unwrap();
            assert_eq!(class, expected);
        }
    }

    #[test]
    fn test_manual_meteo_classes_share_schema() {
        assert_eq!(
            StationClass::MeteoManualRealtime.columns(),
            ["DATE", "MAX_TEMP", "MIN_TEMP", "HUMIDITY", "PRECIP_DAILY"]
        );
        assert_eq!(
            StationClass::MeteoManualRealtime.columns(),
            StationClass::MeteoManualDeferred.columns()
        );
        assert_eq!(
            StationClass::MeteoManualRealtime.raw_layout(),
            StationClass::MeteoManualDeferred.raw_layout()
        );
    }

    #[test]
    fn test_classify_unknown_flags() {
        let err = StationClass::classify(&station(
            NetworkKind::Other("D".into()),
            OperatingMode::RealTime,
        ))
        .unwrap_err();
        assert_eq!(err, ClassificationError::UnknownNetworkKind("D".into()));

        let err = StationClass::classify(&station(
            NetworkKind::Hydrological,
            OperatingMode::Other("READL".into()),
        ))
        .unwrap_err();
        assert_eq!(err, ClassificationError::UnknownOperatingMode("READL".into()));
    }

    #[test]
    fn test_hydrological_automatic_is_unsupported() {
        let err = StationClass::classify(&station(
            NetworkKind::Hydrological,
            OperatingMode::Automatic,
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            ClassificationError::UnsupportedCombination { .. }
        ));
    }

    #[test]
    fn test_identifier_round_trip_and_shapes() {
        for class in StationClass::ALL {
            assert_eq!(class.identifier().parse::<StationClass>().unwrap(), class);
            assert_eq!(class.columns()[0], "DATE");
            assert_eq!(class.raw_layout().columns.len(), class.columns().len());
            let has_hour = class.columns().contains(&"HOUR");
            assert_eq!(has_hour, class.resolution() == Resolution::Hourly);
        }
        assert!("meteo_manual".parse::<StationClass>().is_err());
    }
}
