//! Defines the data structures describing a SENAMHI gauge station as published in the
//! network metadata list: its codes, network, operating mode and category.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The network a station belongs to, taken from the `ico` metadata flag.
///
/// Unrecognized flags are preserved in [`NetworkKind::Other`] so that the failure
/// surfaces when the station is classified, not when the metadata list is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NetworkKind {
    /// Meteorological station (`M`).
    Meteorological,
    /// Hydrological station (`H`).
    Hydrological,
    /// Any other flag value.
    Other(String),
}

impl NetworkKind {
    /// The flag as used in the metadata list and in the site's query strings.
    pub fn flag(&self) -> &str {
        match self {
            NetworkKind::Meteorological => "M",
            NetworkKind::Hydrological => "H",
            NetworkKind::Other(flag) => flag,
        }
    }
}

impl From<String> for NetworkKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "M" => NetworkKind::Meteorological,
            "H" => NetworkKind::Hydrological,
            _ => NetworkKind::Other(value),
        }
    }
}

impl From<NetworkKind> for String {
    fn from(value: NetworkKind) -> Self {
        value.flag().to_string()
    }
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.flag())
    }
}

/// How a station reports its readings, taken from the `estado` metadata flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperatingMode {
    /// Manual station with deferred transmission (`DIFERIDO`).
    Deferred,
    /// Manual station with real-time transmission (`REAL`).
    RealTime,
    /// Automatic station reporting hourly (`AUTOMATICA`).
    Automatic,
    /// Any other flag value.
    Other(String),
}

impl OperatingMode {
    /// The flag as used in the metadata list and in the site's query strings.
    pub fn flag(&self) -> &str {
        match self {
            OperatingMode::Deferred => "DIFERIDO",
            OperatingMode::RealTime => "REAL",
            OperatingMode::Automatic => "AUTOMATICA",
            OperatingMode::Other(flag) => flag,
        }
    }

    pub fn is_automatic(&self) -> bool {
        matches!(self, OperatingMode::Automatic)
    }
}

impl From<String> for OperatingMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "DIFERIDO" => OperatingMode::Deferred,
            "REAL" => OperatingMode::RealTime,
            "AUTOMATICA" => OperatingMode::Automatic,
            _ => OperatingMode::Other(value),
        }
    }
}

impl From<OperatingMode> for String {
    fn from(value: OperatingMode) -> Self {
        value.flag().to_string()
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.flag())
    }
}

/// A single station of the SENAMHI network.
///
/// Field names follow the published metadata list (`cod`, `cod_old`, `ico`,
/// `estado`, `cate`, `nom`); fields not listed here are ignored on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    /// The current station code (e.g. "100090"). Unique within the metadata list.
    #[serde(rename = "cod")]
    pub code: String,
    /// The station code in the legacy numbering, required by the manual-station queries.
    #[serde(rename = "cod_old", default)]
    pub legacy_code: Option<String>,
    /// Meteorological or hydrological network.
    #[serde(rename = "ico")]
    pub network_kind: NetworkKind,
    /// Deferred, real-time or automatic reporting.
    #[serde(rename = "estado")]
    pub operating_mode: OperatingMode,
    /// Station category as published (e.g. "CO", "PLU", "EMA").
    #[serde(rename = "cate")]
    pub category: String,
    /// Station name, if the metadata list carries one.
    #[serde(rename = "nom", default)]
    pub name: Option<String>,
    /// Elevation in meters above sea level. Not part of the metadata list; filled in
    /// by the altitude lookup the first time the station is queried.
    #[serde(skip)]
    pub altitude: Option<f64>,
}

impl StationRecord {
    pub fn new(
        code: impl Into<String>,
        network_kind: NetworkKind,
        operating_mode: OperatingMode,
        category: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            legacy_code: None,
            network_kind,
            operating_mode,
            category: category.into(),
            name: None,
            altitude: None,
        }
    }

    pub fn with_legacy_code(mut self, legacy_code: impl Into<String>) -> Self {
        self.legacy_code = Some(legacy_code.into());
        self
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }
}

impl fmt::Display for StationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) network={} mode={} category={} legacy_code={}",
            self.code,
            self.name.as_deref().unwrap_or("unnamed"),
            self.network_kind,
            self.operating_mode,
            self.category,
            self.legacy_code.as_deref().unwrap_or("-"),
        )?;
        if let Some(altitude) = self.altitude {
            write!(f, " altitude={altitude} msnm")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_metadata_entry() {
        let json = r#"{"cod":"100090","cod_old":"000256","ico":"M","estado":"REAL","cate":"CO","nom":"CHACHAPOYAS","lat":-6.2}"#;
        let station: StationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(station.code, "100090");
        assert_eq!(station.legacy_code.as_deref(), Some("000256"));
        assert_eq!(station.network_kind, NetworkKind::Meteorological);
        assert_eq!(station.operating_mode, OperatingMode::RealTime);
        assert_eq!(station.category, "CO");
        assert_eq!(station.altitude, None);
    }

    #[test]
    fn test_unknown_flags_are_preserved() {
        let json = r#"{"cod":"1","ico":"X","estado":"MANUAL","cate":"CO"}"#;
        let station: StationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(station.network_kind, NetworkKind::Other("X".to_string()));
        assert_eq!(
            station.operating_mode,
            OperatingMode::Other("MANUAL".to_string())
        );
        assert_eq!(station.legacy_code, None);
    }

    #[test]
    fn test_flags_round_trip_through_json() {
        let station = StationRecord::new(
            "472A1A3E",
            NetworkKind::Hydrological,
            OperatingMode::Automatic,
            "EHA",
        );
        let json = serde_json::to_string(&station).unwrap();
        assert!(json.contains(r#""ico":"H""#));
        assert!(json.contains(r#""estado":"AUTOMATICA""#));
    }
}
