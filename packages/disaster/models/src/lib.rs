#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Disaster category taxonomy and normalized record types.
//!
//! This crate defines the vocabulary shared by every stage of the disaster
//! map pipeline: the five [`DisasterCategory`] values the records API is
//! queried by, the coarse [`Region`] buckets used for frequency tables, the
//! loosely typed [`RawDisasterRow`] as it arrives from the API, and the
//! normalized [`DisasterRecord`] that the aggregator folds.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// First year (inclusive) covered by the aggregate views.
pub const FIRST_YEAR: u16 = 2000;

/// Last year (inclusive) covered by the aggregate views.
pub const LAST_YEAR: u16 = 2024;

/// Location assigned to records whose source row has no location.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Returns `true` if `year` falls inside the aggregated window.
#[must_use]
pub const fn in_window(year: u16) -> bool {
    year >= FIRST_YEAR && year <= LAST_YEAR
}

/// The kinds of disaster the records API is partitioned by.
///
/// The lowercase serialized form (`"forestfire"`, not `"forest_fire"`) is
/// the exact value of the API's `type` query parameter.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DisasterCategory {
    /// Tropical cyclones.
    Cyclone,
    /// Earthquakes.
    Earthquake,
    /// Floods.
    Flood,
    /// Droughts.
    Drought,
    /// Forest fires.
    ForestFire,
}

impl DisasterCategory {
    /// Returns all variants in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Cyclone,
            Self::Earthquake,
            Self::Flood,
            Self::Drought,
            Self::ForestFire,
        ]
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cyclone => "Cyclone",
            Self::Earthquake => "Earthquake",
            Self::Flood => "Flood",
            Self::Drought => "Drought",
            Self::ForestFire => "Forest Fire",
        }
    }
}

/// Coarse geographic bucket a location is classified into.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Region {
    /// Northern states.
    North,
    /// Southern states.
    South,
    /// Eastern states.
    East,
    /// Western states.
    West,
    /// Locations with no known region.
    Unknown,
}

impl Region {
    /// Returns all variants.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::North,
            Self::South,
            Self::East,
            Self::West,
            Self::Unknown,
        ]
    }
}

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

/// A disaster row exactly as the records API returned it.
///
/// Every field is optional. Numeric fields are kept as raw JSON because the
/// API mixes numbers and numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDisasterRow {
    /// Source identifier (`id` or `_id`).
    pub id: Option<String>,
    /// Event name (e.g. `"Cyclone 'Amphan'"`).
    pub name: Option<String>,
    /// Date string, usually `D-M-YYYY`.
    pub date: Option<String>,
    /// Free-text affected locations.
    pub location: Option<String>,
    /// Country name.
    pub country: Option<String>,
    /// Death toll, number or numeric string.
    pub deaths: Option<serde_json::Value>,
    /// Magnitude (earthquakes).
    pub magnitude: Option<serde_json::Value>,
    /// Latitude, if the API already knows it.
    pub latitude: Option<serde_json::Value>,
    /// Longitude, if the API already knows it.
    pub longitude: Option<serde_json::Value>,
}

/// A disaster record normalized for aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisasterRecord {
    /// Opaque identifier.
    pub id: String,
    /// Category the record was fetched under.
    pub category: DisasterCategory,
    /// Event name, empty if the row had none.
    pub name: String,
    /// Year derived from [`Self::raw_date`], in `1..=9999`.
    pub year: u16,
    /// Affected locations, [`UNKNOWN_LOCATION`] if missing.
    pub location: String,
    /// Death toll, 0 when unparsable.
    pub deaths: u64,
    /// Country name, empty if missing.
    pub country: String,
    /// The date string the year was parsed from.
    pub raw_date: String,
    /// Magnitude, when reported.
    pub magnitude: Option<f64>,
    /// Coordinates supplied by the API, if any.
    pub coordinates: Option<GeoPoint>,
}

/// One map marker: a record placed at one of its resolved locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPoint {
    /// Id of the record this marker belongs to.
    pub record_id: String,
    /// Category of the record.
    pub category: DisasterCategory,
    /// Event name.
    pub name: String,
    /// Date string as reported.
    pub raw_date: String,
    /// The location fragment this marker was resolved from.
    pub place: String,
    /// Death toll of the record.
    pub deaths: u64,
    /// Marker position.
    pub point: GeoPoint,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn category_wire_names_match_api() {
        let names: Vec<String> = DisasterCategory::all()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            names,
            ["cyclone", "earthquake", "flood", "drought", "forestfire"]
        );
    }

    #[test]
    fn category_parses_from_wire_name() {
        for category in DisasterCategory::all() {
            let parsed = DisasterCategory::from_str(category.as_ref()).unwrap();
            assert_eq!(parsed, *category);
        }
        assert!(DisasterCategory::from_str("tsunami").is_err());
    }

    #[test]
    fn category_serde_uses_lowercase() {
        let json = serde_json::to_string(&DisasterCategory::ForestFire).unwrap();
        assert_eq!(json, "\"forestfire\"");
    }

    #[test]
    fn window_bounds_are_inclusive() {
        assert!(in_window(2000));
        assert!(in_window(2024));
        assert!(!in_window(1999));
        assert!(!in_window(2025));
    }
}
