#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident record types shared across the hotspot analytics engine.
//!
//! An [`IncidentRecord`] is the immutable, validated unit every downstream
//! component works on. Category labels come from an open vocabulary, so
//! instead of a fixed taxonomy this crate only defines how labels are
//! normalized (see [`normalize_category`]).

use chrono::{DateTime, Datelike as _, Timelike as _, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Inclusive latitude bounds in degrees.
pub const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;

/// Inclusive longitude bounds in degrees.
pub const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// A validated incident. Created once at ingestion and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    /// Unique record identifier.
    pub id: String,
    /// When the incident occurred (UTC).
    pub occurred_at: DateTime<Utc>,
    /// Latitude in degrees, within [`LATITUDE_RANGE`].
    pub latitude: f64,
    /// Longitude in degrees, within [`LONGITUDE_RANGE`].
    pub longitude: f64,
    /// Normalized category label (see [`normalize_category`]).
    pub category: String,
    /// Whether an arrest was made, when the source reports it.
    pub arrest: Option<bool>,
}

impl IncidentRecord {
    /// Day of week of the UTC timestamp.
    #[must_use]
    pub fn weekday(&self) -> Weekday {
        Weekday::from(self.occurred_at.weekday())
    }

    /// Hour of day (0-23) of the UTC timestamp.
    #[must_use]
    pub fn hour(&self) -> u8 {
        // `hour()` is always < 24
        #[allow(clippy::cast_possible_truncation)]
        let hour = self.occurred_at.hour() as u8;
        hour
    }
}

/// Returns `true` if the coordinate pair is finite and within range.
#[must_use]
pub fn coordinates_in_range(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && LATITUDE_RANGE.contains(&latitude)
        && LONGITUDE_RANGE.contains(&longitude)
}

/// Normalizes a raw category label: trims, collapses internal whitespace,
/// and upper-cases. Returns `None` for blank labels.
#[must_use]
pub fn normalize_category(raw: &str) -> Option<String> {
    let label = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();

    if label.is_empty() { None } else { Some(label) }
}

/// Day of the week, indexed Monday = 0 through Sunday = 6.
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Weekday {
    /// Index 0
    Monday = 0,
    /// Index 1
    Tuesday = 1,
    /// Index 2
    Wednesday = 2,
    /// Index 3
    Thursday = 3,
    /// Index 4
    Friday = 4,
    /// Index 5
    Saturday = 5,
    /// Index 6
    Sunday = 6,
}

impl Weekday {
    /// Returns the grid row index of this day (Monday = 0).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns all variants in grid order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Monday,
            Self::Tuesday,
            Self::Wednesday,
            Self::Thursday,
            Self::Friday,
            Self::Saturday,
            Self::Sunday,
        ]
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(value: chrono::Weekday) -> Self {
        match value {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
        }
    }
}
