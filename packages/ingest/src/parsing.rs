//! Field-level parsing for raw incident rows.
//!
//! Timestamps are coerced to UTC, coordinates are parsed and range
//! checked, and arrest flags accept the common boolean spellings.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use crime_hotspots_crime_models::{LATITUDE_RANGE, LONGITUDE_RANGE};
use crime_hotspots_ingest_models::RejectionReason;

/// Offset-less datetime formats, tried in order. Values are taken as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parses a timestamp in any supported format and converts it to UTC.
///
/// RFC 3339 values keep their offset and are converted. Values without an
/// offset are interpreted as UTC. A bare date maps to midnight.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parses and range checks a lat/lng pair.
///
/// # Errors
///
/// Returns the [`RejectionReason`] describing the first problem found.
pub fn parse_coordinates(
    lat: Option<&str>,
    lng: Option<&str>,
) -> Result<(f64, f64), RejectionReason> {
    let (Some(lat), Some(lng)) = (non_blank(lat), non_blank(lng)) else {
        return Err(RejectionReason::MissingCoordinates);
    };

    let latitude = lat
        .parse::<f64>()
        .map_err(|_| RejectionReason::InvalidCoordinates)?;
    let longitude = lng
        .parse::<f64>()
        .map_err(|_| RejectionReason::InvalidCoordinates)?;

    if !latitude.is_finite() || !LATITUDE_RANGE.contains(&latitude) {
        return Err(RejectionReason::LatitudeOutOfRange);
    }
    if !longitude.is_finite() || !LONGITUDE_RANGE.contains(&longitude) {
        return Err(RejectionReason::LongitudeOutOfRange);
    }

    Ok((latitude, longitude))
}

/// Parses an arrest flag. Unrecognized values are treated as unknown.
#[must_use]
pub fn parse_arrest(s: Option<&str>) -> Option<bool> {
    match non_blank(s)?.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Returns the trimmed value, or `None` if it is absent or blank.
pub(crate) fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|v| !v.is_empty())
}
