//! Filter predicates and filter-state validation.
//!
//! Filtering is a full scan: each record is checked against the category
//! set, the rolling time window, and the optional bounding region. Cluster
//! selection is applied afterwards, once the remaining records have been
//! clustered.

use chrono::{DateTime, TimeDelta, Utc};
use crime_hotspots_analytics_models::{BoundingRegion, FilterState};
use crime_hotspots_crime_models::{IncidentRecord, coordinates_in_range};
use geo::{Intersects as _, Point, Rect, coord};

use crate::ParameterError;
use crate::config::EngineConfig;

/// Inclusive time range `[anchor - days, anchor]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Earliest included instant.
    pub start: DateTime<Utc>,
    /// Latest included instant.
    pub end: DateTime<Utc>,
    /// Length in days.
    pub days: u32,
}

impl TimeWindow {
    /// The window of `days` days ending at `anchor`, or `None` if the start
    /// falls outside the representable date range.
    #[must_use]
    pub fn ending_at(anchor: DateTime<Utc>, days: u32) -> Option<Self> {
        let start = anchor.checked_sub_signed(TimeDelta::try_days(i64::from(days))?)?;
        Some(Self {
            start,
            end: anchor,
            days,
        })
    }

    /// Returns `true` if `instant` falls inside the window.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Checks a filter state before any computation.
///
/// # Errors
///
/// Returns a [`ParameterError`] for invalid clustering parameters, a window
/// outside the configured bounds, or a malformed bounding region.
pub fn validate(state: &FilterState, config: &EngineConfig) -> Result<(), ParameterError> {
    state.cluster_params().validate()?;
    check_window_days(state.window_days, config)?;

    if let Some(region) = &state.bounding_region {
        validate_region(region)?;
    }

    Ok(())
}

fn check_window_days(days: u32, config: &EngineConfig) -> Result<(), ParameterError> {
    if (config.min_window_days..=config.max_window_days).contains(&days) {
        Ok(())
    } else {
        Err(window_days_error(days, config))
    }
}

const fn window_days_error(days: u32, config: &EngineConfig) -> ParameterError {
    ParameterError::WindowDays {
        value: days,
        min: config.min_window_days,
        max: config.max_window_days,
    }
}

/// Checks `days` against the configured bounds and builds the window
/// ending at `anchor`.
///
/// # Errors
///
/// Returns [`ParameterError::WindowDays`] if `days` is outside the bounds
/// or the window start cannot be represented.
pub fn time_window(
    anchor: DateTime<Utc>,
    days: u32,
    config: &EngineConfig,
) -> Result<TimeWindow, ParameterError> {
    check_window_days(days, config)?;
    TimeWindow::ending_at(anchor, days).ok_or_else(|| window_days_error(days, config))
}

fn validate_region(region: &BoundingRegion) -> Result<(), ParameterError> {
    let invalid = |reason: &str| {
        Err(ParameterError::BoundingRegion {
            reason: reason.to_string(),
        })
    };

    if !coordinates_in_range(region.min_latitude, region.min_longitude)
        || !coordinates_in_range(region.max_latitude, region.max_longitude)
    {
        return invalid("corner coordinates out of range");
    }
    if region.min_latitude > region.max_latitude {
        return invalid("min latitude exceeds max latitude");
    }
    if region.min_longitude > region.max_longitude {
        return invalid("min longitude exceeds max longitude");
    }
    Ok(())
}

/// Returns `true` if the point lies in the region, edges included.
#[must_use]
pub fn region_contains(region: &BoundingRegion, latitude: f64, longitude: f64) -> bool {
    let rect = Rect::new(
        coord! { x: region.min_longitude, y: region.min_latitude },
        coord! { x: region.max_longitude, y: region.max_latitude },
    );
    rect.intersects(&Point::new(longitude, latitude))
}

/// Applies every predicate except cluster selection.
#[must_use]
pub fn passes_predicates(
    record: &IncidentRecord,
    state: &FilterState,
    window: &TimeWindow,
) -> bool {
    (state.selected_categories.is_empty() || state.selected_categories.contains(&record.category))
        && window.contains(record.occurred_at)
        && state
            .bounding_region
            .as_ref()
            .is_none_or(|region| region_contains(region, record.latitude, record.longitude))
}
