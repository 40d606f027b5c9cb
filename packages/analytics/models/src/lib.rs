#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Filter state and derived analytics types.
//!
//! Everything a presentation layer reads comes out of an
//! [`AnalysisSnapshot`]: hotspot summaries, the day-by-hour heatmap, the
//! daily series, category composition, and headline KPIs, all computed
//! from one filtered record set.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use crime_hotspots_cluster_models::ClusterParams;
use crime_hotspots_crime_models::Weekday;
use crime_hotspots_ingest_models::IngestReport;
use serde::{Deserialize, Serialize};

/// Hours per day in the temporal grid.
pub const HOURS_PER_DAY: usize = 24;

/// Days per week in the temporal grid.
pub const DAYS_PER_WEEK: usize = 7;

/// Geographic box, inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingRegion {
    /// Southern edge.
    pub min_latitude: f64,
    /// Western edge.
    pub min_longitude: f64,
    /// Northern edge.
    pub max_latitude: f64,
    /// Eastern edge.
    pub max_longitude: f64,
}

/// The complete set of user-controlled analysis options.
///
/// Replaced wholesale on every change; never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    /// Rolling window length in days, measured back from the dataset's
    /// latest timestamp.
    pub window_days: u32,
    /// Normalized category labels to include. Empty means all.
    #[serde(default)]
    pub selected_categories: BTreeSet<String>,
    /// Cluster ids to include. Empty means all records, noise included.
    #[serde(default)]
    pub selected_clusters: BTreeSet<u32>,
    /// Optional geographic restriction.
    #[serde(default)]
    pub bounding_region: Option<BoundingRegion>,
    /// Clustering radius in meters.
    pub epsilon_meters: f64,
    /// Clustering density threshold.
    pub min_points: usize,
}

impl FilterState {
    /// A state that applies no category, cluster, or region filtering.
    #[must_use]
    pub fn unfiltered(window_days: u32, params: ClusterParams) -> Self {
        Self {
            window_days,
            selected_categories: BTreeSet::new(),
            selected_clusters: BTreeSet::new(),
            bounding_region: None,
            epsilon_meters: params.epsilon_meters,
            min_points: params.min_points,
        }
    }

    /// Clustering parameters carried by this state.
    #[must_use]
    pub const fn cluster_params(&self) -> ClusterParams {
        ClusterParams {
            epsilon_meters: self.epsilon_meters,
            min_points: self.min_points,
        }
    }
}

/// Derived description of one hotspot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    /// Cluster id from the clustering run.
    pub cluster_id: u32,
    /// Mean latitude of members.
    pub centroid_latitude: f64,
    /// Mean longitude of members.
    pub centroid_longitude: f64,
    /// Member count.
    pub size: u64,
    /// Member count per category.
    pub category_distribution: BTreeMap<String, u64>,
    /// Share of members with a known arrest flag that were arrests.
    pub arrest_rate: f64,
}

/// One cell of the day-by-hour grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalBin {
    /// Day of week (Monday = 0).
    pub day_of_week: u8,
    /// Hour of day (0-23, UTC).
    pub hour_of_day: u8,
    /// Incident count.
    pub count: u64,
}

/// 7x24 incident counts keyed by UTC weekday and hour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalGrid {
    cells: [[u64; HOURS_PER_DAY]; DAYS_PER_WEEK],
}

impl TemporalGrid {
    /// Adds one incident to a cell. Out-of-range indices are ignored.
    pub fn increment(&mut self, day_of_week: usize, hour_of_day: usize) {
        if let Some(cell) = self
            .cells
            .get_mut(day_of_week)
            .and_then(|row| row.get_mut(hour_of_day))
        {
            *cell += 1;
        }
    }

    /// Count for one cell, or 0 if out of range.
    #[must_use]
    pub fn get(&self, day_of_week: usize, hour_of_day: usize) -> u64 {
        self.cells
            .get(day_of_week)
            .and_then(|row| row.get(hour_of_day))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all 168 cells.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.cells.iter().flatten().sum()
    }

    /// Totals per hour of day (column sums).
    #[must_use]
    pub fn hourly_totals(&self) -> [u64; HOURS_PER_DAY] {
        let mut totals = [0; HOURS_PER_DAY];
        for row in &self.cells {
            for (total, count) in totals.iter_mut().zip(row) {
                *total += count;
            }
        }
        totals
    }

    /// Totals per weekday (row sums), Monday first.
    #[must_use]
    pub fn weekday_totals(&self) -> [u64; DAYS_PER_WEEK] {
        let mut totals = [0; DAYS_PER_WEEK];
        for (total, row) in totals.iter_mut().zip(&self.cells) {
            *total = row.iter().sum();
        }
        totals
    }

    /// All 168 cells in day-major order.
    #[must_use]
    pub fn bins(&self) -> Vec<TemporalBin> {
        self.cells
            .iter()
            .enumerate()
            .flat_map(|(day, row)| {
                // Bounded by the grid dimensions
                #[allow(clippy::cast_possible_truncation)]
                let day_of_week = day as u8;
                row.iter().enumerate().map(move |(hour, &count)| {
                    #[allow(clippy::cast_possible_truncation)]
                    let hour_of_day = hour as u8;
                    TemporalBin {
                        day_of_week,
                        hour_of_day,
                        count,
                    }
                })
            })
            .collect()
    }
}

/// Incidents on one UTC calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCount {
    /// Calendar day (UTC).
    pub date: NaiveDate,
    /// Incident count.
    pub count: u64,
}

/// Daily counts across the rolling window, zero-filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingSeries {
    /// Window length in days.
    pub window_days: u32,
    /// Inclusive window start (`anchor - window_days`).
    pub window_start: DateTime<Utc>,
    /// Inclusive window end: the dataset's latest timestamp.
    pub anchor: DateTime<Utc>,
    /// One entry per day from the start day to the anchor day.
    pub days: Vec<DailyCount>,
}

impl RollingSeries {
    /// Sum of all daily counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.days.iter().map(|d| d.count).sum()
    }
}

/// Incident count for one hour of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourCount {
    /// Hour of day (0-23, UTC).
    pub hour: u8,
    /// Incident count.
    pub count: u64,
}

/// Incident count for one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayCount {
    /// Day of week.
    pub weekday: Weekday,
    /// Incident count.
    pub count: u64,
}

/// One category's share of the filtered records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShare {
    /// Normalized category label.
    pub category: String,
    /// Incident count.
    pub count: u64,
    /// Percentage of the filtered total (0-100).
    pub percentage: f64,
    /// Arrest rate within the category (0-1).
    pub arrest_rate: f64,
}

/// Headline indicators beyond the core hotspot counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    /// Records with an arrest.
    pub total_arrests: u64,
    /// Arrests over records with a known arrest flag (0-1).
    pub arrest_rate: f64,
    /// Filtered records, noise included, per active hotspot. 0 without hotspots.
    pub avg_per_hotspot: f64,
    /// Filtered records per window day.
    pub avg_per_day: f64,
    /// Busiest hour of day, lowest hour on ties. `None` when empty.
    pub peak_hour: Option<u8>,
    /// Size of the largest hotspot.
    pub largest_hotspot: u64,
    /// Number of distinct categories present.
    pub distinct_categories: u64,
}

/// Non-fatal conditions attached to a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotWarning {
    /// The filter matched no records; every aggregate is zero.
    EmptyResult,
}

/// A coherent bundle of derived views for one filter state.
///
/// Every field is computed from the same filtered record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    /// The filter state this snapshot answers.
    pub filter: FilterState,
    /// Records passing every predicate.
    pub filtered_record_count: u64,
    /// Non-noise cluster ids present.
    pub active_hotspots: u64,
    /// Filtered records labeled noise.
    pub noise_count: u64,
    /// `noise_count / filtered_record_count`, or 0 when empty.
    pub noise_ratio: f64,
    /// One summary per active hotspot, by cluster id.
    pub cluster_summaries: Vec<ClusterSummary>,
    /// Day-by-hour heatmap.
    pub temporal_grid: TemporalGrid,
    /// Daily counts across the window.
    pub rolling_series: RollingSeries,
    /// Hourly totals (grid column sums).
    pub hourly_distribution: Vec<HourCount>,
    /// Weekday totals (grid row sums).
    pub weekday_distribution: Vec<WeekdayCount>,
    /// Top categories by count.
    pub category_breakdown: Vec<CategoryShare>,
    /// Additional indicators.
    pub kpis: Kpis,
    /// Validation counts from ingestion.
    pub ingest: IngestReport,
    /// Non-fatal conditions.
    pub warnings: Vec<SnapshotWarning>,
}
