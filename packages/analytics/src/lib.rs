#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hotspot analytics over a validated incident dataset.
//!
//! The free functions here are the stateless building blocks: clustering a
//! [`RecordSet`], summarizing an assignment, and binning records in time.
//! [`AnalyticsEngine`] ties them together behind a single
//! `apply_filter(state) -> snapshot` call.

pub mod config;
pub mod engine;
pub mod filter;
pub mod kpi;
pub mod summary;
pub mod temporal;

use crime_hotspots_analytics_models::{ClusterSummary, RollingSeries, TemporalGrid};
use crime_hotspots_cluster::ClusterError;
use crime_hotspots_cluster_models::{ClusterAssignment, ClusterParams, InvalidClusterParams};
use crime_hotspots_ingest::IngestError;
use crime_hotspots_ingest_models::RecordSet;
use thiserror::Error;

pub use config::EngineConfig;
pub use crime_hotspots_ingest::{load, load_with_options};
pub use engine::AnalyticsEngine;

/// A filter state rejected before any computation.
#[derive(Debug, Error)]
pub enum ParameterError {
    /// Epsilon or min points out of range.
    #[error("Invalid clustering parameters: {0}")]
    Clustering(#[from] InvalidClusterParams),

    /// Window length outside the configured bounds.
    #[error("Window of {value} days outside [{min}, {max}]")]
    WindowDays {
        /// Requested window.
        value: u32,
        /// Smallest accepted window.
        min: u32,
        /// Largest accepted window.
        max: u32,
    },

    /// Bounding region with inverted or out-of-range corners.
    #[error("Invalid bounding region: {reason}")]
    BoundingRegion {
        /// What is wrong with the region.
        reason: String,
    },
}

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Invalid filter state. The previous snapshot stays valid.
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    /// Invalid engine configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// Loading the dataset failed.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Clustering could not run.
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

/// Clusters every record in `records`.
///
/// # Errors
///
/// Returns [`AnalyticsError::Parameter`] if `epsilon_meters` is not a
/// positive finite number or `min_points` is zero.
pub fn cluster(
    records: &RecordSet,
    epsilon_meters: f64,
    min_points: usize,
) -> Result<ClusterAssignment, AnalyticsError> {
    let params = ClusterParams {
        epsilon_meters,
        min_points,
    };
    params.validate().map_err(ParameterError::from)?;
    Ok(crime_hotspots_cluster::cluster(records.records(), &params)?)
}

/// One summary per cluster in `assignment`, ordered by cluster id.
#[must_use]
pub fn summarize(records: &RecordSet, assignment: &ClusterAssignment) -> Vec<ClusterSummary> {
    summary::summarize(records.records(), assignment)
}

/// Day-by-hour grid and daily series over the `window_days` days ending at
/// the dataset's latest timestamp, with the default window bounds.
///
/// # Errors
///
/// Returns [`AnalyticsError::Parameter`] if `window_days` is outside the
/// default `[min_window_days, max_window_days]` bounds.
pub fn aggregate_temporal(
    records: &RecordSet,
    window_days: u32,
) -> Result<(TemporalGrid, RollingSeries), AnalyticsError> {
    aggregate_temporal_with(records, window_days, &EngineConfig::default())
}

/// Like [`aggregate_temporal`], checking `window_days` against `config`.
///
/// # Errors
///
/// Returns [`AnalyticsError::Parameter`] if `window_days` is outside the
/// configured bounds.
pub fn aggregate_temporal_with(
    records: &RecordSet,
    window_days: u32,
    config: &EngineConfig,
) -> Result<(TemporalGrid, RollingSeries), AnalyticsError> {
    let window = filter::time_window(records.anchor(), window_days, config)?;
    Ok(temporal::aggregate(records.records(), &window))
}
