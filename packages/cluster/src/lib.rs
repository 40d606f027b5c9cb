#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Density-based clustering of incident locations.
//!
//! Builds a [`SpatialIndex`] over the records and labels each record as a
//! member of a hotspot cluster or as noise. See [`dbscan`] for the
//! expansion rules and the determinism guarantees.

pub mod dbscan;

use std::borrow::Borrow;
use std::time::Instant;

use crime_hotspots_cluster_models::{
    Assignment, ClusterAssignment, ClusterParams, InvalidClusterParams,
};
use crime_hotspots_crime_models::IncidentRecord;
use crime_hotspots_spatial::{NeighborSearch, SpatialIndex};
use geo::Point;
use thiserror::Error;

/// Errors that can occur before clustering starts.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Epsilon or min points out of range.
    #[error("Invalid clustering parameters: {0}")]
    Parameter(#[from] InvalidClusterParams),

    /// The neighbor search and the record list disagree in size.
    #[error("Neighbor search covers {indexed} points but {records} records were given")]
    SizeMismatch {
        /// Points in the search structure.
        indexed: usize,
        /// Records supplied.
        records: usize,
    },
}

/// Clusters `records` using an R-tree spatial index.
///
/// Empty input yields an empty assignment.
///
/// # Errors
///
/// Returns [`ClusterError::Parameter`] if `params` fail validation.
pub fn cluster<R: Borrow<IncidentRecord>>(
    records: &[R],
    params: &ClusterParams,
) -> Result<ClusterAssignment, ClusterError> {
    params.validate()?;

    let points = records
        .iter()
        .map(as_record)
        .map(|r| Point::new(r.longitude, r.latitude))
        .collect();
    let index = SpatialIndex::build(points);

    cluster_with(&index, records, params)
}

/// Clusters `records` with a caller-supplied neighbor search built over the
/// same records in the same order.
///
/// # Errors
///
/// Returns [`ClusterError::Parameter`] if `params` fail validation, or
/// [`ClusterError::SizeMismatch`] if `search` was built over a different
/// number of points.
pub fn cluster_with<S: NeighborSearch, R: Borrow<IncidentRecord>>(
    search: &S,
    records: &[R],
    params: &ClusterParams,
) -> Result<ClusterAssignment, ClusterError> {
    params.validate()?;

    if search.len() != records.len() {
        return Err(ClusterError::SizeMismatch {
            indexed: search.len(),
            records: records.len(),
        });
    }

    let start = Instant::now();
    let keys: Vec<&str> = records.iter().map(|r| as_record(r).id.as_str()).collect();
    let (labels, cluster_count) = dbscan::label_points(search, &keys, params);

    let entries: Vec<Assignment> = records
        .iter()
        .zip(labels)
        .map(|(record, label)| Assignment {
            record_id: as_record(record).id.clone(),
            label,
        })
        .collect();

    let assignment = ClusterAssignment::new(entries, cluster_count);

    log::debug!(
        "Clustered {} records (eps={}m, min_points={}): {} clusters, {} noise in {:.1?}",
        records.len(),
        params.epsilon_meters,
        params.min_points,
        assignment.cluster_count(),
        assignment.noise_count(),
        start.elapsed()
    );

    Ok(assignment)
}

fn as_record<R: Borrow<IncidentRecord>>(record: &R) -> &IncidentRecord {
    record.borrow()
}
