#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Density-based clustering parameter and result types.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Default neighborhood radius in meters.
pub const DEFAULT_EPSILON_METERS: f64 = 250.0;

/// Default minimum neighborhood size (including the point itself).
pub const DEFAULT_MIN_POINTS: usize = 5;

/// Parameters for one clustering run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterParams {
    /// Neighborhood radius in meters. Must be positive and finite.
    pub epsilon_meters: f64,
    /// Minimum neighborhood size, counting the point itself, for a point to
    /// be a core point. Must be at least 1.
    pub min_points: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            epsilon_meters: DEFAULT_EPSILON_METERS,
            min_points: DEFAULT_MIN_POINTS,
        }
    }
}

impl ClusterParams {
    /// Checks that the parameters can drive a clustering run.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidClusterParams`] if epsilon is not a positive finite
    /// number or `min_points` is zero.
    pub fn validate(&self) -> Result<(), InvalidClusterParams> {
        if !(self.epsilon_meters.is_finite() && self.epsilon_meters > 0.0) {
            return Err(InvalidClusterParams::Epsilon(self.epsilon_meters));
        }
        if self.min_points < 1 {
            return Err(InvalidClusterParams::MinPoints(self.min_points));
        }
        Ok(())
    }
}

/// Error returned by [`ClusterParams::validate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InvalidClusterParams {
    /// Epsilon was zero, negative, or not finite.
    Epsilon(f64),
    /// `min_points` was below 1.
    MinPoints(usize),
}

impl std::fmt::Display for InvalidClusterParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Epsilon(value) => {
                write!(f, "invalid epsilon {value} m: expected a positive radius")
            }
            Self::MinPoints(value) => {
                write!(f, "invalid min points {value}: expected at least 1")
            }
        }
    }
}

impl std::error::Error for InvalidClusterParams {}

/// Cluster label for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterLabel {
    /// Not density-reachable from any core point.
    Noise,
    /// Member of the cluster with this id.
    Cluster(u32),
}

impl ClusterLabel {
    /// The cluster id, or `None` for noise.
    #[must_use]
    pub const fn cluster_id(self) -> Option<u32> {
        match self {
            Self::Noise => None,
            Self::Cluster(id) => Some(id),
        }
    }

    /// Returns `true` for [`ClusterLabel::Noise`].
    #[must_use]
    pub const fn is_noise(self) -> bool {
        matches!(self, Self::Noise)
    }
}

impl std::fmt::Display for ClusterLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Noise => write!(f, "noise"),
            Self::Cluster(id) => write!(f, "cluster {id}"),
        }
    }
}

/// One record's label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    /// Record id.
    pub record_id: String,
    /// Assigned label.
    pub label: ClusterLabel,
}

/// Labels for every record of one clustering run, in input order.
///
/// Cluster ids are contiguous from 0 in the order clusters were first
/// discovered while scanning records in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAssignment {
    entries: Vec<Assignment>,
    cluster_count: u32,
}

impl ClusterAssignment {
    /// Builds an assignment from input-ordered entries.
    ///
    /// `cluster_count` must be one past the highest cluster id used.
    #[must_use]
    pub const fn new(entries: Vec<Assignment>, cluster_count: u32) -> Self {
        Self {
            entries,
            cluster_count,
        }
    }

    /// Entries in input order.
    #[must_use]
    pub fn entries(&self) -> &[Assignment] {
        &self.entries
    }

    /// Label of the record at input position `index`.
    #[must_use]
    pub fn label_at(&self, index: usize) -> Option<ClusterLabel> {
        self.entries.get(index).map(|a| a.label)
    }

    /// Label of the record with `record_id`.
    #[must_use]
    pub fn label_of(&self, record_id: &str) -> Option<ClusterLabel> {
        self.entries
            .iter()
            .find(|a| a.record_id == record_id)
            .map(|a| a.label)
    }

    /// Number of non-noise clusters.
    #[must_use]
    pub const fn cluster_count(&self) -> u32 {
        self.cluster_count
    }

    /// Number of records labeled noise.
    #[must_use]
    pub fn noise_count(&self) -> usize {
        self.entries.iter().filter(|a| a.label.is_noise()).count()
    }

    /// Number of labeled records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no records were clustered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record ids grouped by cluster id (noise excluded).
    #[must_use]
    pub fn members(&self) -> BTreeMap<u32, Vec<&str>> {
        let mut map: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
        for entry in &self.entries {
            if let Some(id) = entry.label.cluster_id() {
                map.entry(id).or_default().push(entry.record_id.as_str());
            }
        }
        map
    }

    /// The clustering as a set of member-id sets, independent of how
    /// clusters were numbered.
    #[must_use]
    pub fn partition(&self) -> BTreeSet<BTreeSet<String>> {
        self.members()
            .into_values()
            .map(|ids| ids.into_iter().map(ToString::to_string).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(labels: &[(&str, ClusterLabel)]) -> ClusterAssignment {
        let count = labels
            .iter()
            .filter_map(|(_, l)| l.cluster_id())
            .max()
            .map_or(0, |m| m + 1);
        ClusterAssignment::new(
            labels
                .iter()
                .map(|(id, label)| Assignment {
                    record_id: (*id).to_string(),
                    label: *label,
                })
                .collect(),
            count,
        )
    }

    #[test]
    fn validates_params() {
        assert!(ClusterParams::default().validate().is_ok());
        assert_eq!(
            ClusterParams {
                epsilon_meters: 0.0,
                min_points: 2
            }
            .validate(),
            Err(InvalidClusterParams::Epsilon(0.0))
        );
        assert!(
            ClusterParams {
                epsilon_meters: f64::NAN,
                min_points: 2
            }
            .validate()
            .is_err()
        );
        assert_eq!(
            ClusterParams {
                epsilon_meters: 50.0,
                min_points: 0
            }
            .validate(),
            Err(InvalidClusterParams::MinPoints(0))
        );
    }

    #[test]
    fn groups_members_and_counts_noise() {
        let a = assignment(&[
            ("a", ClusterLabel::Cluster(0)),
            ("b", ClusterLabel::Noise),
            ("c", ClusterLabel::Cluster(1)),
            ("d", ClusterLabel::Cluster(0)),
        ]);
        assert_eq!(a.cluster_count(), 2);
        assert_eq!(a.noise_count(), 1);
        assert_eq!(a.members().get(&0), Some(&vec!["a", "d"]));
        assert_eq!(a.label_of("c"), Some(ClusterLabel::Cluster(1)));
        assert_eq!(a.label_at(1), Some(ClusterLabel::Noise));
        assert_eq!(a.label_of("zzz"), None);
    }

    #[test]
    fn partition_ignores_numbering() {
        let first = assignment(&[
            ("a", ClusterLabel::Cluster(0)),
            ("b", ClusterLabel::Cluster(1)),
        ]);
        let second = assignment(&[
            ("a", ClusterLabel::Cluster(1)),
            ("b", ClusterLabel::Cluster(0)),
        ]);
        assert_eq!(first.partition(), second.partition());
    }

    #[test]
    fn label_serializes_tagged() {
        assert_eq!(
            serde_json::to_string(&ClusterLabel::Cluster(3)).unwrap(),
            r#"{"cluster":3}"#
        );
        assert_eq!(
            serde_json::to_string(&ClusterLabel::Noise).unwrap(),
            r#""noise""#
        );
    }
}
