//! Per-cluster hotspot summaries.

use std::borrow::Borrow;
use std::collections::BTreeMap;

use crime_hotspots_analytics_models::ClusterSummary;
use crime_hotspots_cluster_models::{ClusterAssignment, ClusterLabel};
use crime_hotspots_crime_models::IncidentRecord;
use geo::{Centroid as _, MultiPoint, Point};

use crate::kpi::ArrestTally;

/// Accumulates members of one cluster before the summary is finalized.
#[derive(Default)]
struct ClusterAccum {
    points: Vec<Point<f64>>,
    by_category: BTreeMap<String, u64>,
    arrests: ArrestTally,
}

/// Builds one summary per cluster id present in `assignment`, matching
/// records to labels by record id. Noise and unassigned records are
/// skipped. Summaries are ordered by cluster id.
#[must_use]
pub fn summarize<R: Borrow<IncidentRecord>>(
    records: &[R],
    assignment: &ClusterAssignment,
) -> Vec<ClusterSummary> {
    let labels: BTreeMap<&str, ClusterLabel> = assignment
        .entries()
        .iter()
        .map(|a| (a.record_id.as_str(), a.label))
        .collect();

    summarize_members(records.iter().filter_map(|r| {
        let record: &IncidentRecord = r.borrow();
        labels
            .get(record.id.as_str())
            .and_then(|label| label.cluster_id())
            .map(|id| (id, record))
    }))
}

/// Builds summaries from records paired position-by-position with labels.
#[must_use]
pub fn summarize_labeled<R: Borrow<IncidentRecord>>(
    records: &[R],
    labels: &[ClusterLabel],
) -> Vec<ClusterSummary> {
    summarize_members(records.iter().zip(labels).filter_map(|(r, label)| {
        let record: &IncidentRecord = r.borrow();
        label.cluster_id().map(|id| (id, record))
    }))
}

fn summarize_members<'a>(
    members: impl Iterator<Item = (u32, &'a IncidentRecord)>,
) -> Vec<ClusterSummary> {
    let mut clusters: BTreeMap<u32, ClusterAccum> = BTreeMap::new();

    for (id, record) in members {
        let accum = clusters.entry(id).or_default();
        accum
            .points
            .push(Point::new(record.longitude, record.latitude));
        *accum
            .by_category
            .entry(record.category.clone())
            .or_insert(0) += 1;
        accum.arrests.add(record.arrest);
    }

    clusters
        .into_iter()
        .filter_map(|(cluster_id, accum)| {
            let size = accum.points.len() as u64;
            let centroid = MultiPoint::from(accum.points).centroid()?;
            Some(ClusterSummary {
                cluster_id,
                centroid_latitude: centroid.y(),
                centroid_longitude: centroid.x(),
                size,
                category_distribution: accum.by_category,
                arrest_rate: accum.arrests.rate(),
            })
        })
        .collect()
}
