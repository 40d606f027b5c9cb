//! Breadth-first density expansion over a [`NeighborSearch`].
//!
//! Runs in three passes:
//!
//! 1. Count each point's epsilon-neighborhood to decide which points are
//!    core points.
//! 2. Scan points in input order. Each core point not yet labeled starts a
//!    new cluster, which grows breadth-first through neighboring core
//!    points. Clusters are the connected components of the core graph, so
//!    membership does not depend on scan order; only the numbering does.
//! 3. Every non-core point with a core neighbor becomes a border point of
//!    the cluster of its nearest core neighbor (ties go to the core point
//!    with the smallest key). Everything else is noise.
//!
//! Neighborhoods are re-queried rather than cached so memory stays linear
//! even when many points share one location.

use std::collections::VecDeque;

use crime_hotspots_cluster_models::{ClusterLabel, ClusterParams};
use crime_hotspots_spatial::NeighborSearch;

/// Labels every point of `search`.
///
/// `keys[i]` breaks nearest-core ties for border points and must be unique
/// per point (record ids). Returns labels in point order and the number of
/// clusters found. Parameters are assumed to be validated.
pub fn label_points<S: NeighborSearch, K: Ord>(
    search: &S,
    keys: &[K],
    params: &ClusterParams,
) -> (Vec<ClusterLabel>, u32) {
    let n = search.len();
    let eps = params.epsilon_meters;

    let is_core: Vec<bool> = (0..n)
        .map(|i| search.neighbors_within(i, eps).len() >= params.min_points)
        .collect();

    let mut core_cluster: Vec<Option<u32>> = vec![None; n];
    let mut next_id: u32 = 0;
    let mut queue = VecDeque::new();

    for start in 0..n {
        if !is_core[start] || core_cluster[start].is_some() {
            continue;
        }

        let id = next_id;
        next_id += 1;
        core_cluster[start] = Some(id);
        queue.push_back(start);

        while let Some(p) = queue.pop_front() {
            for q in search.neighbors_within(p, eps) {
                if is_core[q] && core_cluster[q].is_none() {
                    core_cluster[q] = Some(id);
                    queue.push_back(q);
                }
            }
        }
    }

    let labels = (0..n)
        .map(|i| {
            if let Some(id) = core_cluster[i] {
                return ClusterLabel::Cluster(id);
            }
            nearest_core(search, keys, &is_core, i, eps)
                .and_then(|core| core_cluster[core])
                .map_or(ClusterLabel::Noise, ClusterLabel::Cluster)
        })
        .collect();

    (labels, next_id)
}

fn nearest_core<S: NeighborSearch, K: Ord>(
    search: &S,
    keys: &[K],
    is_core: &[bool],
    point: usize,
    eps: f64,
) -> Option<usize> {
    search
        .neighbors_within(point, eps)
        .into_iter()
        .filter(|&q| is_core[q])
        .map(|q| (search.distance(point, q), q))
        .min_by(|(da, a), (db, b)| da.total_cmp(db).then_with(|| keys[*a].cmp(&keys[*b])))
        .map(|(_, q)| q)
}
