#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index for radius neighborhood queries.
//!
//! Distances use the haversine great-circle metric on a sphere of radius
//! [`EARTH_RADIUS_METERS`]. Points are indexed in raw degrees
//! (`[longitude, latitude]`) in an R-tree. A radius query in meters is
//! converted into a degree envelope that is guaranteed to contain every
//! point within the radius, and candidates from the envelope are then
//! filtered by exact haversine distance, so results are exact.
//!
//! Conversion from meters to indexed units:
//!
//! * latitude: `degrees = meters / METERS_PER_DEGREE_LATITUDE`
//!   (about 111 195 m per degree).
//! * longitude at query latitude `φ`, with `φmax` the most poleward
//!   latitude of the envelope:
//!   `Δλ = 2 · asin(sin(θ / 2) / sqrt(cos φ · cos φmax))` where
//!   `θ = meters / EARTH_RADIUS_METERS`. When the argument reaches 1 the
//!   envelope spans every longitude.

use geo::Point;
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Meters spanned by one degree of latitude on the haversine sphere.
pub const METERS_PER_DEGREE_LATITUDE: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

/// Widening applied to query envelopes so floating-point rounding can never
/// exclude a point the exact distance check would accept.
const ENVELOPE_SLACK: f64 = 1.0 + 1e-9;

/// Great-circle distance in meters between two `(lng, lat)` points.
#[must_use]
pub fn haversine_meters(a: Point<f64>, b: Point<f64>) -> f64 {
    let lat_a = a.y().to_radians();
    let lat_b = b.y().to_radians();
    let d_lat = lat_b - lat_a;
    let d_lng = (b.x() - a.x()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Neighborhood queries over a fixed, indexed point set.
///
/// Implementations return indices into the point slice they were built
/// from, sorted ascending, including the query point itself.
pub trait NeighborSearch {
    /// Number of indexed points.
    fn len(&self) -> usize;

    /// Returns `true` if no points are indexed.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All points within `radius_meters` of the point at `index`.
    fn neighbors_within(&self, index: usize, radius_meters: f64) -> Vec<usize>;

    /// Haversine distance in meters between two indexed points, or
    /// infinity if either index is out of range.
    fn distance(&self, a: usize, b: usize) -> f64;
}

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// R-tree backed index answering exact haversine radius queries.
pub struct SpatialIndex {
    points: Vec<Point<f64>>,
    tree: RTree<IndexedPoint>,
}

impl SpatialIndex {
    /// Bulk-loads an index over `points`. Duplicate coordinates are fine.
    #[must_use]
    pub fn build(points: Vec<Point<f64>>) -> Self {
        let entries: Vec<IndexedPoint> = points
            .iter()
            .enumerate()
            .map(|(i, p)| GeomWithData::new([p.x(), p.y()], i))
            .collect();

        let tree = RTree::bulk_load(entries);
        log::debug!("Built spatial index over {} points", points.len());

        Self { points, tree }
    }

    /// The indexed point at `index`.
    #[must_use]
    pub fn point(&self, index: usize) -> Option<Point<f64>> {
        self.points.get(index).copied()
    }

    /// Indices of all points within `radius_meters` of `center`, sorted
    /// ascending.
    #[must_use]
    pub fn within_radius(&self, center: Point<f64>, radius_meters: f64) -> Vec<usize> {
        if radius_meters < 0.0 || !radius_meters.is_finite() {
            return Vec::new();
        }

        let mut found: Vec<usize> = query_envelopes(center, radius_meters)
            .iter()
            .flat_map(|env| self.tree.locate_in_envelope(env))
            .filter(|entry| {
                let [lng, lat] = *entry.geom();
                haversine_meters(center, Point::new(lng, lat)) <= radius_meters
            })
            .map(|entry| entry.data)
            .collect();

        found.sort_unstable();
        found.dedup();
        found
    }
}

impl NeighborSearch for SpatialIndex {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn neighbors_within(&self, index: usize, radius_meters: f64) -> Vec<usize> {
        self.point(index)
            .map_or_else(Vec::new, |p| self.within_radius(p, radius_meters))
    }

    fn distance(&self, a: usize, b: usize) -> f64 {
        point_distance(&self.points, a, b)
    }
}

/// Quadratic reference implementation of [`NeighborSearch`].
///
/// Compares every pair of points. Only meant for validating
/// [`SpatialIndex`] and the clustering built on it in tests.
pub struct BruteForceIndex {
    points: Vec<Point<f64>>,
}

impl BruteForceIndex {
    /// Wraps `points` without building any structure.
    #[must_use]
    pub const fn new(points: Vec<Point<f64>>) -> Self {
        Self { points }
    }
}

impl NeighborSearch for BruteForceIndex {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn neighbors_within(&self, index: usize, radius_meters: f64) -> Vec<usize> {
        let Some(&center) = self.points.get(index) else {
            return Vec::new();
        };
        self.points
            .iter()
            .enumerate()
            .filter(|(_, p)| haversine_meters(center, **p) <= radius_meters)
            .map(|(i, _)| i)
            .collect()
    }

    fn distance(&self, a: usize, b: usize) -> f64 {
        point_distance(&self.points, a, b)
    }
}

fn point_distance(points: &[Point<f64>], a: usize, b: usize) -> f64 {
    match (points.get(a), points.get(b)) {
        (Some(&pa), Some(&pb)) => haversine_meters(pa, pb),
        _ => f64::INFINITY,
    }
}

/// Degree envelopes covering every point within `radius_meters` of
/// `center`. Returns two envelopes when the range wraps the antimeridian.
fn query_envelopes(center: Point<f64>, radius_meters: f64) -> Vec<AABB<[f64; 2]>> {
    let angular = radius_meters / EARTH_RADIUS_METERS * ENVELOPE_SLACK;
    let d_lat = angular.to_degrees();
    let (lng, lat) = (center.x(), center.y());

    let min_lat = (lat - d_lat).max(-90.0);
    let max_lat = (lat + d_lat).min(90.0);

    let Some(d_lng) = longitude_span(lat, min_lat, max_lat, angular) else {
        return vec![AABB::from_corners([-180.0, min_lat], [180.0, max_lat])];
    };

    let min_lng = lng - d_lng;
    let max_lng = lng + d_lng;

    if min_lng < -180.0 {
        vec![
            AABB::from_corners([-180.0, min_lat], [max_lng, max_lat]),
            AABB::from_corners([min_lng + 360.0, min_lat], [180.0, max_lat]),
        ]
    } else if max_lng > 180.0 {
        vec![
            AABB::from_corners([min_lng, min_lat], [180.0, max_lat]),
            AABB::from_corners([-180.0, min_lat], [max_lng - 360.0, max_lat]),
        ]
    } else {
        vec![AABB::from_corners([min_lng, min_lat], [max_lng, max_lat])]
    }
}

/// Half-width in degrees of longitude for the query envelope, or `None`
/// when the envelope must span all longitudes (poles or huge radii).
fn longitude_span(lat: f64, min_lat: f64, max_lat: f64, angular: f64) -> Option<f64> {
    if min_lat <= -90.0 || max_lat >= 90.0 {
        return None;
    }

    let poleward = min_lat.abs().max(max_lat.abs()).to_radians();
    let denom = (lat.to_radians().cos() * poleward.cos()).sqrt();
    if denom <= 0.0 {
        return None;
    }

    let s = (angular / 2.0).sin() / denom;
    if s >= 1.0 {
        return None;
    }

    let span = (2.0 * s.asin()).to_degrees();
    if span >= 180.0 { None } else { Some(span) }
}
